// homescript-lang/src/interpreter.rs
// ============================================================================
// Module: HomeScript Interpreter
// Description: Program-counter execution engine with call stack and debugger.
// Purpose: Execute resolved programs against a host binding.
// Dependencies: crate::{error, expr, host, program, value}, regex
// ============================================================================

//! ## Overview
//! Execution walks the flat statement list by program counter. Function
//! calls and imports push frames that swap the active program; `GOTO` moves
//! the counter within one program. Every suspension point (`CALL`, `GET`,
//! `SET`, `IMPORT`, breakpoints) awaits a host callback; all other steps are
//! synchronous. Within one run, statements execute strictly in source order
//! modulo control flow. Failures carry the output and scope accumulated up
//! to the failing statement, so no partial run is ever lost.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::error::DEBUGGER_STOPPED;
use crate::error::HomeScriptError;
use crate::expr::Expr;
use crate::host::CallOutcome;
use crate::host::DebugAction;
use crate::host::GetOutcome;
use crate::host::HostBindings;
use crate::host::SetOutcome;
use crate::host::TraceEvent;
use crate::program::FunctionInfo;
use crate::program::Program;
use crate::program::StmtKind;
use crate::value::Scope;
use crate::value::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Iterations a single `WHILE` loop may run before the interpreter aborts.
pub const LOOP_LIMIT: u64 = 100_000;

// ============================================================================
// SECTION: Options and Results
// ============================================================================

/// Debugger pacing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugStepMode {
    /// Pause only on breakpoints; the hook resumes on its own.
    #[default]
    Auto,
    /// Pause before every statement until the operator decides.
    Manual,
}

/// Inputs for one execution.
#[derive(Debug, Clone, Default)]
pub struct InterpreterOptions {
    /// Preset variables (without sigils).
    pub scope: Scope,
    /// Source for `REQUIRED`/`OPTIONAL` declarations.
    pub query_params: BTreeMap<String, Value>,
    /// Physical lines with breakpoints.
    pub breakpoints: Vec<u32>,
    /// Debugger pacing mode.
    pub debug_step_mode: DebugStepMode,
}

/// Early run termination requested by `BREAK <code>` with a success code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    /// Three-digit status code supplied by the script.
    pub code: u16,
    /// Operator message, possibly empty.
    pub message: String,
}

/// Successful execution outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// `PRINT` and dry-run output lines, in order.
    pub output: Vec<String>,
    /// Final variable table.
    pub variables: Scope,
    /// Present when the script halted itself with `BREAK <code>`.
    pub halt: Option<Halt>,
}

/// Failed execution outcome.
///
/// Carries the partial run state accumulated before the failure so callers
/// can still produce a complete report.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    /// The canonical failure.
    pub error: HomeScriptError,
    /// Output lines produced before the failure.
    pub output: Vec<String>,
    /// Variable table at the failure point.
    pub variables: Scope,
}

// ============================================================================
// SECTION: Runtime Structures
// ============================================================================

/// A callable function bound to its owning program.
#[derive(Clone)]
struct RuntimeFn {
    /// Program the body lives in.
    program: Arc<Program>,
    /// Declaration details.
    info: FunctionInfo,
}

/// A suspended caller awaiting return.
struct Frame {
    /// Program to resume.
    program: Arc<Program>,
    /// Statement index to resume at.
    return_pc: usize,
    /// Caller scope to restore; `None` for import frames, which share the
    /// global scope.
    saved_scope: Option<Scope>,
}

// ============================================================================
// SECTION: Interpreter
// ============================================================================

/// Executes HomeScript source against a host binding.
pub struct Interpreter<'h> {
    /// Host capability slots.
    host: &'h dyn HostBindings,
    /// Run inputs.
    options: InterpreterOptions,
}

impl<'h> Interpreter<'h> {
    /// Builds an interpreter over a host binding.
    #[must_use]
    pub fn new(host: &'h dyn HostBindings, options: InterpreterOptions) -> Self {
        Self { host, options }
    }

    /// Parses and executes a script.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionFailure`] on syntax failures, semantic failures,
    /// wrapped host failures, and debugger stops. The failure carries the
    /// offending physical line when one is known, plus the output and
    /// variables accumulated before the failing statement.
    pub async fn execute(&self, source: &str) -> Result<ExecutionResult, ExecutionFailure> {
        let mut scope = self.options.scope.clone();
        let mut output: Vec<String> = Vec::new();
        match self.run(source, &mut scope, &mut output).await {
            Ok(halt) => Ok(ExecutionResult {
                output,
                variables: scope,
                halt,
            }),
            Err(error) => Err(ExecutionFailure {
                error,
                output,
                variables: scope,
            }),
        }
    }

    /// Statement loop over a shared scope and output buffer.
    ///
    /// The buffers remain valid on failure so `execute` can report partial
    /// run state.
    async fn run(
        &self,
        source: &str,
        scope: &mut Scope,
        output: &mut Vec<String>,
    ) -> Result<Option<Halt>, HomeScriptError> {
        let program = Arc::new(Program::parse(source)?);
        let mut functions: HashMap<String, RuntimeFn> = HashMap::new();
        register_functions(&program, &mut functions);

        let mut frames: Vec<Frame> = Vec::new();
        let mut imported: HashSet<String> = HashSet::new();
        let mut loop_counts: HashMap<(usize, usize), u64> = HashMap::new();

        let breakpoints: BTreeSet<u32> = self.options.breakpoints.iter().copied().collect();
        let debug_active = !breakpoints.is_empty()
            || self.options.debug_step_mode == DebugStepMode::Manual;
        let mut step_pending = self.options.debug_step_mode == DebugStepMode::Manual;

        let mut current = Arc::clone(&program);
        let mut pc = 0usize;

        loop {
            if pc >= current.stmts.len() {
                match frames.pop() {
                    Some(frame) => {
                        if let Some(saved) = frame.saved_scope {
                            *scope = saved;
                        }
                        current = frame.program;
                        pc = frame.return_pc;
                        continue;
                    }
                    None => break,
                }
            }

            let stmt = current.stmts[pc].clone();
            let line = stmt.line;

            if debug_active && (step_pending || breakpoints.contains(&line)) {
                match self.host.on_breakpoint(line, scope.clone()).await {
                    DebugAction::Continue => step_pending = false,
                    DebugAction::Step => step_pending = true,
                    DebugAction::Stop => {
                        return Err(HomeScriptError::at_line(DEBUGGER_STOPPED, line));
                    }
                }
            }

            match stmt.kind {
                StmtKind::SetVar { name, expr } => {
                    let value = eval_at(&expr, scope, line)?;
                    scope.set(name, value);
                    pc += 1;
                }
                StmtKind::SetEntity { entity, expr } => {
                    let value = eval_at(&expr, scope, line)?;
                    match self.host.set_state(&entity, value.clone()).await {
                        Ok(SetOutcome::Applied) => {}
                        Ok(SetOutcome::DryRun) => {
                            output.push(format!(
                                "[Dry Run] SET {entity} = {}",
                                value.string_form()
                            ));
                        }
                        Err(err) => {
                            return Err(HomeScriptError::at_line(
                                format!("SET failed: {err}"),
                                line,
                            ));
                        }
                    }
                    pc += 1;
                }
                StmtKind::Print { expr } => {
                    let value = eval_at(&expr, scope, line)?;
                    output.push(value.string_form());
                    pc += 1;
                }
                StmtKind::Get { entity, var } => {
                    match self.host.get_state(&entity).await {
                        Ok(GetOutcome::Live(value)) => scope.set(var, value),
                        Ok(GetOutcome::DryRun) => {
                            scope.set(var.clone(), Value::Null);
                            output.push(format!("[Dry Run] GET {entity} INTO ${var}"));
                        }
                        Err(err) => {
                            return Err(HomeScriptError::at_line(
                                format!("GET failed: {err}"),
                                line,
                            ));
                        }
                    }
                    pc += 1;
                }
                StmtKind::CallService { service, args } => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in &args {
                        values.push(eval_at(arg, scope, line)?);
                    }
                    match self.host.call_service(&service, values.clone()).await {
                        Ok(CallOutcome::Live(_)) => {}
                        Ok(CallOutcome::DryRun) => {
                            let rendered: Vec<String> =
                                values.iter().map(Value::string_form).collect();
                            output.push(format!(
                                "[Dry Run] CALL {service}({})",
                                rendered.join(", ")
                            ));
                        }
                        Err(err) => {
                            return Err(HomeScriptError::at_line(
                                format!("CALL failed: {err}"),
                                line,
                            ));
                        }
                    }
                    pc += 1;
                }
                StmtKind::CallFunction { name, args } => {
                    let Some(runtime_fn) = functions.get(&name).cloned() else {
                        return Err(HomeScriptError::at_line(
                            format!("Unknown function: {name}"),
                            line,
                        ));
                    };
                    if runtime_fn.info.params.len() != args.len() {
                        return Err(HomeScriptError::at_line(
                            format!(
                                "Function '{name}' expects {} arguments, got {}",
                                runtime_fn.info.params.len(),
                                args.len()
                            ),
                            line,
                        ));
                    }
                    let mut values = Vec::with_capacity(args.len());
                    for arg in &args {
                        values.push(eval_at(arg, scope, line)?);
                    }
                    // Local scope derives from the enclosing scope at call time.
                    let saved = scope.clone();
                    let mut local = scope.clone();
                    for (param, value) in runtime_fn.info.params.iter().zip(values) {
                        local.set(param.clone(), value);
                    }
                    frames.push(Frame {
                        program: Arc::clone(&current),
                        return_pc: pc + 1,
                        saved_scope: Some(saved),
                    });
                    *scope = local;
                    pc = runtime_fn.info.body_start;
                    current = runtime_fn.program;
                }
                StmtKind::If { .. } => {
                    pc = select_branch(&current, pc, scope)?;
                }
                StmtKind::ElseIf { .. } | StmtKind::Else => {
                    // Fell through after a taken branch: skip to END_IF.
                    pc = current.meta[pc]
                        .chain_end
                        .ok_or_else(|| internal_error(line))?;
                }
                StmtKind::EndIf => pc += 1,
                StmtKind::While { cond } => {
                    let key = (Arc::as_ptr(&current) as usize, pc);
                    if eval_at(&cond, scope, line)?.truthy() {
                        let count = loop_counts.entry(key).or_insert(0);
                        *count += 1;
                        if *count > LOOP_LIMIT {
                            return Err(HomeScriptError::at_line(
                                "Infinite loop detected",
                                line,
                            ));
                        }
                        pc += 1;
                    } else {
                        loop_counts.remove(&key);
                        pc = current.meta[pc]
                            .while_end
                            .ok_or_else(|| internal_error(line))?
                            + 1;
                    }
                }
                StmtKind::EndWhile => {
                    pc = current.meta[pc]
                        .while_start
                        .ok_or_else(|| internal_error(line))?;
                }
                StmtKind::LoopBreak => {
                    let Some(start) = current.meta[pc].enclosing_while else {
                        return Err(HomeScriptError::at_line("BREAK outside of loop", line));
                    };
                    loop_counts.remove(&(Arc::as_ptr(&current) as usize, start));
                    pc = current.meta[start]
                        .while_end
                        .ok_or_else(|| internal_error(line))?
                        + 1;
                }
                StmtKind::LoopContinue => {
                    let Some(start) = current.meta[pc].enclosing_while else {
                        return Err(HomeScriptError::at_line("CONTINUE outside of loop", line));
                    };
                    pc = start;
                }
                StmtKind::Halt { code, message } => {
                    if code >= 400 {
                        let message = if message.is_empty() {
                            format!("Script aborted with status {code}")
                        } else {
                            message
                        };
                        return Err(HomeScriptError::at_line(message, line).with_status(code));
                    }
                    self.host
                        .trace(TraceEvent::info(Some(line), format!("BREAK {code}")));
                    return Ok(Some(Halt { code, message }));
                }
                StmtKind::FunctionDecl { .. } => {
                    // Declarations are hoisted; skip the body in normal flow.
                    pc = current.meta[pc]
                        .function_end
                        .ok_or_else(|| internal_error(line))?
                        + 1;
                }
                StmtKind::Return { expr } => {
                    let value = match &expr {
                        Some(expr) => Some(eval_at(expr, scope, line)?),
                        None => None,
                    };
                    let restored = frames.pop().and_then(|frame| {
                        frame
                            .saved_scope
                            .map(|saved| (frame.program, frame.return_pc, saved))
                    });
                    let Some((program, return_pc, saved)) = restored else {
                        return Err(HomeScriptError::at_line(
                            "RETURN outside of function",
                            line,
                        ));
                    };
                    *scope = saved;
                    if let Some(value) = value {
                        scope.set("RETURN", value);
                    }
                    current = program;
                    pc = return_pc;
                }
                StmtKind::EndFunction => {
                    let restored = frames.pop().and_then(|frame| {
                        frame
                            .saved_scope
                            .map(|saved| (frame.program, frame.return_pc, saved))
                    });
                    let Some((program, return_pc, saved)) = restored else {
                        return Err(HomeScriptError::at_line(
                            "END_FUNCTION outside of function",
                            line,
                        ));
                    };
                    *scope = saved;
                    current = program;
                    pc = return_pc;
                }
                StmtKind::Import { name } => {
                    if imported.contains(&name) {
                        pc += 1;
                    } else {
                        imported.insert(name.clone());
                        let source = self.host.import(&name).await.map_err(|err| {
                            HomeScriptError::at_line(
                                format!("Failed to import '{name}': {err}"),
                                line,
                            )
                        })?;
                        let module = Program::parse(&source).map_err(|err| {
                            HomeScriptError::at_line(
                                format!("Failed to import '{name}': {}", err.message),
                                line,
                            )
                        })?;
                        let module = Arc::new(module);
                        register_functions(&module, &mut functions);
                        self.host
                            .trace(TraceEvent::info(Some(line), format!("Imported '{name}'")));
                        frames.push(Frame {
                            program: Arc::clone(&current),
                            return_pc: pc + 1,
                            saved_scope: None,
                        });
                        current = module;
                        pc = 0;
                    }
                }
                StmtKind::Required { name, validator } => {
                    let Some(value) = self.options.query_params.get(&name) else {
                        return Err(HomeScriptError::at_line(
                            format!("Missing required query variable: {name}"),
                            line,
                        ));
                    };
                    scope.set(name.clone(), value.clone());
                    check_validator(&validator, scope, &name, line)?;
                    pc += 1;
                }
                StmtKind::OptionalDecl {
                    name,
                    default,
                    validator,
                } => {
                    match self.options.query_params.get(&name) {
                        Some(value) => {
                            scope.set(name.clone(), value.clone());
                            check_validator(&validator, scope, &name, line)?;
                        }
                        None => {
                            let value = match &default {
                                Some(expr) => eval_at(expr, scope, line)?,
                                None => Value::String(String::new()),
                            };
                            scope.set(name.clone(), value);
                        }
                    }
                    pc += 1;
                }
                StmtKind::Label { .. } => pc += 1,
                StmtKind::Goto { name } => {
                    let Some(&target) = current.labels.get(&name) else {
                        return Err(HomeScriptError::at_line(
                            format!("GOTO to unknown label: {name}"),
                            line,
                        ));
                    };
                    if current.meta[target].enclosing_fn != current.meta[pc].enclosing_fn {
                        return Err(HomeScriptError::at_line(
                            "GOTO cannot jump across function boundaries",
                            line,
                        ));
                    }
                    pc = target;
                }
                StmtKind::Test {
                    pattern,
                    flags,
                    value,
                    target,
                } => {
                    let regex = build_regex(&pattern, &flags)
                        .map_err(|reason| HomeScriptError::at_line(reason, line))?;
                    let candidate = eval_at(&value, scope, line)?.string_form();
                    scope.set(target, Value::Bool(regex.is_match(&candidate)));
                    pc += 1;
                }
            }
        }

        Ok(None)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Registers all functions declared by a program, latest wins.
fn register_functions(program: &Arc<Program>, functions: &mut HashMap<String, RuntimeFn>) {
    for info in &program.functions {
        functions.insert(
            info.name.clone(),
            RuntimeFn {
                program: Arc::clone(program),
                info: info.clone(),
            },
        );
    }
}

/// Evaluates an expression, anchoring failures to the statement line.
fn eval_at(expr: &Expr, scope: &Scope, line: u32) -> Result<Value, HomeScriptError> {
    expr.eval(scope)
        .map_err(|err| HomeScriptError::at_line(err.to_string(), line))
}

/// Applies a `REQUIRED`/`OPTIONAL` validator with the value already bound.
fn check_validator(
    validator: &Option<Expr>,
    scope: &Scope,
    name: &str,
    line: u32,
) -> Result<(), HomeScriptError> {
    if let Some(expr) = validator {
        let passed = expr
            .eval(scope)
            .map(|value| value.truthy())
            .unwrap_or(false);
        if !passed {
            return Err(HomeScriptError::at_line(
                format!("Validation failed for {name}"),
                line,
            ));
        }
    }
    Ok(())
}

/// Walks an `IF` chain and returns the statement index to continue at.
fn select_branch(program: &Arc<Program>, start: usize, scope: &Scope) -> Result<usize, HomeScriptError> {
    let mut idx = start;
    loop {
        let line = program.stmts[idx].line;
        match &program.stmts[idx].kind {
            StmtKind::If { cond } | StmtKind::ElseIf { cond } => {
                if eval_at(cond, scope, line)?.truthy() {
                    return Ok(idx + 1);
                }
                idx = program.meta[idx]
                    .chain_next
                    .ok_or_else(|| internal_error(line))?;
            }
            StmtKind::Else | StmtKind::EndIf => return Ok(idx + 1),
            _ => return Err(internal_error(line)),
        }
    }
}

/// Compiles a `/pattern/flags` literal into a regex.
///
/// JavaScript-style `g` and `u` flags are accepted and ignored; `i`, `m`,
/// `s`, and `x` map to inline flags.
fn build_regex(pattern: &str, flags: &str) -> Result<Regex, String> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => inline.push(flag),
            'g' | 'u' => {}
            other => return Err(format!("Invalid regex flag '{other}' in TEST")),
        }
    }
    let full = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    Regex::new(&full).map_err(|err| format!("Invalid regex in TEST: {err}"))
}

/// Control-flow metadata was missing; indicates a resolver bug.
fn internal_error(line: u32) -> HomeScriptError {
    HomeScriptError::at_line("Internal control-flow error", line)
}
