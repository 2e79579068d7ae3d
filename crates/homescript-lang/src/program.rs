// homescript-lang/src/program.rs
// ============================================================================
// Module: Program Model
// Description: Statement parsing and block/label resolution.
// Purpose: Turn logical lines into a flat, index-resolved statement list.
// Dependencies: crate::{error, expr, lines}
// ============================================================================

//! ## Overview
//! A HomeScript program is a flat statement list. A resolution pass links
//! `IF` chains, pairs `WHILE`/`END_WHILE`, extracts function spans, maps
//! labels to statement indices, and records the enclosing loop and function
//! for every statement. The interpreter executes by program counter, which
//! keeps `GOTO` and the debugger simple.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::HomeScriptError;
use crate::expr::Expr;
use crate::expr::parse as parse_expr;
use crate::expr::parse_list;
use crate::lines::LogicalLine;
use crate::lines::logical_lines;

// ============================================================================
// SECTION: Statement Kinds
// ============================================================================

/// One parsed HomeScript statement.
#[derive(Debug, Clone)]
pub struct Stmt {
    /// 1-based physical line of the statement opener.
    pub line: u32,
    /// Parsed statement payload.
    pub kind: StmtKind,
}

/// Statement payloads.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `SET $var = expr`
    SetVar {
        /// Target variable name, without sigil.
        name: String,
        /// Value expression.
        expr: Expr,
    },
    /// `SET entity_id = expr`
    SetEntity {
        /// Target entity identifier.
        entity: String,
        /// Value expression.
        expr: Expr,
    },
    /// `PRINT expr`
    Print {
        /// Printed expression.
        expr: Expr,
    },
    /// `GET entity_id INTO $var`
    Get {
        /// Source entity identifier.
        entity: String,
        /// Target variable name, without sigil.
        var: String,
    },
    /// `CALL domain.service(args)`
    CallService {
        /// Dotted service name.
        service: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
    /// `CALL func(args)` for a user function.
    CallFunction {
        /// Function name.
        name: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
    /// `IF cond`
    If {
        /// Branch condition.
        cond: Expr,
    },
    /// `ELSE IF cond`
    ElseIf {
        /// Branch condition.
        cond: Expr,
    },
    /// `ELSE`
    Else,
    /// `END_IF`
    EndIf,
    /// `WHILE cond DO`
    While {
        /// Loop condition.
        cond: Expr,
    },
    /// `END_WHILE`
    EndWhile,
    /// `FUNCTION name(params)`
    FunctionDecl {
        /// Function name.
        name: String,
        /// Parameter names, without sigils.
        params: Vec<String>,
    },
    /// `END_FUNCTION`
    EndFunction,
    /// `RETURN [expr]`
    Return {
        /// Optional return value expression.
        expr: Option<Expr>,
    },
    /// Bare `BREAK` inside a loop.
    LoopBreak,
    /// `CONTINUE`
    LoopContinue,
    /// `BREAK code ["message"]` halting the whole run.
    Halt {
        /// Three-digit status code.
        code: u16,
        /// Optional operator message.
        message: String,
    },
    /// `IMPORT "name"`
    Import {
        /// Imported module endpoint name.
        name: String,
    },
    /// `REQUIRED $name [IF (validator)]`
    Required {
        /// Declared parameter name.
        name: String,
        /// Optional validator expression.
        validator: Option<Expr>,
    },
    /// `OPTIONAL $name [= default] [IF (validator)]`
    OptionalDecl {
        /// Declared parameter name.
        name: String,
        /// Optional default expression.
        default: Option<Expr>,
        /// Optional validator expression.
        validator: Option<Expr>,
    },
    /// `LABEL name`
    Label {
        /// Label name.
        name: String,
    },
    /// `GOTO name`
    Goto {
        /// Target label name.
        name: String,
    },
    /// `TEST a b [INTO $var]`
    Test {
        /// Regex pattern text.
        pattern: String,
        /// Regex flags.
        flags: String,
        /// Value expression matched against the pattern.
        value: Expr,
        /// Target variable for the boolean result.
        target: String,
    },
}

// ============================================================================
// SECTION: Resolved Metadata
// ============================================================================

/// Per-statement structural metadata filled in by the resolution pass.
#[derive(Debug, Clone, Default)]
pub struct StmtMeta {
    /// For `IF`/`ELSE IF`/`ELSE`: the next marker in the chain.
    pub chain_next: Option<usize>,
    /// For chain members: the `END_IF` index.
    pub chain_end: Option<usize>,
    /// For `WHILE`: the matching `END_WHILE` index.
    pub while_end: Option<usize>,
    /// For `END_WHILE`: the matching `WHILE` index.
    pub while_start: Option<usize>,
    /// For `FUNCTION`: the matching `END_FUNCTION` index.
    pub function_end: Option<usize>,
    /// Innermost enclosing `WHILE` index, when any.
    pub enclosing_while: Option<usize>,
    /// Enclosing `FUNCTION` declaration index, when any.
    pub enclosing_fn: Option<usize>,
}

/// A user function extracted from the statement list.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Function name.
    pub name: String,
    /// Parameter names, without sigils.
    pub params: Vec<String>,
    /// Index of the first body statement.
    pub body_start: usize,
    /// Physical line of the declaration.
    pub line: u32,
}

/// A fully parsed and resolved program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Flat statement list.
    pub stmts: Vec<Stmt>,
    /// Label name to statement index.
    pub labels: HashMap<String, usize>,
    /// Structural metadata, parallel to `stmts`.
    pub meta: Vec<StmtMeta>,
    /// Functions declared by this program.
    pub functions: Vec<FunctionInfo>,
}

// ============================================================================
// SECTION: Statement Parsing
// ============================================================================

/// `GET entity INTO $var`
static GET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+INTO\s+\$([A-Za-z_][A-Za-z0-9_]*)$").unwrap_or_else(|_| unreachable!())
});
/// `FUNCTION name(params)`
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)$").unwrap_or_else(|_| unreachable!())
});
/// `IMPORT "name"`
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"]+)"$"#).unwrap_or_else(|_| unreachable!()));
/// Trailing `IF (validator)` on a parameter declaration.
static DECL_VALIDATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+IF\s*\((.*)\)\s*$").unwrap_or_else(|_| unreachable!()));
/// `BREAK code [message]`
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{3})(?:\s+(.*))?$").unwrap_or_else(|_| unreachable!()));
/// Trailing `INTO $var` on a `TEST` statement.
static TEST_INTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+INTO\s+\$([A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap_or_else(|_| unreachable!())
});
/// Trailing `/pattern/flags` regex literal.
static TEST_TRAILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*\S)\s+/((?:[^/\\]|\\.)*)/([A-Za-z]*)$").unwrap_or_else(|_| unreachable!())
});
/// Bare identifier (labels, GOTO targets).
static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|_| unreachable!()));

/// Parses one logical line into a statement.
pub(crate) fn parse_logical_line(line: &LogicalLine) -> Result<Stmt, HomeScriptError> {
    let text = line.text.trim();
    let number = line.number;
    let (keyword, rest) = match text.find(char::is_whitespace) {
        Some(split) => (&text[..split], text[split..].trim_start()),
        None => (text, ""),
    };

    let kind = match keyword {
        "SET" => parse_set(rest, number)?,
        "PRINT" => StmtKind::Print {
            expr: parse_expr_at(rest, number)?,
        },
        "GET" => {
            let captures = GET_RE
                .captures(rest)
                .ok_or_else(|| HomeScriptError::at_line("Malformed GET: expected 'GET entity_id INTO $var'", number))?;
            StmtKind::Get {
                entity: captures[1].to_string(),
                var: captures[2].to_string(),
            }
        }
        "CALL" => parse_call(rest, number)?,
        "IF" => StmtKind::If {
            cond: parse_expr_at(rest, number)?,
        },
        "ELSE" => {
            if rest.is_empty() {
                StmtKind::Else
            } else if let Some(cond) = rest.strip_prefix("IF") {
                StmtKind::ElseIf {
                    cond: parse_expr_at(cond.trim_start(), number)?,
                }
            } else {
                return Err(HomeScriptError::at_line("Malformed ELSE", number));
            }
        }
        "END_IF" => expect_bare(rest, number, "END_IF", StmtKind::EndIf)?,
        "WHILE" => {
            let cond_text = rest.strip_suffix(" DO").map_or(rest, str::trim_end);
            StmtKind::While {
                cond: parse_expr_at(cond_text.trim_end(), number)?,
            }
        }
        "END_WHILE" => expect_bare(rest, number, "END_WHILE", StmtKind::EndWhile)?,
        "FUNCTION" => {
            let captures = FUNCTION_RE.captures(rest).ok_or_else(|| {
                HomeScriptError::at_line("Malformed FUNCTION: expected 'FUNCTION name(params)'", number)
            })?;
            let mut params = Vec::new();
            let raw_params = captures[2].trim();
            if !raw_params.is_empty() {
                for raw in raw_params.split(',') {
                    let name = raw.trim().trim_start_matches('$');
                    if !IDENT_RE.is_match(name) {
                        return Err(HomeScriptError::at_line(
                            format!("Invalid parameter name '{}'", raw.trim()),
                            number,
                        ));
                    }
                    params.push(name.to_string());
                }
            }
            StmtKind::FunctionDecl {
                name: captures[1].to_string(),
                params,
            }
        }
        "END_FUNCTION" => expect_bare(rest, number, "END_FUNCTION", StmtKind::EndFunction)?,
        "RETURN" => StmtKind::Return {
            expr: if rest.is_empty() {
                None
            } else {
                Some(parse_expr_at(rest, number)?)
            },
        },
        "BREAK" => {
            if rest.is_empty() {
                StmtKind::LoopBreak
            } else {
                let captures = BREAK_RE.captures(rest).ok_or_else(|| {
                    HomeScriptError::at_line(
                        "Malformed BREAK: expected 'BREAK' or 'BREAK <3-digit code> [message]'",
                        number,
                    )
                })?;
                let code = captures[1].parse::<u16>().map_err(|_| {
                    HomeScriptError::at_line("Malformed BREAK: invalid status code", number)
                })?;
                let message = captures
                    .get(2)
                    .map(|m| unquote(m.as_str().trim()))
                    .unwrap_or_default();
                StmtKind::Halt { code, message }
            }
        }
        "CONTINUE" => expect_bare(rest, number, "CONTINUE", StmtKind::LoopContinue)?,
        "IMPORT" => {
            let captures = IMPORT_RE.captures(rest).ok_or_else(|| {
                HomeScriptError::at_line("Malformed IMPORT: expected 'IMPORT \"name\"'", number)
            })?;
            StmtKind::Import {
                name: captures[1].to_string(),
            }
        }
        "REQUIRED" => {
            let (name, default, validator) = parse_declaration(rest, number, false)?;
            debug_assert!(default.is_none());
            StmtKind::Required { name, validator }
        }
        "OPTIONAL" => {
            let (name, default, validator) = parse_declaration(rest, number, true)?;
            StmtKind::OptionalDecl {
                name,
                default,
                validator,
            }
        }
        "LABEL" => {
            if IDENT_RE.is_match(rest) {
                StmtKind::Label {
                    name: rest.to_string(),
                }
            } else {
                return Err(HomeScriptError::at_line(
                    "Malformed LABEL: expected 'LABEL name'",
                    number,
                ));
            }
        }
        "GOTO" => {
            if IDENT_RE.is_match(rest) {
                StmtKind::Goto {
                    name: rest.to_string(),
                }
            } else {
                return Err(HomeScriptError::at_line(
                    "Malformed GOTO: expected 'GOTO name'",
                    number,
                ));
            }
        }
        "TEST" => parse_test(rest, number)?,
        other => {
            return Err(HomeScriptError::at_line(
                format!("Invalid keyword: {other}"),
                number,
            ));
        }
    };

    Ok(Stmt { line: number, kind })
}

/// Parses an expression, anchoring failures to the statement line.
fn parse_expr_at(source: &str, line: u32) -> Result<Expr, HomeScriptError> {
    if source.is_empty() {
        return Err(HomeScriptError::at_line("Missing expression", line));
    }
    parse_expr(source).map_err(|err| HomeScriptError::at_line(err.to_string(), line))
}

/// Rejects trailing text after a bare keyword.
fn expect_bare(
    rest: &str,
    line: u32,
    keyword: &str,
    kind: StmtKind,
) -> Result<StmtKind, HomeScriptError> {
    if rest.is_empty() {
        Ok(kind)
    } else {
        Err(HomeScriptError::at_line(
            format!("{keyword} takes no arguments"),
            line,
        ))
    }
}

/// Strips one layer of double quotes when present.
fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

/// Parses a `SET` statement, dispatching on the `$` sigil.
fn parse_set(rest: &str, line: u32) -> Result<StmtKind, HomeScriptError> {
    let Some(eq) = rest.find('=') else {
        return Err(HomeScriptError::at_line(
            "Malformed SET: expected 'SET target = expr'",
            line,
        ));
    };
    let target = rest[..eq].trim();
    let expr = parse_expr_at(rest[eq + 1..].trim(), line)?;
    if let Some(name) = target.strip_prefix('$') {
        if !IDENT_RE.is_match(name) {
            return Err(HomeScriptError::at_line(
                format!("Invalid SET target '{target}'"),
                line,
            ));
        }
        Ok(StmtKind::SetVar {
            name: name.to_string(),
            expr,
        })
    } else if !target.is_empty() && !target.contains(char::is_whitespace) {
        Ok(StmtKind::SetEntity {
            entity: target.to_string(),
            expr,
        })
    } else {
        Err(HomeScriptError::at_line(
            format!("Invalid SET target '{target}'"),
            line,
        ))
    }
}

/// Parses a `CALL` statement into a service or user-function call.
fn parse_call(rest: &str, line: u32) -> Result<StmtKind, HomeScriptError> {
    let Some(open) = rest.find('(') else {
        return Err(HomeScriptError::at_line(
            "Malformed CALL: expected 'CALL name(args)'",
            line,
        ));
    };
    let name = rest[..open].trim();
    let Some(inner) = rest[open + 1..].strip_suffix(')') else {
        return Err(HomeScriptError::at_line(
            "Malformed CALL: missing closing ')'",
            line,
        ));
    };
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(HomeScriptError::at_line(
            format!("Invalid CALL target '{name}'"),
            line,
        ));
    }
    let args =
        parse_list(inner).map_err(|err| HomeScriptError::at_line(err.to_string(), line))?;
    if name.contains('.') {
        Ok(StmtKind::CallService {
            service: name.to_string(),
            args,
        })
    } else {
        Ok(StmtKind::CallFunction {
            name: name.to_string(),
            args,
        })
    }
}

/// Parses `REQUIRED`/`OPTIONAL` declarations.
///
/// Returns `(name, default, validator)`; `REQUIRED` rejects defaults.
fn parse_declaration(
    rest: &str,
    line: u32,
    allow_default: bool,
) -> Result<(String, Option<Expr>, Option<Expr>), HomeScriptError> {
    let keyword = if allow_default { "OPTIONAL" } else { "REQUIRED" };
    let (head, validator) = match DECL_VALIDATOR_RE.find(rest) {
        Some(found) => {
            let captures = DECL_VALIDATOR_RE
                .captures(rest)
                .ok_or_else(|| HomeScriptError::at_line(format!("Malformed {keyword}"), line))?;
            (
                rest[..found.start()].trim(),
                Some(parse_expr_at(captures[1].trim(), line)?),
            )
        }
        None => (rest.trim(), None),
    };

    let (name_part, default) = match head.find('=') {
        Some(eq) if allow_default => (
            head[..eq].trim(),
            Some(parse_expr_at(head[eq + 1..].trim(), line)?),
        ),
        Some(_) => {
            return Err(HomeScriptError::at_line(
                format!("Malformed {keyword}: defaults are not allowed"),
                line,
            ));
        }
        None => (head, None),
    };

    let Some(name) = name_part.strip_prefix('$') else {
        return Err(HomeScriptError::at_line(
            format!("Malformed {keyword}: expected '{keyword} $name'"),
            line,
        ));
    };
    if !IDENT_RE.is_match(name) {
        return Err(HomeScriptError::at_line(
            format!("Malformed {keyword}: invalid name '{name_part}'"),
            line,
        ));
    }
    Ok((name.to_string(), default, validator))
}

/// Parses a `TEST` statement: one operand is a `/pattern/flags` literal, the
/// other a value expression, in either order.
fn parse_test(rest: &str, line: u32) -> Result<StmtKind, HomeScriptError> {
    let (body, target) = match TEST_INTO_RE.captures(rest) {
        Some(captures) => {
            let found = TEST_INTO_RE
                .find(rest)
                .ok_or_else(|| HomeScriptError::at_line("Malformed TEST", line))?;
            (rest[..found.start()].trim(), captures[1].to_string())
        }
        None => (rest.trim(), "TEST".to_string()),
    };

    if let Some(after) = body.strip_prefix('/') {
        // Leading regex literal: scan for the unescaped closing slash.
        let chars: Vec<char> = after.chars().collect();
        let mut pos = 0;
        let mut pattern = String::new();
        while pos < chars.len() && chars[pos] != '/' {
            if chars[pos] == '\\' && pos + 1 < chars.len() {
                pattern.push(chars[pos]);
                pattern.push(chars[pos + 1]);
                pos += 2;
            } else {
                pattern.push(chars[pos]);
                pos += 1;
            }
        }
        if pos >= chars.len() {
            return Err(HomeScriptError::at_line(
                "Malformed TEST: unterminated regex literal",
                line,
            ));
        }
        let tail: String = chars[pos + 1..].iter().collect();
        let (flags, value_text) = match tail.find(char::is_whitespace) {
            Some(split) => (tail[..split].to_string(), tail[split..].trim().to_string()),
            None => {
                return Err(HomeScriptError::at_line(
                    "Malformed TEST: missing value operand",
                    line,
                ));
            }
        };
        let value = parse_expr_at(&value_text, line)?;
        return Ok(StmtKind::Test {
            pattern,
            flags,
            value,
            target,
        });
    }

    let captures = TEST_TRAILING_RE.captures(body).ok_or_else(|| {
        HomeScriptError::at_line(
            "Malformed TEST: expected a /pattern/flags regex literal and a value",
            line,
        )
    })?;
    let value = parse_expr_at(captures[1].trim(), line)?;
    Ok(StmtKind::Test {
        pattern: captures[2].to_string(),
        flags: captures[3].to_string(),
        value,
        target,
    })
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// An open block tracked during resolution.
enum Opener {
    /// `IF` chain: all markers seen so far, latest last.
    If(Vec<usize>),
    /// `WHILE` opener index.
    While(usize),
    /// `FUNCTION` opener index.
    Func(usize),
}

impl Program {
    /// Parses source text into a resolved program.
    ///
    /// # Errors
    ///
    /// Returns [`HomeScriptError`] on malformed statements, unbalanced
    /// blocks, or duplicate labels/functions. The line on the error is the
    /// opener's line for unterminated blocks.
    pub fn parse(source: &str) -> Result<Self, HomeScriptError> {
        let mut stmts = Vec::new();
        for line in logical_lines(source) {
            stmts.push(parse_logical_line(&line)?);
        }
        Self::resolve(stmts)
    }

    /// Runs the block/label resolution pass over parsed statements.
    fn resolve(stmts: Vec<Stmt>) -> Result<Self, HomeScriptError> {
        let mut meta = vec![StmtMeta::default(); stmts.len()];
        let mut labels: HashMap<String, usize> = HashMap::new();
        let mut functions: Vec<FunctionInfo> = Vec::new();
        let mut stack: Vec<Opener> = Vec::new();

        for idx in 0..stmts.len() {
            meta[idx].enclosing_while = stack.iter().rev().find_map(|opener| match opener {
                Opener::While(start) => Some(*start),
                _ => None,
            });
            meta[idx].enclosing_fn = stack.iter().rev().find_map(|opener| match opener {
                Opener::Func(start) => Some(*start),
                _ => None,
            });

            let line = stmts[idx].line;
            match &stmts[idx].kind {
                StmtKind::If { .. } => stack.push(Opener::If(vec![idx])),
                StmtKind::ElseIf { .. } | StmtKind::Else => match stack.last_mut() {
                    Some(Opener::If(members)) => {
                        if let Some(last) = members.last() {
                            meta[*last].chain_next = Some(idx);
                        }
                        members.push(idx);
                    }
                    _ => {
                        return Err(HomeScriptError::at_line("ELSE without matching IF", line));
                    }
                },
                StmtKind::EndIf => match stack.pop() {
                    Some(Opener::If(members)) => {
                        for member in &members {
                            meta[*member].chain_end = Some(idx);
                        }
                        if let Some(last) = members.last() {
                            if meta[*last].chain_next.is_none() {
                                meta[*last].chain_next = Some(idx);
                            }
                        }
                    }
                    _ => {
                        return Err(HomeScriptError::at_line("END_IF without matching IF", line));
                    }
                },
                StmtKind::While { .. } => stack.push(Opener::While(idx)),
                StmtKind::EndWhile => match stack.pop() {
                    Some(Opener::While(start)) => {
                        meta[start].while_end = Some(idx);
                        meta[idx].while_start = Some(start);
                    }
                    _ => {
                        return Err(HomeScriptError::at_line(
                            "END_WHILE without matching WHILE",
                            line,
                        ));
                    }
                },
                StmtKind::FunctionDecl { .. } => stack.push(Opener::Func(idx)),
                StmtKind::EndFunction => match stack.pop() {
                    Some(Opener::Func(start)) => {
                        meta[start].function_end = Some(idx);
                        let StmtKind::FunctionDecl { name, params } = stmts[start].kind.clone()
                        else {
                            return Err(HomeScriptError::at_line(
                                "Malformed FUNCTION",
                                stmts[start].line,
                            ));
                        };
                        if functions.iter().any(|f| f.name == name) {
                            return Err(HomeScriptError::at_line(
                                format!("Duplicate function '{name}'"),
                                stmts[start].line,
                            ));
                        }
                        functions.push(FunctionInfo {
                            name,
                            params,
                            body_start: start + 1,
                            line: stmts[start].line,
                        });
                    }
                    _ => {
                        return Err(HomeScriptError::at_line(
                            "END_FUNCTION without matching FUNCTION",
                            line,
                        ));
                    }
                },
                StmtKind::Label { name } => {
                    if labels.insert(name.clone(), idx).is_some() {
                        return Err(HomeScriptError::at_line(
                            format!("Duplicate label '{name}'"),
                            line,
                        ));
                    }
                }
                _ => {}
            }
        }

        if let Some(opener) = stack.last() {
            let (index, what) = match opener {
                Opener::If(members) => (members.first().copied().unwrap_or(0), "END_IF"),
                Opener::While(start) => (*start, "END_WHILE"),
                Opener::Func(start) => (*start, "END_FUNCTION"),
            };
            return Err(HomeScriptError::at_line(
                format!("Missing {what}"),
                stmts[index].line,
            ));
        }

        Ok(Self {
            stmts,
            labels,
            meta,
            functions,
        })
    }

    /// Looks up a declared function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }
}
