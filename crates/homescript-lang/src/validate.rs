// homescript-lang/src/validate.rs
// ============================================================================
// Module: Static Validator
// Description: Diagnostic scan for HomeScript source.
// Purpose: Report structural problems without executing anything.
// Dependencies: crate::{lines, program}
// ============================================================================

//! ## Overview
//! The validator never throws: it always returns a (possibly empty) list of
//! diagnostics. It reuses the statement parser for per-line shape checks and
//! adds whole-script checks: block balance, parameter-declaration placement,
//! duplicate labels, and unknown `GOTO` targets. Every reported line is a
//! valid 1-based physical line of the input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::lines::logical_lines;
use crate::program::Stmt;
use crate::program::StmtKind;

// ============================================================================
// SECTION: Diagnostic
// ============================================================================

/// One validator finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based physical line of the finding.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Builds a diagnostic.
    #[must_use]
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Scans a script and returns all diagnostics found.
#[must_use]
pub fn validate(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stmts: Vec<Stmt> = Vec::new();

    for line in logical_lines(source) {
        match crate::program::parse_logical_line(&line) {
            Ok(stmt) => stmts.push(stmt),
            Err(err) => {
                diagnostics.push(Diagnostic::new(err.line.unwrap_or(line.number), err.message));
            }
        }
    }

    check_declaration_placement(&stmts, &mut diagnostics);
    check_block_balance(&stmts, &mut diagnostics);
    check_labels(&stmts, &mut diagnostics);

    diagnostics.sort_by_key(|diagnostic| diagnostic.line);
    diagnostics
}

/// `REQUIRED`/`OPTIONAL` must precede all other statements.
fn check_declaration_placement(stmts: &[Stmt], diagnostics: &mut Vec<Diagnostic>) {
    let mut body_started = false;
    for stmt in stmts {
        match stmt.kind {
            StmtKind::Required { .. } | StmtKind::OptionalDecl { .. } => {
                if body_started {
                    diagnostics.push(Diagnostic::new(
                        stmt.line,
                        "REQUIRED/OPTIONAL must be at the top of script",
                    ));
                }
            }
            _ => body_started = true,
        }
    }
}

/// Open blocks tracked while scanning.
struct OpenBlock {
    /// Opener line.
    line: u32,
    /// Terminator keyword expected.
    terminator: &'static str,
}

/// Reports unbalanced `IF`/`WHILE`/`FUNCTION` blocks.
fn check_block_balance(stmts: &[Stmt], diagnostics: &mut Vec<Diagnostic>) {
    let mut stack: Vec<OpenBlock> = Vec::new();
    for stmt in stmts {
        match stmt.kind {
            StmtKind::If { .. } => stack.push(OpenBlock {
                line: stmt.line,
                terminator: "END_IF",
            }),
            StmtKind::While { .. } => stack.push(OpenBlock {
                line: stmt.line,
                terminator: "END_WHILE",
            }),
            StmtKind::FunctionDecl { .. } => stack.push(OpenBlock {
                line: stmt.line,
                terminator: "END_FUNCTION",
            }),
            StmtKind::ElseIf { .. } | StmtKind::Else => {
                if !matches!(
                    stack.last(),
                    Some(OpenBlock {
                        terminator: "END_IF",
                        ..
                    })
                ) {
                    diagnostics.push(Diagnostic::new(stmt.line, "ELSE without matching IF"));
                }
            }
            StmtKind::EndIf => pop_block(&mut stack, "END_IF", stmt.line, diagnostics),
            StmtKind::EndWhile => pop_block(&mut stack, "END_WHILE", stmt.line, diagnostics),
            StmtKind::EndFunction => {
                pop_block(&mut stack, "END_FUNCTION", stmt.line, diagnostics);
            }
            _ => {}
        }
    }
    for open in stack {
        diagnostics.push(Diagnostic::new(
            open.line,
            format!("Missing {}", open.terminator),
        ));
    }
}

/// Pops the expected terminator or reports the stray one at its own line.
fn pop_block(
    stack: &mut Vec<OpenBlock>,
    terminator: &'static str,
    line: u32,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match stack.last() {
        Some(open) if open.terminator == terminator => {
            stack.pop();
        }
        _ => {
            diagnostics.push(Diagnostic::new(
                line,
                format!("{terminator} without matching opener"),
            ));
        }
    }
}

/// Reports duplicate labels and `GOTO` targets that do not exist.
fn check_labels(stmts: &[Stmt], diagnostics: &mut Vec<Diagnostic>) {
    let mut labels: Vec<&str> = Vec::new();
    for stmt in stmts {
        if let StmtKind::Label { name } = &stmt.kind {
            if labels.contains(&name.as_str()) {
                diagnostics.push(Diagnostic::new(
                    stmt.line,
                    format!("Duplicate label '{name}'"),
                ));
            } else {
                labels.push(name);
            }
        }
    }
    for stmt in stmts {
        if let StmtKind::Goto { name } = &stmt.kind {
            if !labels.contains(&name.as_str()) {
                diagnostics.push(Diagnostic::new(
                    stmt.line,
                    format!("GOTO to unknown label: {name}"),
                ));
            }
        }
    }
}
