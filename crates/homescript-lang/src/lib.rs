// homescript-lang/src/lib.rs
// ============================================================================
// Module: HomeScript Language Root
// Description: Public API surface for the HomeScript language subsystem.
// Purpose: Wire together the evaluator, validator, interpreter, and host trait.
// Dependencies: crate::{error, expr, host, interpreter, lines, program, token,
//              validate, value}
// ============================================================================

//! ## Overview
//! HomeScript is a line-oriented automation language. This crate owns the
//! language itself: tagged runtime values, the expression evaluator, the
//! static validator, and the interpreter with its host-binding interface.
//! It performs no I/O of its own; every side effect goes through
//! [`HostBindings`].

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod error;
pub mod expr;
pub mod host;
pub mod interpreter;
pub mod lines;
pub mod program;
pub mod token;
pub mod validate;
pub mod value;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::HomeScriptError;
pub use expr::Expr;
pub use expr::evaluate;
pub use expr::interpolate;
pub use host::CallOutcome;
pub use host::DebugAction;
pub use host::DryRunHost;
pub use host::GetOutcome;
pub use host::HostBindings;
pub use host::HostError;
pub use host::SetOutcome;
pub use host::TraceEvent;
pub use host::TraceLevel;
pub use interpreter::DebugStepMode;
pub use interpreter::ExecutionFailure;
pub use interpreter::ExecutionResult;
pub use interpreter::Halt;
pub use interpreter::Interpreter;
pub use interpreter::InterpreterOptions;
pub use lines::LogicalLine;
pub use lines::logical_lines;
pub use program::Program;
pub use validate::Diagnostic;
pub use validate::validate;
pub use value::Scope;
pub use value::Value;
