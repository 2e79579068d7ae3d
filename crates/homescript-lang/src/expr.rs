// homescript-lang/src/expr.rs
// ============================================================================
// Module: Expression Evaluator
// Description: Parser and evaluator for HomeScript expressions.
// Purpose: Evaluate an expression string against a variable scope.
// Dependencies: crate::{token, value}
// ============================================================================

//! ## Overview
//! The evaluator is a pure function of expression and scope: no filesystem,
//! network, clock, or randomness. Expressions are parsed by recursive
//! descent into an [`Expr`] tree and walked directly. `$var.path` references
//! never fail (missing paths yield null); bare identifiers must resolve from
//! the scope, which is how trigger rule variables are referenced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::token::Token;
use crate::token::lex;
use crate::value::Scope;
use crate::value::Value;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Failure raised while lexing, parsing, or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid expression: {reason}")]
pub struct ExprError {
    /// Human-readable description of the failure.
    pub reason: String,
}

impl ExprError {
    /// Builds an error from a reason string.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Expression Tree
// ============================================================================

/// Binary operators in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Logical OR.
    Or,
    /// Logical AND.
    And,
    /// Loose equality.
    Eq,
    /// Loose inequality.
    Ne,
    /// Greater-than.
    Gt,
    /// Less-than.
    Lt,
    /// Greater-or-equal.
    Ge,
    /// Less-or-equal.
    Le,
    /// Containment.
    In,
    /// Addition or string concatenation.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
    /// Numeric negation.
    Neg,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value (number, boolean, null).
    Literal(Value),
    /// String literal; `$var` interpolation is applied at evaluation time.
    StrLit(String),
    /// Dotted `$var.path` reference.
    Var(Vec<String>),
    /// Bare identifier resolved from the scope.
    Ident(String),
    /// Array literal.
    Array(Vec<Expr>),
    /// Object literal with ordered keys.
    Object(Vec<(String, Expr)>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Math function call.
    Call(String, Vec<Expr>),
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Parses and evaluates an expression against a scope.
///
/// # Errors
///
/// Returns [`ExprError`] on malformed expressions, unknown identifiers or
/// functions, and invalid arithmetic.
pub fn evaluate(expression: &str, scope: &Scope) -> Result<Value, ExprError> {
    parse(expression)?.eval(scope)
}

/// Parses an expression into a reusable tree.
///
/// # Errors
///
/// Returns [`ExprError`] on lexical or syntactic failures.
pub fn parse(expression: &str) -> Result<Expr, ExprError> {
    let tokens = lex(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::new("trailing tokens after expression"));
    }
    Ok(expr)
}

/// Parses a comma-separated expression list, as used by `CALL` arguments.
///
/// # Errors
///
/// Returns [`ExprError`] on lexical or syntactic failures.
pub fn parse_list(source: &str) -> Result<Vec<Expr>, ExprError> {
    let tokens = lex(source)?;
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let mut items = vec![parser.parse_or()?];
    while parser.take(&Token::Comma) {
        items.push(parser.parse_or()?);
    }
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::new("trailing tokens after expression list"));
    }
    Ok(items)
}

/// Interpolates `$var` and `$path.sub` references inside a string literal.
///
/// Missing variables and nulls interpolate as the empty string. A `$` not
/// followed by an identifier is left untouched.
#[must_use]
pub fn interpolate(literal: &str, scope: &Scope) -> String {
    let chars: Vec<char> = literal.chars().collect();
    let mut out = String::with_capacity(literal.len());
    let mut pos = 0;
    while pos < chars.len() {
        if chars[pos] == '$'
            && chars
                .get(pos + 1)
                .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_')
        {
            let mut cursor = pos + 1;
            let mut segments = Vec::new();
            loop {
                let mut segment = String::new();
                while cursor < chars.len()
                    && (chars[cursor].is_ascii_alphanumeric() || chars[cursor] == '_')
                {
                    segment.push(chars[cursor]);
                    cursor += 1;
                }
                segments.push(segment);
                if cursor < chars.len()
                    && chars[cursor] == '.'
                    && chars
                        .get(cursor + 1)
                        .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_')
                {
                    cursor += 1;
                } else {
                    break;
                }
            }
            let value = scope.get_path(&segments);
            if !matches!(value, Value::Null) {
                out.push_str(&value.string_form());
            }
            pos = cursor;
        } else {
            out.push(chars[pos]);
            pos += 1;
        }
    }
    out
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser state.
struct Parser {
    /// Token stream.
    tokens: Vec<Token>,
    /// Cursor into the stream.
    pos: usize,
}

impl Parser {
    /// Peeks at the current token.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Consumes the current token when it equals `expected`.
    fn take(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the current token or fails with `context`.
    fn expect(&mut self, expected: &Token, context: &str) -> Result<(), ExprError> {
        if self.take(expected) {
            Ok(())
        } else {
            Err(ExprError::new(format!("expected {context}")))
        }
    }

    /// `or := and (OR and)*`
    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.take(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `and := not (AND not)*`
    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not()?;
        while self.take(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `not := NOT not | comparison`
    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.take(&Token::Not) {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    /// `comparison := additive ((= | != | > | < | >= | <= | IN) additive)*`
    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Ge) => BinOp::Ge,
                Some(Token::Le) => BinOp::Le,
                Some(Token::In) => BinOp::In,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    /// `additive := multiplicative ((+ | -) multiplicative)*`
    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    /// `multiplicative := unary ((* | /) unary)*`
    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    /// `unary := - unary | primary`
    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.take(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_primary()
    }

    /// Parses literals, variables, calls, grouping, arrays, and objects.
    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.peek().cloned() else {
            return Err(ExprError::new("unexpected end of expression"));
        };
        match token {
            Token::Number(value) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Number(value)))
            }
            Token::Str(value) => {
                self.pos += 1;
                Ok(Expr::StrLit(value))
            }
            Token::True => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Null => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Null))
            }
            Token::Var(path) => {
                self.pos += 1;
                Ok(Expr::Var(path))
            }
            Token::Ident(name) => {
                self.pos += 1;
                if self.take(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.take(&Token::RParen) {
                        args.push(self.parse_or()?);
                        while self.take(&Token::Comma) {
                            args.push(self.parse_or()?);
                        }
                        self.expect(&Token::RParen, "')' after arguments")?;
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "closing ')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                self.pos += 1;
                let mut items = Vec::new();
                if !self.take(&Token::RBracket) {
                    items.push(self.parse_or()?);
                    while self.take(&Token::Comma) {
                        items.push(self.parse_or()?);
                    }
                    self.expect(&Token::RBracket, "closing ']'")?;
                }
                Ok(Expr::Array(items))
            }
            Token::LBrace => {
                self.pos += 1;
                let mut entries = Vec::new();
                if !self.take(&Token::RBrace) {
                    loop {
                        let key = match self.peek().cloned() {
                            Some(Token::Str(key)) => key,
                            Some(Token::Ident(key)) => key,
                            _ => return Err(ExprError::new("expected object key")),
                        };
                        self.pos += 1;
                        self.expect(&Token::Colon, "':' after object key")?;
                        entries.push((key, self.parse_or()?));
                        if !self.take(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RBrace, "closing '}'")?;
                }
                Ok(Expr::Object(entries))
            }
            other => Err(ExprError::new(format!("unexpected token {other:?}"))),
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

impl Expr {
    /// Evaluates the expression tree against a scope.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError`] on unknown identifiers or functions and invalid
    /// arithmetic. `$var` references never fail.
    pub fn eval(&self, scope: &Scope) -> Result<Value, ExprError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::StrLit(literal) => Ok(Value::String(interpolate(literal, scope))),
            Self::Var(path) => Ok(scope.get_path(path)),
            Self::Ident(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::new(format!("Unknown identifier '{name}'"))),
            Self::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.eval(scope)?);
                }
                Ok(Value::Array(out))
            }
            Self::Object(entries) => {
                let mut out = BTreeMap::new();
                for (key, value) in entries {
                    out.insert(key.clone(), value.eval(scope)?);
                }
                Ok(Value::Object(out))
            }
            Self::Unary(op, inner) => {
                let value = inner.eval(scope)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => value
                        .as_number()
                        .map(|number| Value::Number(-number))
                        .ok_or_else(|| ExprError::new("cannot negate a non-numeric value")),
                }
            }
            Self::Binary(op, left, right) => eval_binary(*op, left, right, scope),
            Self::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.eval(scope)?);
                }
                eval_function(name, &values)
            }
        }
    }
}

/// Evaluates a binary operation with short-circuiting for AND/OR.
fn eval_binary(op: BinOp, left: &Expr, right: &Expr, scope: &Scope) -> Result<Value, ExprError> {
    match op {
        BinOp::And => {
            let lhs = left.eval(scope)?;
            if !lhs.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(right.eval(scope)?.truthy()))
        }
        BinOp::Or => {
            let lhs = left.eval(scope)?;
            if lhs.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(right.eval(scope)?.truthy()))
        }
        _ => {
            let lhs = left.eval(scope)?;
            let rhs = right.eval(scope)?;
            eval_binary_values(op, &lhs, &rhs)
        }
    }
}

/// Evaluates a non-short-circuit binary operation on values.
fn eval_binary_values(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match op {
        BinOp::Eq => Ok(Value::Bool(lhs.loose_eq(rhs))),
        BinOp::Ne => Ok(Value::Bool(!lhs.loose_eq(rhs))),
        BinOp::Gt => Ok(Value::Bool(matches!(
            lhs.loose_cmp(rhs),
            Some(std::cmp::Ordering::Greater)
        ))),
        BinOp::Lt => Ok(Value::Bool(matches!(
            lhs.loose_cmp(rhs),
            Some(std::cmp::Ordering::Less)
        ))),
        BinOp::Ge => Ok(Value::Bool(matches!(
            lhs.loose_cmp(rhs),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        ))),
        BinOp::Le => Ok(Value::Bool(matches!(
            lhs.loose_cmp(rhs),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        ))),
        BinOp::In => Ok(Value::Bool(eval_in(lhs, rhs))),
        BinOp::Add => eval_add(lhs, rhs),
        BinOp::Sub => numeric_op(lhs, rhs, "subtract", |a, b| Ok(a - b)),
        BinOp::Mul => numeric_op(lhs, rhs, "multiply", |a, b| Ok(a * b)),
        BinOp::Div => numeric_op(lhs, rhs, "divide", |a, b| {
            if b == 0.0 {
                Err(ExprError::new("Division by zero"))
            } else {
                Ok(a / b)
            }
        }),
        BinOp::And | BinOp::Or => Err(ExprError::new("logical operator in value position")),
    }
}

/// `x IN y` containment semantics.
///
/// Arrays match on any element's string form, strings on substring, objects
/// on key presence; anything else is false.
fn eval_in(needle: &Value, haystack: &Value) -> bool {
    match haystack {
        Value::Array(items) => {
            let target = needle.string_form();
            items.iter().any(|item| item.string_form() == target)
        }
        Value::String(text) => text.contains(&needle.string_form()),
        Value::Object(entries) => entries.contains_key(&needle.string_form()),
        _ => false,
    }
}

/// `+` is concatenation when either side is a string, numeric otherwise.
fn eval_add(lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
        return Ok(Value::String(format!(
            "{}{}",
            lhs.string_form(),
            rhs.string_form()
        )));
    }
    numeric_op(lhs, rhs, "add", |a, b| Ok(a + b))
}

/// Applies a numeric operator after coercing both operands.
fn numeric_op(
    lhs: &Value,
    rhs: &Value,
    verb: &str,
    op: impl Fn(f64, f64) -> Result<f64, ExprError>,
) -> Result<Value, ExprError> {
    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        return Err(ExprError::new(format!("cannot {verb} non-numeric values")));
    };
    op(a, b).map(Value::Number)
}

// ============================================================================
// SECTION: Math Functions
// ============================================================================

/// Dispatches a math function call.
fn eval_function(name: &str, args: &[Value]) -> Result<Value, ExprError> {
    let lowered = name.to_ascii_lowercase();
    match lowered.as_str() {
        "abs" => unary_math(&lowered, args, f64::abs),
        "ceil" => unary_math(&lowered, args, f64::ceil),
        "floor" => unary_math(&lowered, args, f64::floor),
        "round" => unary_math(&lowered, args, f64::round),
        "trunc" => unary_math(&lowered, args, f64::trunc),
        "sqrt" => unary_math(&lowered, args, f64::sqrt),
        "sin" => unary_math(&lowered, args, f64::sin),
        "cos" => unary_math(&lowered, args, f64::cos),
        "tan" => unary_math(&lowered, args, f64::tan),
        "asin" => unary_math(&lowered, args, f64::asin),
        "acos" => unary_math(&lowered, args, f64::acos),
        "atan" => unary_math(&lowered, args, f64::atan),
        "ln" => unary_math(&lowered, args, f64::ln),
        "log10" => unary_math(&lowered, args, f64::log10),
        "log2" => unary_math(&lowered, args, f64::log2),
        "exp" => unary_math(&lowered, args, f64::exp),
        "log" => match args.len() {
            1 => unary_math(&lowered, args, f64::ln),
            2 => binary_math(&lowered, args, f64::log),
            _ => Err(arity_error(&lowered, "1 or 2", args.len())),
        },
        "atan2" => binary_math(&lowered, args, f64::atan2),
        "pow" => binary_math(&lowered, args, f64::powf),
        "min" => fold_math(&lowered, args, f64::min),
        "max" => fold_math(&lowered, args, f64::max),
        _ => Err(ExprError::new(format!("Unknown function '{name}'"))),
    }
}

/// Builds an arity mismatch error.
fn arity_error(name: &str, expected: &str, got: usize) -> ExprError {
    ExprError::new(format!(
        "function '{name}' expects {expected} argument(s), got {got}"
    ))
}

/// Coerces a function argument to a number.
fn numeric_arg(name: &str, value: &Value) -> Result<f64, ExprError> {
    value
        .as_number()
        .ok_or_else(|| ExprError::new(format!("function '{name}' expects numeric arguments")))
}

/// Applies a one-argument math function.
fn unary_math(name: &str, args: &[Value], op: impl Fn(f64) -> f64) -> Result<Value, ExprError> {
    if args.len() != 1 {
        return Err(arity_error(name, "1", args.len()));
    }
    Ok(Value::Number(op(numeric_arg(name, &args[0])?)))
}

/// Applies a two-argument math function.
fn binary_math(
    name: &str,
    args: &[Value],
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, ExprError> {
    if args.len() != 2 {
        return Err(arity_error(name, "2", args.len()));
    }
    Ok(Value::Number(op(
        numeric_arg(name, &args[0])?,
        numeric_arg(name, &args[1])?,
    )))
}

/// Folds a variadic math function over at least one argument.
fn fold_math(name: &str, args: &[Value], op: impl Fn(f64, f64) -> f64) -> Result<Value, ExprError> {
    if args.is_empty() {
        return Err(arity_error(name, "at least 1", 0));
    }
    let mut acc = numeric_arg(name, &args[0])?;
    for arg in &args[1..] {
        acc = op(acc, numeric_arg(name, arg)?);
    }
    Ok(Value::Number(acc))
}
