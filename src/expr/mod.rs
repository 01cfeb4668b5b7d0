//! Recipe expression language
//!
//! Recipes may define numeric parameters as small arithmetic formulas over
//! named variables, written as `eval(<expr>)`:
//!
//! ```yaml
//! variables:
//!   num_epochs: 10
//!   pruning_end: eval(num_epochs * 0.8)
//! ```
//!
//! The grammar is deliberately tiny and auditable: numbers, variable
//! names, unary minus, `+ - * /`, parentheses, and comparisons
//! (`< <= > >= == !=`). There is no general `eval`.
//!
//! # Toyota Way: Poka-yoke (Mistake-Proofing)
//! Undefined and cyclic variable references are caught at recipe load,
//! never mid-training.

mod error;
mod parser;
mod resolver;
mod token;

pub use error::{ExprError, Result};
pub use parser::{evaluate, parse, Expr};
pub use resolver::{resolve_value, resolve_variables};
pub use token::{tokenize, Token};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A recipe-level scalar (or list) value.
///
/// Values come from YAML literals, variable resolution, or expression
/// evaluation. Lists appear only in modifier parameters (e.g. the target
/// parameter names of a pruning modifier), never as expression operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean literal
    Bool(bool),
    /// Numeric literal (all recipe numbers are f64)
    Number(f64),
    /// String literal, possibly an `eval(...)` formula
    Str(String),
    /// List of values
    List(Vec<Value>),
}

impl Value {
    /// Numeric view of this value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of this value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of this value, if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List view of this value, if it is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// True if this value is an `eval(...)` formula string.
    pub fn is_formula(&self) -> bool {
        self.formula_body().is_some()
    }

    /// The expression inside `eval(...)`, if this is a formula string.
    pub fn formula_body(&self) -> Option<&str> {
        let s = self.as_str()?;
        let s = s.trim();
        let body = s.strip_prefix("eval(")?.strip_suffix(')')?;
        Some(body)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
