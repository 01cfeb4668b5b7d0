//! Recursive-descent parser and evaluator for recipe expressions
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! comparison := additive (('<'|'<='|'>'|'>='|'=='|'!=') additive)?
//! additive   := multiplicative (('+'|'-') multiplicative)*
//! multiplicative := unary (('*'|'/') unary)*
//! unary      := '-' unary | primary
//! primary    := NUMBER | IDENT | '(' comparison ')'
//! ```

use super::error::{ExprError, Result};
use super::token::{tokenize, Token};
use super::Value;
use std::collections::BTreeMap;

/// A parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Variable reference
    Var(String),
    /// Unary negation
    Neg(Box<Expr>),
    /// Binary operation
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// Binary operators of the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Expr {
    /// Collect every variable name referenced by this expression.
    pub fn variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Var(name) => out.push(name.clone()),
            Expr::Neg(inner) => inner.variables(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.variables(out);
                rhs.variables(out);
            }
        }
    }
}

/// Parse an expression string into an [`Expr`] tree.
pub fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.comparison()?;
    if let Some(tok) = parser.peek() {
        return Err(ExprError::UnexpectedToken(tok.to_string()));
    }
    Ok(expr)
}

/// Parse and evaluate an expression against a resolved variable table.
pub fn evaluate(src: &str, vars: &BTreeMap<String, Value>) -> Result<Value> {
    let expr = parse(src)?;
    eval(&expr, vars)
}

/// Evaluate a parsed expression against a resolved variable table.
///
/// Arithmetic requires numeric operands; comparisons of numbers yield
/// booleans; `==`/`!=` additionally compare strings and booleans of the
/// same type.
pub fn eval(expr: &Expr, vars: &BTreeMap<String, Value>) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UndefinedVariable(name.clone())),
        Expr::Neg(inner) => {
            let v = eval(inner, vars)?;
            let n = v
                .as_f64()
                .ok_or_else(|| ExprError::Type(format!("cannot negate '{v}'")))?;
            Ok(Value::Number(-n))
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, vars)?;
            let r = eval(rhs, vars)?;
            apply(*op, &l, &r)
        }
    }
}

fn apply(op: BinOp, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
            let (a, b) = numeric_pair(op, l, r)?;
            let n = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => {
                    if b == 0.0 {
                        return Err(ExprError::Type("division by zero".to_string()));
                    }
                    a / b
                }
                _ => unreachable!(),
            };
            Ok(Value::Number(n))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (a, b) = numeric_pair(op, l, r)?;
            let res = match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                BinOp::Ge => a >= b,
                _ => unreachable!(),
            };
            Ok(Value::Bool(res))
        }
        BinOp::Eq | BinOp::Ne => {
            let equal = match (l, r) {
                (Value::Number(a), Value::Number(b)) => a == b,
                (Value::Str(a), Value::Str(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                _ => {
                    return Err(ExprError::Type(format!(
                        "cannot compare '{l}' with '{r}'"
                    )))
                }
            };
            Ok(Value::Bool(if matches!(op, BinOp::Eq) {
                equal
            } else {
                !equal
            }))
        }
    }
}

fn numeric_pair(op: BinOp, l: &Value, r: &Value) -> Result<(f64, f64)> {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ExprError::Type(format!(
            "operator {op:?} requires numeric operands, got '{l}' and '{r}'"
        ))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::NotEq) => BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.next();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.next();
            let inner = self.unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let inner = self.comparison()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(ExprError::UnexpectedToken(tok.to_string())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(ExprError::UnexpectedToken(tok.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Evaluation is deterministic: same input, same output.
        #[test]
        fn eval_deterministic(a in -100.0f64..100.0, b in 1.0f64..100.0) {
            let mut vars = BTreeMap::new();
            vars.insert("a".to_string(), Value::Number(a));
            vars.insert("b".to_string(), Value::Number(b));
            let first = evaluate("a * b + a / b - b", &vars).unwrap();
            let second = evaluate("a * b + a / b - b", &vars).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Parenthesized literals evaluate to themselves.
        #[test]
        fn literal_identity(n in 0.0f64..1e6) {
            let vars = BTreeMap::new();
            let v = evaluate(&format!("({n})"), &vars).unwrap();
            prop_assert_eq!(v, Value::Number(n));
        }

        /// Comparison results agree with native f64 comparisons.
        #[test]
        fn comparison_matches_native(a in -1e3f64..1e3, b in -1e3f64..1e3) {
            let mut vars = BTreeMap::new();
            vars.insert("a".to_string(), Value::Number(a));
            vars.insert("b".to_string(), Value::Number(b));
            prop_assert_eq!(
                evaluate("a < b", &vars).unwrap(),
                Value::Bool(a < b)
            );
            prop_assert_eq!(
                evaluate("a >= b", &vars).unwrap(),
                Value::Bool(a >= b)
            );
        }
    }
}
