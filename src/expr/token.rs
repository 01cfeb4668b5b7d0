//! Expression tokenizer

use super::error::{ExprError, Result};
use std::fmt;

/// A lexical token of the recipe expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal
    Number(f64),
    /// Variable name
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
        }
    }
}

/// Tokenize an expression string.
///
/// Identifiers follow Rust naming rules (alphanumeric plus `_`, not
/// starting with a digit). Numbers are unsigned decimal literals; unary
/// minus is handled by the parser.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(ExprError::UnexpectedChar('='));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    return Err(ExprError::UnexpectedChar('!'));
                }
            }
            '0'..='9' | '.' => {
                let mut lit = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        lit.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = lit
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedToken(lit.clone()))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_arithmetic() {
        let tokens = tokenize("1 + 2 * 3").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.0),
                Token::Plus,
                Token::Number(2.0),
                Token::Star,
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_idents_and_parens() {
        let tokens = tokenize("(num_epochs - 1) / lr_0").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Ident("num_epochs".to_string()),
                Token::Minus,
                Token::Number(1.0),
                Token::RParen,
                Token::Slash,
                Token::Ident("lr_0".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_comparisons() {
        assert_eq!(tokenize("<").unwrap(), vec![Token::Lt]);
        assert_eq!(tokenize("<=").unwrap(), vec![Token::Le]);
        assert_eq!(tokenize(">").unwrap(), vec![Token::Gt]);
        assert_eq!(tokenize(">=").unwrap(), vec![Token::Ge]);
        assert_eq!(tokenize("==").unwrap(), vec![Token::EqEq]);
        assert_eq!(tokenize("!=").unwrap(), vec![Token::NotEq]);
    }

    #[test]
    fn test_tokenize_decimal() {
        assert_eq!(tokenize("0.85").unwrap(), vec![Token::Number(0.85)]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
    }

    #[test]
    fn test_tokenize_rejects_bad_chars() {
        assert!(matches!(
            tokenize("a @ b"),
            Err(ExprError::UnexpectedChar('@'))
        ));
        assert!(matches!(tokenize("a = b"), Err(ExprError::UnexpectedChar('='))));
        assert!(matches!(tokenize("!a"), Err(ExprError::UnexpectedChar('!'))));
    }

    #[test]
    fn test_tokenize_rejects_malformed_number() {
        assert!(tokenize("1.2.3").is_err());
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::Le.to_string(), "<=");
        assert_eq!(Token::Ident("x".to_string()).to_string(), "x");
    }
}
