//! Expression and variable resolution errors

use thiserror::Error;

/// Errors from expression parsing, evaluation, and variable resolution.
///
/// All of these are fatal at recipe load time; none occur mid-training.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}' in expression")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}' in expression")]
    UnexpectedToken(String),

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("cyclic variable definition involving '{0}'")]
    CyclicVariable(String),

    #[error("type error: {0}")]
    Type(String),
}

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExprError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_error_display() {
        let err = ExprError::UndefinedVariable("lr".to_string());
        assert!(format!("{err}").contains("undefined variable"));
        assert!(format!("{err}").contains("lr"));

        let err = ExprError::CyclicVariable("a".to_string());
        assert!(format!("{err}").contains("cyclic"));

        let err = ExprError::UnexpectedChar('@');
        assert!(format!("{err}").contains('@'));

        let err = ExprError::Type("cannot add bool".to_string());
        assert!(format!("{err}").contains("cannot add bool"));
    }
}
