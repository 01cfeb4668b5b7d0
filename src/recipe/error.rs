//! Recipe parsing errors

use crate::expr::ExprError;
use crate::modifier::ModifierError;
use thiserror::Error;

/// Errors raised while loading a recipe document.
///
/// All of these are load-time failures: a recipe that produces any of
/// them constructs no modifiers at all.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// The document is not valid YAML
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document is valid YAML but not a valid recipe
    #[error("malformed recipe: {0}")]
    Malformed(String),

    /// A modifier block's type tag is not in the registry
    #[error("unknown modifier type '{tag}' in stage '{stage}'")]
    UnknownModifierType { tag: String, stage: String },

    /// Variable or formula resolution failed
    #[error("variable resolution failed: {0}")]
    Variable(#[from] ExprError),

    /// A modifier constructor rejected its parameters
    #[error(transparent)]
    Modifier(#[from] ModifierError),
}

/// Recipe-module result alias.
pub type Result<T> = std::result::Result<T, RecipeError>;
