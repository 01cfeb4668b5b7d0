//! Manager errors

use crate::modifier::{ModifierError, Position};
use crate::recipe::RecipeError;
use crate::resolve::ResolveError;
use thiserror::Error;

/// Errors surfaced by [`RecipeManager`](crate::manager::RecipeManager).
///
/// Load-time failures (`Recipe`, `Resolve`) leave no manager behind;
/// runtime failures abort the current callback and propagate the
/// offending modifier's error unchanged.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Recipe parsing or modifier construction failed
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// Ordering or conflict resolution failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A modifier lifecycle hook failed
    #[error("modifier '{label}' failed in {hook}: {source}")]
    Modifier {
        label: String,
        hook: &'static str,
        source: ModifierError,
    },

    /// Checkpoint state does not match the loaded recipe
    #[error("resume inconsistency: {0}")]
    ResumeInconsistency(String),

    /// The host reported a position earlier than the last one seen
    #[error("position went backwards: {from} -> {to}")]
    PositionRegression { from: Position, to: Position },
}

/// Manager-module result alias.
pub type Result<T> = std::result::Result<T, ManagerError>;
