//! Recipe scheduling manager
//!
//! The [`RecipeManager`] is the bridge between a parsed recipe and the
//! host training loop: it constructs modifiers through a registry,
//! resolves their execution order, and reacts to the host's `on_step` /
//! `on_epoch` callbacks by driving each modifier's lifecycle. Checkpoint
//! support is a serde state dict plus synthetic fast-forward for
//! intervals that elapsed while the engine was not running.

mod core;
mod error;
mod state;

pub use self::core::RecipeManager;
pub use error::{ManagerError, Result};
pub use state::{ManagerState, ModifierState};
