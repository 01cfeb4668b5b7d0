//! Schedulable training-time modifiers
//!
//! A modifier is a unit of behavior bound to an active interval of the
//! training timeline: pruning, quantization, distillation, learning-rate
//! and weight-decay schedules, plus structural markers. This module
//! defines the lifecycle contract ([`Modifier`]) and the built-in
//! variants the standard registry constructs from recipe type tags:
//!
//! - `set_learning_rate` - [`LearningRateModifier`]
//! - `set_weight_decay` - [`WeightDecayModifier`]
//! - `magnitude_pruning` - [`MagnitudePruningModifier`]
//! - `quantization` - [`QuantizationModifier`]
//! - `distillation` - [`DistillationModifier`]
//! - `epoch_range` - [`EpochRangeModifier`]
//! - `constant` - [`ConstantModifier`]

mod constant;
mod distillation;
mod epoch_range;
mod error;
mod lr;
mod pruning;
mod quantization;
mod traits;
mod weight_decay;

pub use constant::ConstantModifier;
pub use distillation::DistillationModifier;
pub use epoch_range::EpochRangeModifier;
pub use error::{ModifierError, Result};
pub use lr::{LearningRateModifier, LrCurve};
pub use pruning::{MagnitudePruningModifier, SparsityCurve};
pub use quantization::QuantizationModifier;
pub use traits::{Granularity, Interval, Modifier, ModifierKind, Phase, Position, Target};
pub use weight_decay::WeightDecayModifier;
