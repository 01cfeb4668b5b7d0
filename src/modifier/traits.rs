//! Core types and the lifecycle trait for schedulable modifiers
//!
//! Every modifier advances through a fixed state machine driven by the
//! manager:
//!
//! ```text
//! Pending --(position enters interval)--> Active --(position exits)--> Finished
//! ```
//!
//! No transition is ever skipped and no modifier is reactivated. A
//! modifier whose interval lies entirely behind a resume point still
//! receives `initialize` + `finalize` (without `update`) so permanent
//! side effects are not silently dropped across a checkpoint.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::ModifierError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Timeline position supplied by the host loop.
///
/// The engine never advances time itself; it is purely reactive to the
/// positions the host reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Fractional epoch (e.g. 2.5 = halfway through the third epoch)
    pub epoch: f64,
    /// Global optimizer step count
    pub step: u64,
}

impl Position {
    /// Position at a given fractional epoch and global step.
    pub fn new(epoch: f64, step: u64) -> Self {
        Self { epoch, step }
    }

    /// The origin of the training timeline.
    pub fn start() -> Self {
        Self::new(0.0, 0)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.epoch.partial_cmp(&other.epoch)? {
            Ordering::Equal => Some(self.step.cmp(&other.step)),
            ord => Some(ord),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {:.3} (step {})", self.epoch, self.step)
    }
}

/// Half-open active interval `[start, end)` in fractional epochs.
///
/// An absent end means the modifier runs until training ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive start epoch
    pub start: f64,
    /// Exclusive end epoch; `None` = open-ended
    pub end: Option<f64>,
}

impl Interval {
    /// Interval `[start, end)`.
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Open-ended interval starting at `start`.
    pub fn open(start: f64) -> Self {
        Self { start, end: None }
    }

    /// True iff `start <= epoch < end` (open end = no upper bound).
    pub fn applies_at(&self, epoch: f64) -> bool {
        epoch >= self.start && self.end.is_none_or(|end| epoch < end)
    }

    /// True iff the whole interval lies strictly before `epoch`.
    pub fn entirely_before(&self, epoch: f64) -> bool {
        self.end.is_some_and(|end| end <= epoch)
    }

    /// True iff this interval ends at or before the other begins.
    pub fn precedes(&self, other: &Interval) -> bool {
        self.end.is_some_and(|end| end <= other.start)
    }

    /// True iff the two intervals share at least one position.
    pub fn overlaps(&self, other: &Interval) -> bool {
        !self.precedes(other) && !other.precedes(self)
    }

    /// Normalized progress through the interval, clamped to `[0, 1]`.
    ///
    /// Open-ended intervals report 0.0: with no end there is nothing to
    /// interpolate toward, so interpolating modifiers hold their initial
    /// value.
    pub fn progress_at(&self, epoch: f64) -> f32 {
        match self.end {
            None => 0.0,
            Some(end) if end <= self.start => 1.0,
            Some(end) => ((epoch - self.start) / (end - self.start)).clamp(0.0, 1.0) as f32,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}

/// Lifecycle phase of a scheduled modifier. Transitions are monotone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Interval not yet entered
    Pending,
    /// Interval entered, `initialize` has run
    Active,
    /// Interval exited, `finalize` has run
    Finished,
}

/// What a modifier mutates; used for conflict detection and ordering.
///
/// Two modifiers with intersecting target sets must not be active over
/// overlapping intervals. `Param` targets compare by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The optimizer learning rate
    LearningRate,
    /// The optimizer weight decay coefficient
    WeightDecay,
    /// A named model parameter tensor
    Param(String),
    /// The training loss composition
    Loss,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::LearningRate => write!(f, "learning_rate"),
            Target::WeightDecay => write!(f, "weight_decay"),
            Target::Param(name) => write!(f, "param:{name}"),
            Target::Loss => write!(f, "loss"),
        }
    }
}

/// Scheduling granularity a modifier opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Updated from `on_step`
    Step,
    /// Updated from `on_epoch`
    Epoch,
}

/// Coarse modifier category, used for implicit ordering dependencies
/// (e.g. quantization observes weights only after pruning has masked
/// them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Pruning,
    Quantization,
    Distillation,
    LearningRate,
    WeightDecay,
    EpochRange,
    Constant,
}

/// The unit of schedulable behavior.
///
/// Implementations declare *when* they run (interval, granularity) and
/// *what* they touch (targets, kind); the manager decides ordering and
/// drives the lifecycle. `initialize` must be idempotent: the engine may
/// re-run it when fast-forwarding past an already-elapsed interval after
/// a checkpoint resume.
pub trait Modifier: Send {
    /// The recipe type tag this modifier was constructed from
    fn type_tag(&self) -> &'static str;

    /// Coarse category for implicit dependencies
    fn kind(&self) -> ModifierKind;

    /// Active interval in fractional epochs
    fn interval(&self) -> Interval;

    /// Whether updates fire per step or per epoch boundary
    fn granularity(&self) -> Granularity;

    /// Everything this modifier mutates
    fn targets(&self) -> Vec<Target>;

    /// Kinds this modifier must be ordered after
    fn requires(&self) -> Vec<ModifierKind> {
        Vec::new()
    }

    /// Called exactly once when the position first enters the interval
    fn initialize(
        &mut self,
        _model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<(), ModifierError> {
        Ok(())
    }

    /// Called once per granularity unit while the interval applies.
    ///
    /// `progress` is the normalized `[0, 1]` fraction of the interval
    /// elapsed (0.0 for open-ended intervals).
    fn update(
        &mut self,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        position: Position,
        progress: f32,
    ) -> Result<(), ModifierError>;

    /// Called exactly once when the position first exits the interval
    fn finalize(
        &mut self,
        _model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<(), ModifierError> {
        Ok(())
    }

    /// Last value this modifier applied, for checkpointing
    fn last_applied(&self) -> Option<f64> {
        None
    }

    /// Restore the last-applied value from a checkpoint
    fn restore_last_applied(&mut self, _value: Option<f64>) {}
}
