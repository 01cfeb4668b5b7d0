//! Learning-rate schedule modifier
//!
//! Interpolates the optimizer learning rate from `init_lr` to `final_lr`
//! across the active interval, linearly or along a cosine curve. With an
//! open-ended interval the initial value is held for the rest of
//! training.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::{ModifierError, Result};
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::recipe::ModifierSpec;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Interpolation curve between the initial and final learning rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrCurve {
    /// Straight-line interpolation
    Linear,
    /// Half-cosine ease-in/ease-out
    Cosine,
}

/// Schedules the optimizer learning rate over an interval.
#[derive(Debug, Clone)]
pub struct LearningRateModifier {
    interval: Interval,
    init_lr: f64,
    final_lr: f64,
    curve: LrCurve,
    last_applied: Option<f64>,
}

impl LearningRateModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "set_learning_rate";

    /// Create a linear schedule from `init_lr` to `final_lr`.
    pub fn new(interval: Interval, init_lr: f64, final_lr: f64, curve: LrCurve) -> Self {
        Self {
            interval,
            init_lr,
            final_lr,
            curve,
            last_applied: None,
        }
    }

    /// Build from a parsed recipe spec.
    ///
    /// Required: `init_lr`, `final_lr` (both > 0 is not required; 0.0 is
    /// a legal terminal LR). Optional: `curve` (`linear` | `cosine`).
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        let init_lr = spec.f64_param("init_lr")?;
        let final_lr = spec.f64_param("final_lr")?;
        if init_lr < 0.0 {
            return Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "init_lr".to_string(),
                reason: format!("{init_lr} is negative"),
            });
        }
        if final_lr < 0.0 {
            return Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "final_lr".to_string(),
                reason: format!("{final_lr} is negative"),
            });
        }
        let curve = parse_curve(spec)?;
        Ok(Self::new(spec.interval(), init_lr, final_lr, curve))
    }

    /// The learning rate for a given normalized progress value.
    pub fn lr_at(&self, progress: f32) -> f64 {
        let p = f64::from(progress.clamp(0.0, 1.0));
        let t = match self.curve {
            LrCurve::Linear => p,
            LrCurve::Cosine => (1.0 - (PI * p).cos()) / 2.0,
        };
        self.init_lr + t * (self.final_lr - self.init_lr)
    }
}

fn parse_curve(spec: &ModifierSpec) -> Result<LrCurve> {
    match spec.opt_str_param("curve")? {
        None | Some("linear") => Ok(LrCurve::Linear),
        Some("cosine") => Ok(LrCurve::Cosine),
        Some(other) => Err(ModifierError::InvalidParam {
            tag: spec.type_tag.clone(),
            key: "curve".to_string(),
            reason: format!("unknown curve '{other}' (expected linear or cosine)"),
        }),
    }
}

impl Modifier for LearningRateModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::LearningRate
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn granularity(&self) -> Granularity {
        Granularity::Step
    }

    fn targets(&self) -> Vec<Target> {
        vec![Target::LearningRate]
    }

    fn update(
        &mut self,
        _model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        _position: Position,
        progress: f32,
    ) -> Result<()> {
        let lr = self.lr_at(progress);
        optimizer.set_lr(lr as f32);
        self.last_applied = Some(lr);
        Ok(())
    }

    fn finalize(
        &mut self,
        _model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        // Leave the optimizer at the schedule's terminal value. For an
        // open-ended interval the last interpolated value already holds.
        if self.interval.end.is_some() {
            optimizer.set_lr(self.final_lr as f32);
            self.last_applied = Some(self.final_lr);
        }
        Ok(())
    }

    fn last_applied(&self) -> Option<f64> {
        self.last_applied
    }

    fn restore_last_applied(&mut self, value: Option<f64>) {
        self.last_applied = value;
    }
}
