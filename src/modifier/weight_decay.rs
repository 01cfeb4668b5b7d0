//! Weight-decay schedule modifier
//!
//! Interpolates the optimizer weight-decay coefficient from `init_wd` to
//! `final_wd` across the active interval. The curve is always linear;
//! weight decay schedules rarely warrant anything fancier.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::{ModifierError, Result};
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::recipe::ModifierSpec;

/// Schedules the optimizer weight-decay coefficient over an interval.
#[derive(Debug, Clone)]
pub struct WeightDecayModifier {
    interval: Interval,
    init_wd: f64,
    final_wd: f64,
    last_applied: Option<f64>,
}

impl WeightDecayModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "set_weight_decay";

    /// Create a linear weight-decay schedule.
    pub fn new(interval: Interval, init_wd: f64, final_wd: f64) -> Self {
        Self {
            interval,
            init_wd,
            final_wd,
            last_applied: None,
        }
    }

    /// Build from a parsed recipe spec. Required: `init_wd`, `final_wd`.
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        let init_wd = spec.f64_param("init_wd")?;
        let final_wd = spec.f64_param("final_wd")?;
        for (key, v) in [("init_wd", init_wd), ("final_wd", final_wd)] {
            if v < 0.0 {
                return Err(ModifierError::InvalidParam {
                    tag: spec.type_tag.clone(),
                    key: key.to_string(),
                    reason: format!("{v} is negative"),
                });
            }
        }
        Ok(Self::new(spec.interval(), init_wd, final_wd))
    }

    fn wd_at(&self, progress: f32) -> f64 {
        let p = f64::from(progress.clamp(0.0, 1.0));
        self.init_wd + p * (self.final_wd - self.init_wd)
    }
}

impl Modifier for WeightDecayModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::WeightDecay
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn granularity(&self) -> Granularity {
        Granularity::Step
    }

    fn targets(&self) -> Vec<Target> {
        vec![Target::WeightDecay]
    }

    fn update(
        &mut self,
        _model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        _position: Position,
        progress: f32,
    ) -> Result<()> {
        let wd = self.wd_at(progress);
        optimizer.set_weight_decay(wd as f32);
        self.last_applied = Some(wd);
        Ok(())
    }

    fn finalize(
        &mut self,
        _model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        if self.interval.end.is_some() {
            optimizer.set_weight_decay(self.final_wd as f32);
            self.last_applied = Some(self.final_wd);
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
