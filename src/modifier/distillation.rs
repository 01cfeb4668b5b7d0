//! Knowledge-distillation weighting modifier
//!
//! Exposes the blended distillation loss weight (`hardness`) and softmax
//! `temperature` the host loss computation should use while the interval
//! is active. The engine schedules *when* distillation applies; the loss
//! blending itself happens host-side.
//!
//! Distillation carries no persistent model state, so checkpoint resume
//! restores only the phase and last-applied weight.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::{ModifierError, Result};
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::recipe::ModifierSpec;

/// Schedules the distillation loss blend over an interval.
#[derive(Debug, Clone)]
pub struct DistillationModifier {
    interval: Interval,
    hardness: f64,
    temperature: f64,
    last_applied: Option<f64>,
}

impl DistillationModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "distillation";

    /// Create a distillation schedule.
    pub fn new(interval: Interval, hardness: f64, temperature: f64) -> Self {
        Self {
            interval,
            hardness,
            temperature,
            last_applied: None,
        }
    }

    /// Build from a parsed recipe spec.
    ///
    /// Optional: `hardness` in [0, 1] (default 0.5), `temperature` > 0
    /// (default 2.0).
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        let hardness = match spec.opt_f64_param("hardness")? {
            Some(_) => spec.f64_param_in("hardness", 0.0, 1.0)?,
            None => 0.5,
        };
        let temperature = spec.opt_f64_param("temperature")?.unwrap_or(2.0);
        if temperature <= 0.0 {
            return Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "temperature".to_string(),
                reason: format!("{temperature} is not positive"),
            });
        }
        Ok(Self::new(spec.interval(), hardness, temperature))
    }

    /// The loss weight the host should give the distillation term while
    /// this modifier is active.
    pub fn loss_weight(&self) -> f64 {
        self.hardness
    }

    /// The softmax temperature for teacher/student logits.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Modifier for DistillationModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::Distillation
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn granularity(&self) -> Granularity {
        Granularity::Step
    }

    fn targets(&self) -> Vec<Target> {
        vec![Target::Loss]
    }

    fn update(
        &mut self,
        _model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
        _progress: f32,
    ) -> Result<()> {
        self.last_applied = Some(self.hardness);
        Ok(())
    }

    fn finalize(
        &mut self,
        _model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        // Distillation stops contributing; weight drops to zero.
        self.last_applied = Some(0.0);
        Ok(())
    }

    fn last_applied(&self) -> Option<f64> {
        self.last_applied
    }

    fn restore_last_applied(&mut self, value: Option<f64>) {
        self.last_applied = value;
    }
}
