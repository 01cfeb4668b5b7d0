//! Quantization-aware observation modifier
//!
//! While active, observes the running min/max of the targeted parameters
//! (the data a fake-quant observer would collect). On finalize the
//! observer freezes into an affine scale, which becomes the modifier's
//! last-applied value. Ordered after pruning so the observed ranges
//! reflect masked weights.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::{ModifierError, Result};
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::recipe::ModifierSpec;

const VALID_BITS: &[u8] = &[2, 4, 8];

/// Observes targeted parameters and freezes an affine quantization scale.
#[derive(Debug, Clone)]
pub struct QuantizationModifier {
    interval: Interval,
    param_names: Vec<String>,
    bits: u8,
    observed: Option<(f32, f32)>,
    frozen_scale: Option<f64>,
}

impl QuantizationModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "quantization";

    /// Create an observer over the named parameters.
    pub fn new(interval: Interval, param_names: Vec<String>, bits: u8) -> Self {
        Self {
            interval,
            param_names,
            bits,
            observed: None,
            frozen_scale: None,
        }
    }

    /// Build from a parsed recipe spec.
    ///
    /// Required: `params` (list of parameter names). Optional: `bits`
    /// (2, 4, or 8; default 8).
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        let param_names = spec.str_list_param("params")?;
        if param_names.is_empty() {
            return Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "params".to_string(),
                reason: "at least one target parameter is required".to_string(),
            });
        }
        let bits = match spec.opt_f64_param("bits")? {
            None => 8,
            Some(raw) => {
                let bits = raw as u8;
                if f64::from(bits) != raw || !VALID_BITS.contains(&bits) {
                    return Err(ModifierError::InvalidParam {
                        tag: spec.type_tag.clone(),
                        key: "bits".to_string(),
                        reason: format!("{raw} is not one of 2, 4, 8"),
                    });
                }
                bits
            }
        };
        Ok(Self::new(spec.interval(), param_names, bits))
    }

    /// The frozen quantization scale, once finalized.
    pub fn frozen_scale(&self) -> Option<f64> {
        self.frozen_scale
    }

    fn observe(&mut self, model: &ModelParams) -> Result<()> {
        for name in &self.param_names {
            let data = model
                .get(name)
                .ok_or_else(|| ModifierError::UnknownModelParam(name.clone()))?;
            for &w in data {
                let (min, max) = self.observed.get_or_insert((w, w));
                if w < *min {
                    *min = w;
                }
                if w > *max {
                    *max = w;
                }
            }
        }
        Ok(())
    }
}

impl Modifier for QuantizationModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::Quantization
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn granularity(&self) -> Granularity {
        Granularity::Epoch
    }

    fn targets(&self) -> Vec<Target> {
        self.param_names
            .iter()
            .map(|name| Target::Param(name.clone()))
            .collect()
    }

    fn requires(&self) -> Vec<ModifierKind> {
        // Observe weights only after any pruning mask has been applied.
        vec![ModifierKind::Pruning]
    }

    fn initialize(
        &mut self,
        model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        for name in &self.param_names {
            if !model.contains(name) {
                return Err(ModifierError::UnknownModelParam(name.clone()));
            }
        }
        // Idempotent re-initialization resets the observer.
        self.observed = None;
        Ok(())
    }

    fn update(
        &mut self,
        model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
        _progress: f32,
    ) -> Result<()> {
        self.observe(model)
    }

    fn finalize(
        &mut self,
        model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        // A synthetic finalize (resume fast-forward) may arrive with no
        // prior updates; observe once so the frozen scale is defined.
        if self.observed.is_none() {
            self.observe(model)?;
        }
        let (min, max) = self.observed.unwrap_or((0.0, 0.0));
        let levels = (1u32 << self.bits) - 1;
        let scale = f64::from(max - min) / f64::from(levels);
        self.frozen_scale = Some(scale);
        Ok(())
    }

    fn last_applied(&self) -> Option<f64> {
        self.frozen_scale
    }

    fn restore_last_applied(&mut self, value: Option<f64>) {
        self.frozen_scale = value;
    }
}
