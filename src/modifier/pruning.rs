//! Magnitude pruning modifier
//!
//! Interpolates a sparsity target from `init_sparsity` to
//! `final_sparsity` over the active interval and applies a magnitude
//! mask to the targeted parameters at each epoch update. The cubic
//! curve (Zhu & Gupta, 2017) prunes faster early and eases toward the
//! target, giving the model time to adapt.
//!
//! `finalize` re-applies the final mask, so a checkpoint resume that
//! fast-forwards past the interval still leaves the pruned weights
//! permanently zeroed.
//!
//! # References
//! - Zhu, M., & Gupta, S. (2017). To prune, or not to prune: exploring
//!   the efficacy of pruning for model compression. arXiv:1710.01878.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::{ModifierError, Result};
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::recipe::ModifierSpec;
use serde::{Deserialize, Serialize};

/// Sparsity interpolation curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparsityCurve {
    /// Linear interpolation between initial and final sparsity
    Linear,
    /// Cubic schedule: `s = s_i + (s_f - s_i) * (1 - (1 - p)^3)`
    Cubic,
}

/// Prunes the smallest-magnitude weights of the targeted parameters.
#[derive(Debug, Clone)]
pub struct MagnitudePruningModifier {
    interval: Interval,
    init_sparsity: f64,
    final_sparsity: f64,
    curve: SparsityCurve,
    param_names: Vec<String>,
    last_applied: Option<f64>,
}

impl MagnitudePruningModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "magnitude_pruning";

    /// Create a pruning modifier over the named parameters.
    pub fn new(
        interval: Interval,
        init_sparsity: f64,
        final_sparsity: f64,
        curve: SparsityCurve,
        param_names: Vec<String>,
    ) -> Self {
        Self {
            interval,
            init_sparsity,
            final_sparsity,
            curve,
            param_names,
            last_applied: None,
        }
    }

    /// Build from a parsed recipe spec.
    ///
    /// Required: `final_sparsity` in [0, 1], `params` (list of parameter
    /// names). Optional: `init_sparsity` (default 0.0), `curve`
    /// (`linear` | `cubic`, default cubic).
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        let final_sparsity = spec.f64_param_in("final_sparsity", 0.0, 1.0)?;
        let init_sparsity = match spec.opt_f64_param("init_sparsity")? {
            Some(_) => spec.f64_param_in("init_sparsity", 0.0, 1.0)?,
            None => 0.0,
        };
        if init_sparsity > final_sparsity {
            return Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "init_sparsity".to_string(),
                reason: format!(
                    "{init_sparsity} exceeds final_sparsity {final_sparsity}"
                ),
            });
        }
        let curve = match spec.opt_str_param("curve")? {
            None | Some("cubic") => SparsityCurve::Cubic,
            Some("linear") => SparsityCurve::Linear,
            Some(other) => {
                return Err(ModifierError::InvalidParam {
                    tag: spec.type_tag.clone(),
                    key: "curve".to_string(),
                    reason: format!("unknown curve '{other}' (expected linear or cubic)"),
                })
            }
        };
        let param_names = spec.str_list_param("params")?;
        if param_names.is_empty() {
            return Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "params".to_string(),
                reason: "at least one target parameter is required".to_string(),
            });
        }
        Ok(Self::new(
            spec.interval(),
            init_sparsity,
            final_sparsity,
            curve,
            param_names,
        ))
    }

    /// The sparsity target at a normalized progress value.
    pub fn sparsity_at(&self, progress: f32) -> f64 {
        let p = f64::from(progress.clamp(0.0, 1.0));
        let t = match self.curve {
            SparsityCurve::Linear => p,
            SparsityCurve::Cubic => 1.0 - (1.0 - p).powi(3),
        };
        self.init_sparsity + t * (self.final_sparsity - self.init_sparsity)
    }

    fn apply_sparsity(&mut self, model: &mut ModelParams, sparsity: f64) -> Result<()> {
        for name in &self.param_names {
            let data = model
                .get_mut(name)
                .ok_or_else(|| ModifierError::UnknownModelParam(name.clone()))?;
            mask_smallest(data, sparsity);
        }
        self.last_applied = Some(sparsity);
        Ok(())
    }
}

/// Zero the smallest-magnitude `floor(sparsity * len)` entries.
///
/// Ties break on index so the mask is deterministic for equal
/// magnitudes.
fn mask_smallest(data: &mut [f32], sparsity: f64) {
    let count = (sparsity.clamp(0.0, 1.0) * data.len() as f64).floor() as usize;
    if count == 0 {
        return;
    }
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| {
        data[a]
            .abs()
            .partial_cmp(&data[b].abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    for &idx in order.iter().take(count) {
        data[idx] = 0.0;
    }
}

impl Modifier for MagnitudePruningModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::Pruning
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

    fn initialize(
        &mut self,
        model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        // Surface missing targets at activation, before any masking.
        for name in &self.param_names {
            if !model.contains(name) {
                return Err(ModifierError::UnknownModelParam(name.clone()));
            }
        }
        Ok(())
    }

    fn update(
        &mut self,
        model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
        progress: f32,
    ) -> Result<()> {
        let sparsity = self.sparsity_at(progress);
        self.apply_sparsity(model, sparsity)
    }

    fn finalize(
        &mut self,
        model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
    ) -> Result<()> {
        // Permanently zero at the final target. Also runs during resume
        // fast-forward, which is what makes skipped intervals safe.
        let final_sparsity = self.final_sparsity;
        self.apply_sparsity(model, final_sparsity)
    }

    fn last_applied(&self) -> Option<f64> {
        self.last_applied
    }

    fn restore_last_applied(&mut self, value: Option<f64>) {
        self.last_applied = value;
    }
}
