//! Inert placeholder modifier
//!
//! Occupies a slot in a recipe without touching the model or optimizer.
//! Useful for keeping a recipe's stage structure (and serialized form)
//! stable while a real modifier is disabled.

use crate::host::{ModelParams, Optimizer};
use crate::modifier::error::Result;
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::recipe::ModifierSpec;

/// No-op modifier with an empty target set.
#[derive(Debug, Clone)]
pub struct ConstantModifier {
    interval: Interval,
}

impl ConstantModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "constant";

    pub fn new(interval: Interval) -> Self {
        Self { interval }
    }

    /// Build from a parsed recipe spec. Takes no parameters.
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        Ok(Self::new(spec.interval()))
    }
}

impl Modifier for ConstantModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::Constant
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn granularity(&self) -> Granularity {
        Granularity::Epoch
    }

    fn targets(&self) -> Vec<Target> {
        Vec::new()
    }

    fn update(
        &mut self,
        _model: &mut ModelParams,
        _optimizer: &mut dyn Optimizer,
        _position: Position,
        _progress: f32,
    ) -> Result<()> {
        Ok(())
    }
}
