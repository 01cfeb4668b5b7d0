//! Epoch-range structural marker
//!
//! Declares how long a stage is supposed to run without mutating
//! anything. Hosts can query the manager's schedule bounds (which this
//! marker extends) to size their training loop from the recipe alone.

use crate::modifier::error::{ModifierError, Result};
use crate::modifier::traits::{
    Granularity, Interval, Modifier, ModifierKind, Position, Target,
};
use crate::host::{ModelParams, Optimizer};
use crate::recipe::ModifierSpec;

/// No-op modifier that marks the epoch span of a stage.
#[derive(Debug, Clone)]
pub struct EpochRangeModifier {
    interval: Interval,
}

impl EpochRangeModifier {
    /// Recipe type tag.
    pub const TAG: &'static str = "epoch_range";

    /// Mark the span `[start, end)`.
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            interval: Interval::new(start, Some(end)),
        }
    }

    /// Build from a parsed recipe spec. A marker with no end marks
    /// nothing, so `end_epoch` must be finite.
    pub fn from_spec(spec: &ModifierSpec) -> Result<Self> {
        match spec.end {
            Some(end) => Ok(Self::new(spec.start, end)),
            None => Err(ModifierError::InvalidParam {
                tag: spec.type_tag.clone(),
                key: "end_epoch".to_string(),
                reason: "an epoch range must have a finite end".to_string(),
            }),
        }
    }
}

impl Modifier for EpochRangeModifier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn kind(&self) -> ModifierKind {
        ModifierKind::EpochRange
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_inert() {
        let m = EpochRangeModifier::new(0.0, 20.0);
        assert_eq!(m.interval(), Interval::new(0.0, Some(20.0)));
        assert!(m.targets().is_empty());
        assert!(m.requires().is_empty());
        assert_eq!(m.last_applied(), None);
    }

    #[test]
    fn test_from_spec_requires_finite_end() {
        let mut spec = ModifierSpec {
            label: "s.epoch_range[0]".to_string(),
            type_tag: "epoch_range".to_string(),
            stage: "s".to_string(),
            start: 0.0,
            end: None,
            params: Default::default(),
        };
        assert!(EpochRangeModifier::from_spec(&spec).is_err());

        spec.end = Some(20.0);
        let m = EpochRangeModifier::from_spec(&spec).unwrap();
        assert_eq!(m.interval().end, Some(20.0));
    }
}
