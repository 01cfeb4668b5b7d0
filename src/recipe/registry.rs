//! Modifier constructor registry
//!
//! Maps recipe type tags to constructor functions. The registry is an
//! explicit value passed into parsing and loading, never global mutable
//! state, so hosts can extend or restrict the available modifier set per
//! call site.

use crate::modifier::{
    ConstantModifier, DistillationModifier, EpochRangeModifier, LearningRateModifier,
    MagnitudePruningModifier, Modifier, ModifierError, QuantizationModifier,
    WeightDecayModifier,
};
use crate::recipe::spec::ModifierSpec;
use std::collections::BTreeMap;

/// Constructor signature: build a boxed modifier from a resolved spec.
pub type Constructor = fn(&ModifierSpec) -> Result<Box<dyn Modifier>, ModifierError>;

/// Explicit type-tag -> constructor table.
#[derive(Default, Clone)]
pub struct ModifierRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl ModifierRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in modifier set.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(LearningRateModifier::TAG, |spec| {
            Ok(Box::new(LearningRateModifier::from_spec(spec)?))
        });
        registry.register(WeightDecayModifier::TAG, |spec| {
            Ok(Box::new(WeightDecayModifier::from_spec(spec)?))
        });
        registry.register(MagnitudePruningModifier::TAG, |spec| {
            Ok(Box::new(MagnitudePruningModifier::from_spec(spec)?))
        });
        registry.register(QuantizationModifier::TAG, |spec| {
            Ok(Box::new(QuantizationModifier::from_spec(spec)?))
        });
        registry.register(DistillationModifier::TAG, |spec| {
            Ok(Box::new(DistillationModifier::from_spec(spec)?))
        });
        registry.register(EpochRangeModifier::TAG, |spec| {
            Ok(Box::new(EpochRangeModifier::from_spec(spec)?))
        });
        registry.register(ConstantModifier::TAG, |spec| {
            Ok(Box::new(ConstantModifier::from_spec(spec)?))
        });
        registry
    }

    /// Register (or replace) a constructor for a type tag.
    pub fn register(&mut self, tag: &str, constructor: Constructor) {
        self.constructors.insert(tag.to_string(), constructor);
    }

    /// Whether a type tag is known.
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Construct a modifier for a spec.
    pub fn build(&self, spec: &ModifierSpec) -> Result<Box<dyn Modifier>, ModifierError> {
        let constructor =
            self.constructors
                .get(&spec.type_tag)
                .ok_or_else(|| ModifierError::Runtime(format!(
                    "no constructor registered for '{}'",
                    spec.type_tag
                )))?;
        constructor(spec)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifierRegistry")
            .field("tags", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;

    #[test]
    fn test_standard_registry_tags() {
        let registry = ModifierRegistry::standard();
        for tag in [
            "set_learning_rate",
            "set_weight_decay",
            "magnitude_pruning",
            "quantization",
            "distillation",
            "epoch_range",
            "constant",
        ] {
            assert!(registry.contains(tag), "missing tag {tag}");
        }
        assert!(!registry.contains("made_up"));
    }

    #[test]
    fn test_build_dispatches_by_tag() {
        let registry = ModifierRegistry::standard();
        let spec = ModifierSpec {
            label: "s.set_learning_rate[0]".to_string(),
            type_tag: "set_learning_rate".to_string(),
            stage: "s".to_string(),
            start: 0.0,
            end: Some(10.0),
            params: [
                ("init_lr".to_string(), Value::Number(0.1)),
                ("final_lr".to_string(), Value::Number(0.0)),
            ]
            .into_iter()
            .collect(),
        };
        let modifier = registry.build(&spec).unwrap();
        assert_eq!(modifier.type_tag(), "set_learning_rate");
    }

    #[test]
    fn test_build_unknown_tag_fails() {
        let registry = ModifierRegistry::new();
        let spec = ModifierSpec {
            label: "s.mystery[0]".to_string(),
            type_tag: "mystery".to_string(),
            stage: "s".to_string(),
            start: 0.0,
            end: None,
            params: BTreeMap::new(),
        };
        assert!(registry.build(&spec).is_err());
    }

    #[test]
    fn test_register_custom_constructor() {
        let mut registry = ModifierRegistry::new();
        registry.register("constant", |spec| {
            Ok(Box::new(ConstantModifier::from_spec(spec)?))
        });
        assert!(registry.contains("constant"));
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["constant"]);
    }
}
