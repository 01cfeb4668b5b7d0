//! Recipe data model
//!
//! A parsed recipe is an ordered collection of named stages, each holding
//! typed modifier descriptors with fully-resolved parameters, plus the
//! resolved top-level variable table. Stage names are organizational
//! metadata only; execution ordering is interval- and dependency-based.

use crate::expr::Value;
use crate::modifier::{Interval, ModifierError};
use std::collections::BTreeMap;

/// A typed modifier descriptor extracted from a recipe stage.
///
/// Parameters are raw resolved [`Value`]s; type and range validation is
/// each modifier constructor's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierSpec {
    /// Stable identity: `{stage}.{type_tag}[{index-within-stage}]`
    pub label: String,
    /// Registry type tag (e.g. `magnitude_pruning`)
    pub type_tag: String,
    /// Name of the stage this spec was declared in
    pub stage: String,
    /// Inclusive start epoch
    pub start: f64,
    /// Exclusive end epoch; `None` = runs until training ends
    pub end: Option<f64>,
    /// Remaining parameters, formula-resolved
    pub params: BTreeMap<String, Value>,
}

impl ModifierSpec {
    /// The active interval declared by this spec.
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    /// Required numeric parameter.
    pub fn f64_param(&self, key: &str) -> Result<f64, ModifierError> {
        self.opt_f64_param(key)?
            .ok_or_else(|| self.missing(key))
    }

    /// Optional numeric parameter; present-but-wrong-type is an error.
    pub fn opt_f64_param(&self, key: &str) -> Result<Option<f64>, ModifierError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("expected a number, got '{v}'"))),
        }
    }

    /// Required string parameter.
    pub fn str_param(&self, key: &str) -> Result<&str, ModifierError> {
        self.opt_str_param(key)?.ok_or_else(|| self.missing(key))
    }

    /// Optional string parameter.
    pub fn opt_str_param(&self, key: &str) -> Result<Option<&str>, ModifierError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("expected a string, got '{v}'"))),
        }
    }

    /// Required list-of-strings parameter.
    pub fn str_list_param(&self, key: &str) -> Result<Vec<String>, ModifierError> {
        let v = self.params.get(key).ok_or_else(|| self.missing(key))?;
        let items = v
            .as_list()
            .ok_or_else(|| self.invalid(key, format!("expected a list, got '{v}'")))?;
        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    self.invalid(key, format!("expected string entries, got '{item}'"))
                })
            })
            .collect()
    }

    /// A numeric parameter constrained to a closed range.
    pub fn f64_param_in(&self, key: &str, lo: f64, hi: f64) -> Result<f64, ModifierError> {
        let v = self.f64_param(key)?;
        if !(lo..=hi).contains(&v) {
            return Err(self.invalid(key, format!("{v} is outside [{lo}, {hi}]")));
        }
        Ok(v)
    }

    fn missing(&self, key: &str) -> ModifierError {
        ModifierError::MissingParam {
            tag: self.type_tag.clone(),
            key: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, reason: String) -> ModifierError {
        ModifierError::InvalidParam {
            tag: self.type_tag.clone(),
            key: key.to_string(),
            reason,
        }
    }
}

/// A named, ordered group of modifier specs. Organizational only.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Stage name (e.g. `pruning_modifiers`)
    pub name: String,
    /// Specs in declaration order
    pub specs: Vec<ModifierSpec>,
}

/// A fully-parsed recipe: resolved variables + ordered stages.
///
/// Immutable after load; overrides are applied by the parser before
/// variable resolution, never afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recipe {
    /// Top-level variables, formula-free after resolution
    pub variables: BTreeMap<String, Value>,
    /// Stages in declaration order
    pub stages: Vec<Stage>,
}

impl Recipe {
    /// All modifier specs in declaration order (stage order, then
    /// within-stage order).
    pub fn specs(&self) -> impl Iterator<Item = &ModifierSpec> {
        self.stages.iter().flat_map(|stage| stage.specs.iter())
    }

    /// Total number of modifier specs.
    pub fn num_modifiers(&self) -> usize {
        self.stages.iter().map(|s| s.specs.len()).sum()
    }
}
