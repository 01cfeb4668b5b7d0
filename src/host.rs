//! Host training-loop integration surface
//!
//! The scheduling engine never owns the model or the optimizer; the host
//! loop lends them to each callback. This module defines the two borrowed
//! views the engine works against:
//! - [`Optimizer`] - the hyperparameters modifiers may schedule
//! - [`ModelParams`] - a named, ordered view of model parameter tensors
//!
//! Gradient computation, data loading, and the step loop itself stay on
//! the host side.

use std::collections::BTreeMap;

/// Hyperparameter surface of the host optimizer.
///
/// Modifiers schedule the learning rate and weight decay through this
/// trait; everything else about the optimizer is opaque to the engine.
pub trait Optimizer: Send {
    /// Get the current learning rate
    fn lr(&self) -> f32;

    /// Set the learning rate
    fn set_lr(&mut self, lr: f32);

    /// Get the current weight decay coefficient
    fn weight_decay(&self) -> f32 {
        0.0
    }

    /// Set the weight decay coefficient
    fn set_weight_decay(&mut self, _wd: f32) {}
}

/// Named model parameters, borrowed by the engine for each callback.
///
/// Parameters are kept in a sorted map so every traversal the engine
/// performs (masking, observation, serialization) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelParams {
    params: BTreeMap<String, Vec<f32>>,
}

impl ModelParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a named parameter tensor.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<f32>) {
        self.params.insert(name.into(), data);
    }

    /// Immutable view of a parameter.
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.params.get(name).map(Vec::as_slice)
    }

    /// Mutable view of a parameter.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut [f32]> {
        self.params.get_mut(name).map(Vec::as_mut_slice)
    }

    /// Whether a parameter with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Fraction of exactly-zero entries in a parameter, if it exists.
    pub fn sparsity(&self, name: &str) -> Option<f32> {
        let data = self.params.get(name)?;
        if data.is_empty() {
            return Some(0.0);
        }
        let zeros = data.iter().filter(|w| **w == 0.0).count();
        Some(zeros as f32 / data.len() as f32)
    }
}
