//! Manager checkpoint state
//!
//! A plain serde value capturing everything the engine needs to resume:
//! the last position the host reported, the resolved variable table, and
//! per-modifier phase plus last-applied value. Model weights and
//! optimizer state are the host's checkpoint, not ours.

use crate::expr::Value;
use crate::modifier::{Phase, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-modifier slice of the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierState {
    /// Stable label (`{stage}.{type_tag}[{index}]`)
    pub label: String,
    /// Lifecycle phase at checkpoint time
    pub phase: Phase,
    /// Last value the modifier applied, if any
    pub last_applied: Option<f64>,
}

/// Serializable manager snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerState {
    /// Last position the host reported
    pub position: Position,
    /// Resolved recipe variables, for provenance
    pub variables: BTreeMap<String, Value>,
    /// Modifier states in execution order
    pub modifiers: Vec<ModifierState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_yaml_roundtrip() {
        let state = ManagerState {
            position: Position::new(2.5, 250),
            variables: [("num_epochs".to_string(), Value::Number(10.0))]
                .into_iter()
                .collect(),
            modifiers: vec![ModifierState {
                label: "warmup.set_learning_rate[0]".to_string(),
                phase: Phase::Active,
                last_applied: Some(0.05),
            }],
        };
        let yaml = serde_yaml::to_string(&state).unwrap();
        let back: ManagerState = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_state_json_roundtrip() {
        let state = ManagerState {
            position: Position::new(0.0, 0),
            variables: BTreeMap::new(),
            modifiers: vec![ModifierState {
                label: "s.constant[0]".to_string(),
                phase: Phase::Pending,
                last_applied: None,
            }],
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: ManagerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
