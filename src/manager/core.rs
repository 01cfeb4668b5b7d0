//! The recipe manager
//!
//! Owns the constructed modifiers in resolved execution order and drives
//! each through `Pending -> Active -> Finished` as the host reports
//! positions. The manager never advances time itself: `on_step` and
//! `on_epoch` are purely reactive, and a position earlier than the last
//! one seen is rejected rather than silently reordered.

use crate::host::{ModelParams, Optimizer};
use crate::manager::error::{ManagerError, Result};
use crate::manager::state::{ManagerState, ModifierState};
use crate::modifier::{Granularity, Modifier, ModifierError, Phase, Position};
use crate::recipe::{ModifierRegistry, Recipe};
use crate::resolve::execution_order;
use std::cmp::Ordering;
use std::collections::BTreeMap;

struct Entry {
    label: String,
    modifier: Box<dyn Modifier>,
    phase: Phase,
}

/// Drives a recipe's modifiers against the host training loop.
pub struct RecipeManager {
    entries: Vec<Entry>,
    variables: BTreeMap<String, crate::expr::Value>,
    last_position: Position,
}

impl RecipeManager {
    /// Construct all modifiers from a parsed recipe, resolve their
    /// execution order, and fast-forward intervals that already elapsed
    /// before `start`.
    ///
    /// A fast-forwarded modifier receives `initialize` + `finalize` with
    /// no `update`, so permanent side effects (e.g. a pruning mask) are
    /// reproduced even though its interval was skipped.
    pub fn load(
        recipe: &Recipe,
        registry: &ModifierRegistry,
        start: Position,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(recipe.num_modifiers());
        for spec in recipe.specs() {
            let modifier = registry
                .build(spec)
                .map_err(crate::recipe::RecipeError::Modifier)?;
            entries.push(Entry {
                label: spec.label.clone(),
                modifier,
                phase: Phase::Pending,
            });
        }

        let refs: Vec<(&str, &dyn Modifier)> = entries
            .iter()
            .map(|e| (e.label.as_str(), e.modifier.as_ref()))
            .collect();
        let order = execution_order(&refs)?;

        let mut slots: Vec<Option<Entry>> = entries.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        for index in order {
            if let Some(entry) = slots[index].take() {
                ordered.push(entry);
            }
        }

        let mut manager = Self {
            entries: ordered,
            variables: recipe.variables.clone(),
            last_position: start,
        };
        manager.fast_forward(start, model, optimizer)?;
        Ok(manager)
    }

    fn fast_forward(
        &mut self,
        start: Position,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
    ) -> Result<()> {
        for entry in &mut self.entries {
            if entry.phase == Phase::Pending
                && entry.modifier.interval().entirely_before(start.epoch)
            {
                run_hook(entry, "initialize", |m| {
                    m.initialize(model, optimizer, start)
                })?;
                run_hook(entry, "finalize", |m| m.finalize(model, optimizer, start))?;
                entry.phase = Phase::Finished;
            }
        }
        Ok(())
    }

    /// Step-granularity callback. Call once per optimizer step.
    pub fn on_step(
        &mut self,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        position: Position,
    ) -> Result<()> {
        self.advance_to(position)?;
        self.drive(Granularity::Step, model, optimizer, position)
    }

    /// Epoch-granularity callback. Call once per epoch boundary.
    pub fn on_epoch(
        &mut self,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        position: Position,
    ) -> Result<()> {
        self.advance_to(position)?;
        self.drive(Granularity::Epoch, model, optimizer, position)
    }

    fn advance_to(&mut self, position: Position) -> Result<()> {
        // NaN epochs compare as None and are rejected with the regression
        // error as well; time must be totally ordered.
        match position.partial_cmp(&self.last_position) {
            Some(Ordering::Greater) | Some(Ordering::Equal) => {
                self.last_position = position;
                Ok(())
            }
            _ => Err(ManagerError::PositionRegression {
                from: self.last_position,
                to: position,
            }),
        }
    }

    fn drive(
        &mut self,
        granularity: Granularity,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        position: Position,
    ) -> Result<()> {
        for entry in &mut self.entries {
            if entry.modifier.granularity() != granularity {
                continue;
            }
            advance_entry(entry, model, optimizer, position)?;
        }
        Ok(())
    }

    /// Drive every remaining modifier to `Finished`. Call at the end of
    /// training; modifiers with open-ended intervals finalize here.
    pub fn finalize_all(
        &mut self,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
        position: Position,
    ) -> Result<()> {
        self.advance_to(position)?;
        for entry in &mut self.entries {
            match entry.phase {
                Phase::Pending => {
                    run_hook(entry, "initialize", |m| {
                        m.initialize(model, optimizer, position)
                    })?;
                    run_hook(entry, "finalize", |m| {
                        m.finalize(model, optimizer, position)
                    })?;
                    entry.phase = Phase::Finished;
                }
                Phase::Active => {
                    run_hook(entry, "finalize", |m| {
                        m.finalize(model, optimizer, position)
                    })?;
                    entry.phase = Phase::Finished;
                }
                Phase::Finished => {}
            }
        }
        Ok(())
    }

    /// Snapshot the scheduling state for a checkpoint.
    pub fn state_dict(&self) -> ManagerState {
        ManagerState {
            position: self.last_position,
            variables: self.variables.clone(),
            modifiers: self
                .entries
                .iter()
                .map(|entry| ModifierState {
                    label: entry.label.clone(),
                    phase: entry.phase,
                    last_applied: entry.modifier.last_applied(),
                })
                .collect(),
        }
    }

    /// Restore scheduling state from a checkpoint.
    ///
    /// Every modifier in the checkpoint must exist in the loaded recipe
    /// and vice versa; any mismatch is a [`ManagerError::ResumeInconsistency`].
    /// Modifiers the checkpoint marks `Finished` but that are still
    /// `Pending` here receive the synthetic `initialize` + `finalize`
    /// pass; modifiers marked `Active` are re-initialized (`initialize`
    /// is idempotent by contract).
    pub fn load_state_dict(
        &mut self,
        state: &ManagerState,
        model: &mut ModelParams,
        optimizer: &mut dyn Optimizer,
    ) -> Result<()> {
        if state.modifiers.len() != self.entries.len() {
            return Err(ManagerError::ResumeInconsistency(format!(
                "checkpoint has {} modifiers, recipe has {}",
                state.modifiers.len(),
                self.entries.len()
            )));
        }
        let by_label: BTreeMap<&str, &ModifierState> = state
            .modifiers
            .iter()
            .map(|m| (m.label.as_str(), m))
            .collect();

        for entry in &mut self.entries {
            let saved = by_label.get(entry.label.as_str()).ok_or_else(|| {
                ManagerError::ResumeInconsistency(format!(
                    "modifier '{}' is missing from the checkpoint",
                    entry.label
                ))
            })?;

            match (entry.phase, saved.phase) {
                (Phase::Pending, Phase::Finished) => {
                    run_hook(entry, "initialize", |m| {
                        m.initialize(model, optimizer, state.position)
                    })?;
                    run_hook(entry, "finalize", |m| {
                        m.finalize(model, optimizer, state.position)
                    })?;
                }
                (Phase::Pending, Phase::Active) => {
                    run_hook(entry, "initialize", |m| {
                        m.initialize(model, optimizer, state.position)
                    })?;
                }
                (current, saved_phase) if current == saved_phase => {}
                (current, saved_phase) => {
                    return Err(ManagerError::ResumeInconsistency(format!(
                        "modifier '{}' is {current:?} locally but {saved_phase:?} in the checkpoint",
                        entry.label
                    )));
                }
            }
            entry.phase = saved.phase;
            entry.modifier.restore_last_applied(saved.last_applied);
        }

        self.last_position = state.position;
        Ok(())
    }

    /// Modifier labels in execution order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    /// Current phase of a modifier, by label.
    pub fn phase(&self, label: &str) -> Option<Phase> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.phase)
    }

    /// Number of managed modifiers.
    pub fn num_modifiers(&self) -> usize {
        self.entries.len()
    }

    /// Latest finite end epoch across the schedule, if any. Lets hosts
    /// size their training loop from the recipe (`epoch_range` markers
    /// extend this).
    pub fn schedule_end(&self) -> Option<f64> {
        self.entries
            .iter()
            .filter_map(|e| e.modifier.interval().end)
            .fold(None, |acc, end| Some(acc.map_or(end, |a: f64| a.max(end))))
    }

    /// The last position the host reported.
    pub fn position(&self) -> Position {
        self.last_position
    }
}

fn advance_entry(
    entry: &mut Entry,
    model: &mut ModelParams,
    optimizer: &mut dyn Optimizer,
    position: Position,
) -> Result<()> {
    let interval = entry.modifier.interval();
    match entry.phase {
        Phase::Pending => {
            if interval.applies_at(position.epoch) {
                run_hook(entry, "initialize", |m| {
                    m.initialize(model, optimizer, position)
                })?;
                entry.phase = Phase::Active;
                let progress = interval.progress_at(position.epoch);
                run_hook(entry, "update", |m| {
                    m.update(model, optimizer, position, progress)
                })?;
            } else if interval.entirely_before(position.epoch) {
                // The interval fell between two callbacks; run the full
                // synthetic pass rather than skip it.
                run_hook(entry, "initialize", |m| {
                    m.initialize(model, optimizer, position)
                })?;
                run_hook(entry, "finalize", |m| m.finalize(model, optimizer, position))?;
                entry.phase = Phase::Finished;
            }
        }
        Phase::Active => {
            if interval.applies_at(position.epoch) {
                let progress = interval.progress_at(position.epoch);
                run_hook(entry, "update", |m| {
                    m.update(model, optimizer, position, progress)
                })?;
            } else {
                run_hook(entry, "finalize", |m| m.finalize(model, optimizer, position))?;
                entry.phase = Phase::Finished;
            }
        }
        Phase::Finished => {}
    }
    Ok(())
}

fn run_hook(
    entry: &mut Entry,
    hook: &'static str,
    f: impl FnOnce(&mut dyn Modifier) -> std::result::Result<(), ModifierError>,
) -> Result<()> {
    f(entry.modifier.as_mut()).map_err(|source| ManagerError::Modifier {
        label: entry.label.clone(),
        hook,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parse_recipe;
    use approx::assert_relative_eq;

    struct StubOptimizer {
        lr: f32,
        wd: f32,
    }

    impl StubOptimizer {
        fn new() -> Self {
            Self { lr: 0.0, wd: 0.0 }
        }
    }

    impl Optimizer for StubOptimizer {
        fn lr(&self) -> f32 {
            self.lr
        }
        fn set_lr(&mut self, lr: f32) {
            self.lr = lr;
        }
        fn weight_decay(&self) -> f32 {
            self.wd
        }
        fn set_weight_decay(&mut self, wd: f32) {
            self.wd = wd;
        }
    }

    const LR_RECIPE: &str = r#"
stages:
  tune:
    - type: set_learning_rate
      start_epoch: 0.0
      end_epoch: 10.0
      init_lr: 1.0
      final_lr: 0.0
"#;

    fn load(text: &str, model: &mut ModelParams, opt: &mut StubOptimizer) -> RecipeManager {
        let recipe = parse_recipe(text, &ModifierRegistry::standard()).unwrap();
        RecipeManager::load(
            &recipe,
            &ModifierRegistry::standard(),
            Position::start(),
            model,
            opt,
        )
        .unwrap()
    }

    #[test]
    fn test_lifecycle_pending_active_finished() {
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(LR_RECIPE, &mut model, &mut opt);
        let label = "tune.set_learning_rate[0]";
        assert_eq!(manager.phase(label), Some(Phase::Pending));

        manager
            .on_step(&mut model, &mut opt, Position::new(0.0, 0))
            .unwrap();
        assert_eq!(manager.phase(label), Some(Phase::Active));
        assert_relative_eq!(opt.lr, 1.0);

        manager
            .on_step(&mut model, &mut opt, Position::new(5.0, 50))
            .unwrap();
        assert_relative_eq!(opt.lr, 0.5);

        manager
            .on_step(&mut model, &mut opt, Position::new(10.0, 100))
            .unwrap();
        assert_eq!(manager.phase(label), Some(Phase::Finished));
        assert_relative_eq!(opt.lr, 0.0);
    }

    #[test]
    fn test_interpolation_at_epoch_five_is_half() {
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(LR_RECIPE, &mut model, &mut opt);
        manager
            .on_step(&mut model, &mut opt, Position::new(5.0, 50))
            .unwrap();
        assert_relative_eq!(opt.lr, 0.5);
    }

    #[test]
    fn test_position_regression_rejected() {
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(LR_RECIPE, &mut model, &mut opt);
        manager
            .on_step(&mut model, &mut opt, Position::new(3.0, 30))
            .unwrap();
        let err = manager
            .on_step(&mut model, &mut opt, Position::new(2.0, 20))
            .unwrap_err();
        assert!(matches!(err, ManagerError::PositionRegression { .. }));

        // Equal positions are fine (e.g. on_step then on_epoch)
        manager
            .on_epoch(&mut model, &mut opt, Position::new(3.0, 30))
            .unwrap();
    }

    #[test]
    fn test_granularity_filtering() {
        // Pruning is epoch-granularity: on_step must not touch it.
        let text = r#"
stages:
  sparsify:
    - type: magnitude_pruning
      start_epoch: 0.0
      end_epoch: 10.0
      final_sparsity: 0.5
      params: [w]
"#;
        let mut model = ModelParams::new();
        model.insert("w", vec![0.1, -2.0, 0.05, 3.0]);
        let mut opt = StubOptimizer::new();
        let mut manager = load(text, &mut model, &mut opt);
        let label = "sparsify.magnitude_pruning[0]";

        manager
            .on_step(&mut model, &mut opt, Position::new(1.0, 10))
            .unwrap();
        assert_eq!(manager.phase(label), Some(Phase::Pending));
        assert_eq!(model.sparsity("w"), Some(0.0));

        manager
            .on_epoch(&mut model, &mut opt, Position::new(1.0, 10))
            .unwrap();
        assert_eq!(manager.phase(label), Some(Phase::Active));
    }

    #[test]
    fn test_fast_forward_at_load_applies_side_effects() {
        // Resuming past the pruning interval must still leave the mask.
        let text = r#"
stages:
  sparsify:
    - type: magnitude_pruning
      start_epoch: 0.0
      end_epoch: 2.0
      final_sparsity: 0.5
      params: [w]
"#;
        let recipe = parse_recipe(text, &ModifierRegistry::standard()).unwrap();
        let mut model = ModelParams::new();
        model.insert("w", vec![0.1, -2.0, 0.05, 3.0]);
        let mut opt = StubOptimizer::new();
        let manager = RecipeManager::load(
            &recipe,
            &ModifierRegistry::standard(),
            Position::new(5.0, 500),
            &mut model,
            &mut opt,
        )
        .unwrap();
        assert_eq!(
            manager.phase("sparsify.magnitude_pruning[0]"),
            Some(Phase::Finished)
        );
        assert_eq!(model.sparsity("w"), Some(0.5));
    }

    #[test]
    fn test_skipped_interval_between_callbacks() {
        // The whole interval falls between two on_step calls; the
        // modifier still gets initialize + finalize.
        let text = r#"
stages:
  tune:
    - type: set_learning_rate
      start_epoch: 2.0
      end_epoch: 3.0
      init_lr: 0.5
      final_lr: 0.25
"#;
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(text, &mut model, &mut opt);
        manager
            .on_step(&mut model, &mut opt, Position::new(1.0, 10))
            .unwrap();
        manager
            .on_step(&mut model, &mut opt, Position::new(4.0, 40))
            .unwrap();
        assert_eq!(
            manager.phase("tune.set_learning_rate[0]"),
            Some(Phase::Finished)
        );
        assert_relative_eq!(opt.lr, 0.25);
    }

    #[test]
    fn test_finalize_all_closes_open_ended() {
        let text = r#"
stages:
  tune:
    - type: set_learning_rate
      start_epoch: 0.0
      end_epoch: -1
      init_lr: 0.1
      final_lr: 0.1
"#;
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(text, &mut model, &mut opt);
        manager
            .on_step(&mut model, &mut opt, Position::new(5.0, 50))
            .unwrap();
        assert_eq!(
            manager.phase("tune.set_learning_rate[0]"),
            Some(Phase::Active)
        );
        manager
            .finalize_all(&mut model, &mut opt, Position::new(20.0, 200))
            .unwrap();
        assert_eq!(
            manager.phase("tune.set_learning_rate[0]"),
            Some(Phase::Finished)
        );
    }

    #[test]
    fn test_state_dict_roundtrip_restores_phases() {
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(LR_RECIPE, &mut model, &mut opt);
        manager
            .on_step(&mut model, &mut opt, Position::new(4.0, 40))
            .unwrap();
        let state = manager.state_dict();
        assert_eq!(state.position, Position::new(4.0, 40));

        let mut model2 = ModelParams::new();
        let mut opt2 = StubOptimizer::new();
        let mut restored = load(LR_RECIPE, &mut model2, &mut opt2);
        restored
            .load_state_dict(&state, &mut model2, &mut opt2)
            .unwrap();
        assert_eq!(
            restored.phase("tune.set_learning_rate[0]"),
            Some(Phase::Active)
        );
        assert_eq!(restored.position(), Position::new(4.0, 40));
        assert_eq!(restored.state_dict(), state);
    }

    #[test]
    fn test_resume_parity_with_fresh_run() {
        // A fresh run driven to epoch 8 and a restored run driven from
        // epoch 4 to 8 agree on the optimizer LR.
        let mut model_a = ModelParams::new();
        let mut opt_a = StubOptimizer::new();
        let mut fresh = load(LR_RECIPE, &mut model_a, &mut opt_a);
        fresh
            .on_step(&mut model_a, &mut opt_a, Position::new(4.0, 40))
            .unwrap();
        let state = fresh.state_dict();
        fresh
            .on_step(&mut model_a, &mut opt_a, Position::new(8.0, 80))
            .unwrap();

        let mut model_b = ModelParams::new();
        let mut opt_b = StubOptimizer::new();
        let mut resumed = load(LR_RECIPE, &mut model_b, &mut opt_b);
        resumed
            .load_state_dict(&state, &mut model_b, &mut opt_b)
            .unwrap();
        resumed
            .on_step(&mut model_b, &mut opt_b, Position::new(8.0, 80))
            .unwrap();

        assert_relative_eq!(opt_a.lr, opt_b.lr);
        assert_eq!(fresh.state_dict(), resumed.state_dict());
    }

    #[test]
    fn test_load_state_dict_mismatch_rejected() {
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(LR_RECIPE, &mut model, &mut opt);
        let mut state = manager.state_dict();
        state.modifiers[0].label = "other.set_learning_rate[0]".to_string();
        assert!(matches!(
            manager.load_state_dict(&state, &mut model, &mut opt),
            Err(ManagerError::ResumeInconsistency(_))
        ));

        let mut state = manager.state_dict();
        state.modifiers.clear();
        assert!(matches!(
            manager.load_state_dict(&state, &mut model, &mut opt),
            Err(ManagerError::ResumeInconsistency(_))
        ));
    }

    #[test]
    fn test_runtime_error_names_modifier_and_hook() {
        let text = r#"
stages:
  sparsify:
    - type: magnitude_pruning
      start_epoch: 0.0
      end_epoch: 2.0
      final_sparsity: 0.5
      params: [nonexistent]
"#;
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let mut manager = load(text, &mut model, &mut opt);
        let err = manager
            .on_epoch(&mut model, &mut opt, Position::new(0.0, 0))
            .unwrap_err();
        match err {
            ManagerError::Modifier { label, hook, .. } => {
                assert_eq!(label, "sparsify.magnitude_pruning[0]");
                assert_eq!(hook, "initialize");
            }
            other => panic!("expected Modifier error, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_recipe_rejected_at_load() {
        let text = r#"
stages:
  tune:
    - type: set_learning_rate
      start_epoch: 0.0
      end_epoch: 6.0
      init_lr: 0.1
      final_lr: 0.0
    - type: set_learning_rate
      start_epoch: 5.0
      end_epoch: 10.0
      init_lr: 0.1
      final_lr: 0.0
"#;
        let recipe = parse_recipe(text, &ModifierRegistry::standard()).unwrap();
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        assert!(matches!(
            RecipeManager::load(
                &recipe,
                &ModifierRegistry::standard(),
                Position::start(),
                &mut model,
                &mut opt,
            ),
            Err(ManagerError::Resolve(_))
        ));
    }

    #[test]
    fn test_schedule_end_from_epoch_range() {
        let text = r#"
stages:
  plan:
    - type: epoch_range
      start_epoch: 0.0
      end_epoch: 20.0
  tune:
    - type: set_learning_rate
      start_epoch: 0.0
      end_epoch: 10.0
      init_lr: 0.1
      final_lr: 0.0
"#;
        let mut model = ModelParams::new();
        let mut opt = StubOptimizer::new();
        let manager = load(text, &mut model, &mut opt);
        assert_eq!(manager.schedule_end(), Some(20.0));
        assert_eq!(manager.num_modifiers(), 2);
    }
}
