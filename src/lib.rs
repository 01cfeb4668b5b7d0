//! Receta: recipe-driven modifier scheduling
//!
//! Declarative YAML recipes describe *what* should happen to a model over
//! the training timeline (pruning, quantization, distillation weighting,
//! learning-rate and weight-decay schedules); the [`manager::RecipeManager`]
//! decides *when* and drives it against the host loop's epoch/step
//! counters.
//!
//! ```no_run
//! use receta::host::{ModelParams, Optimizer};
//! use receta::manager::RecipeManager;
//! use receta::modifier::Position;
//! use receta::recipe::{parse_recipe, ModifierRegistry};
//!
//! # struct Sgd;
//! # impl Optimizer for Sgd {
//! #     fn lr(&self) -> f32 { 0.1 }
//! #     fn set_lr(&mut self, _lr: f32) {}
//! # }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ModifierRegistry::standard();
//! let recipe = parse_recipe(&std::fs::read_to_string("recipe.yaml")?, &registry)?;
//!
//! let mut model = ModelParams::new();
//! let mut optimizer = Sgd;
//! let mut manager = RecipeManager::load(
//!     &recipe, &registry, Position::start(), &mut model, &mut optimizer,
//! )?;
//!
//! for epoch in 0..10u64 {
//!     for step in 0..100u64 {
//!         let position = Position::new(epoch as f64 + step as f64 / 100.0, epoch * 100 + step);
//!         manager.on_step(&mut model, &mut optimizer, position)?;
//!         // host: forward, backward, optimizer.step()
//!     }
//!     manager.on_epoch(&mut model, &mut optimizer, Position::new((epoch + 1) as f64, (epoch + 1) * 100))?;
//! }
//! manager.finalize_all(&mut model, &mut optimizer, Position::new(10.0, 1000))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Toyota Way: Jidoka (Built-in Quality)
//! Malformed recipes, unknown modifier types, conflicting schedules, and
//! cyclic variables are all rejected at load, before a single weight is
//! touched. Runtime modifier failures stop the line immediately.

pub mod expr;
pub mod host;
pub mod manager;
pub mod modifier;
pub mod recipe;
pub mod resolve;

pub use manager::{ManagerError, ManagerState, RecipeManager};
pub use modifier::{Granularity, Interval, Modifier, Phase, Position, Target};
pub use recipe::{parse_recipe, parse_recipe_with_overrides, ModifierRegistry, Recipe};
