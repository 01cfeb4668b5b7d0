//! Recipe document model, parser, registry, and serializer
//!
//! A recipe is a declarative YAML description of what should happen to a
//! model over the training timeline: top-level variables (with
//! `eval(...)` formulas), and named stages holding typed modifier blocks.
//! Parsing resolves every formula and produces a [`Recipe`] of
//! [`ModifierSpec`]s; the [`ModifierRegistry`] turns specs into live
//! modifiers; [`Recipe::to_yaml`] regenerates a resolved document.

mod error;
mod parser;
mod registry;
mod serialize;
mod spec;

pub use error::{RecipeError, Result};
pub use parser::{parse_recipe, parse_recipe_with_overrides};
pub use registry::{Constructor, ModifierRegistry};
pub use spec::{ModifierSpec, Recipe, Stage};
