//! YAML recipe parser
//!
//! Walks the document as a raw [`serde_yaml::Value`] so stage and block
//! declaration order survives into the parsed [`Recipe`]. Overrides are
//! applied to the raw variable table before resolution; formulas inside
//! modifier parameters (including `start_epoch`/`end_epoch`) are resolved
//! against the resolved variables at parse time.
//!
//! Any error here aborts the load with no modifiers constructed.

use crate::expr::{resolve_value, resolve_variables, Value};
use crate::recipe::error::{RecipeError, Result};
use crate::recipe::registry::ModifierRegistry;
use crate::recipe::spec::{ModifierSpec, Recipe, Stage};
use std::collections::BTreeMap;

const SUPPORTED_VERSION: &str = "1.0";

/// Parse a recipe document, validating type tags against the registry.
pub fn parse_recipe(text: &str, registry: &ModifierRegistry) -> Result<Recipe> {
    parse_recipe_with_overrides(text, registry, &BTreeMap::new())
}

/// Parse a recipe document with top-level variable overrides.
///
/// Overrides replace same-named variables before formula resolution, so a
/// formula like `eval(num_epochs * 0.8)` sees the overridden value.
/// Override names that match no variable are warned about and ignored.
pub fn parse_recipe_with_overrides(
    text: &str,
    registry: &ModifierRegistry,
    overrides: &BTreeMap<String, Value>,
) -> Result<Recipe> {
    let doc: serde_yaml::Value = serde_yaml::from_str(text)?;
    let root = doc
        .as_mapping()
        .ok_or_else(|| malformed("recipe document must be a mapping"))?;

    if let Some(version) = root.get("version") {
        let version = version
            .as_str()
            .ok_or_else(|| malformed("'version' must be a string"))?;
        if version != SUPPORTED_VERSION {
            return Err(malformed(format!(
                "unsupported recipe version '{version}' (expected '{SUPPORTED_VERSION}')"
            )));
        }
    }

    let mut raw_vars = match root.get("variables") {
        None => BTreeMap::new(),
        Some(vars) => {
            let mapping = vars
                .as_mapping()
                .ok_or_else(|| malformed("'variables' must be a mapping"))?;
            let mut raw = BTreeMap::new();
            for (key, value) in mapping {
                let name = key
                    .as_str()
                    .ok_or_else(|| malformed("variable names must be strings"))?;
                raw.insert(name.to_string(), scalar_value(value)?);
            }
            raw
        }
    };

    for (name, value) in overrides {
        if raw_vars.insert(name.clone(), value.clone()).is_none() {
            eprintln!("warning: override '{name}' matches no recipe variable; ignoring");
            raw_vars.remove(name);
        }
    }

    let variables = resolve_variables(&raw_vars)?;

    let stages_node = root
        .get("stages")
        .ok_or_else(|| malformed("recipe has no 'stages' mapping"))?;
    let stages_map = stages_node
        .as_mapping()
        .ok_or_else(|| malformed("'stages' must be a mapping"))?;

    let mut stages = Vec::with_capacity(stages_map.len());
    for (key, blocks) in stages_map {
        let stage_name = key
            .as_str()
            .ok_or_else(|| malformed("stage names must be strings"))?;
        let blocks = blocks.as_sequence().ok_or_else(|| {
            malformed(format!("stage '{stage_name}' must be a sequence of modifier blocks"))
        })?;

        let mut specs = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            specs.push(parse_block(stage_name, index, block, registry, &variables)?);
        }
        stages.push(Stage {
            name: stage_name.to_string(),
            specs,
        });
    }

    Ok(Recipe { variables, stages })
}

fn parse_block(
    stage: &str,
    index: usize,
    block: &serde_yaml::Value,
    registry: &ModifierRegistry,
    variables: &BTreeMap<String, Value>,
) -> Result<ModifierSpec> {
    let mapping = block.as_mapping().ok_or_else(|| {
        malformed(format!("stage '{stage}' block {index} must be a mapping"))
    })?;

    let type_tag = mapping
        .get("type")
        .and_then(serde_yaml::Value::as_str)
        .ok_or_else(|| {
            malformed(format!("stage '{stage}' block {index} has no 'type' tag"))
        })?
        .to_string();
    if !registry.contains(&type_tag) {
        return Err(RecipeError::UnknownModifierType {
            tag: type_tag,
            stage: stage.to_string(),
        });
    }

    let mut start = 0.0f64;
    let mut end: Option<f64> = None;
    let mut params = BTreeMap::new();

    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| malformed("modifier block keys must be strings"))?;
        if key == "type" {
            continue;
        }
        let resolved = resolve_value(variables, &scalar_value(value)?)?;
        match key {
            "start_epoch" => {
                start = epoch_number(stage, &type_tag, key, &resolved)?;
            }
            "end_epoch" => {
                let raw = epoch_number(stage, &type_tag, key, &resolved)?;
                // -1 is the conventional "runs until training ends"
                end = if raw < 0.0 { None } else { Some(raw) };
            }
            _ => {
                params.insert(key.to_string(), resolved);
            }
        }
    }

    if start < 0.0 {
        return Err(malformed(format!(
            "'{type_tag}' in stage '{stage}': start_epoch {start} is negative"
        )));
    }
    if let Some(end) = end {
        if start > end {
            return Err(malformed(format!(
                "'{type_tag}' in stage '{stage}': start_epoch {start} > end_epoch {end}"
            )));
        }
    }

    Ok(ModifierSpec {
        label: format!("{stage}.{type_tag}[{index}]"),
        type_tag,
        stage: stage.to_string(),
        start,
        end,
        params,
    })
}

fn epoch_number(stage: &str, tag: &str, key: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        malformed(format!(
            "'{tag}' in stage '{stage}': {key} must be a number, got '{value}'"
        ))
    })
}

/// Translate a YAML scalar/sequence into a recipe [`Value`].
fn scalar_value(value: &serde_yaml::Value) -> Result<Value> {
    match value {
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| malformed(format!("unrepresentable number '{n}'"))),
        serde_yaml::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(scalar_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(malformed(format!(
            "expected a scalar or list, got {}",
            yaml_kind(other)
        ))),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a bool",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

fn malformed(message: impl Into<String>) -> RecipeError {
    RecipeError::Malformed(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
version: "1.0"
variables:
  num_epochs: 10
  warmup_end: eval(num_epochs * 0.2)
stages:
  warmup:
    - type: set_learning_rate
      start_epoch: 0.0
      end_epoch: eval(warmup_end)
      init_lr: 0.01
      final_lr: 0.1
  pruning:
    - type: magnitude_pruning
      start_epoch: eval(warmup_end)
      end_epoch: eval(num_epochs * 0.8)
      init_sparsity: 0.0
      final_sparsity: 0.9
      params:
        - layer1.weight
        - layer2.weight
"#;

    #[test]
    fn test_parse_basic_recipe() {
        let recipe = parse_recipe(BASIC, &ModifierRegistry::standard()).unwrap();
        assert_eq!(recipe.num_modifiers(), 2);
        assert_eq!(recipe.stages[0].name, "warmup");
        assert_eq!(recipe.stages[1].name, "pruning");

        let lr = &recipe.stages[0].specs[0];
        assert_eq!(lr.label, "warmup.set_learning_rate[0]");
        assert_eq!(lr.start, 0.0);
        assert_eq!(lr.end, Some(2.0));

        let prune = &recipe.stages[1].specs[0];
        assert_eq!(prune.start, 2.0);
        assert_eq!(prune.end, Some(8.0));
        assert_eq!(
            prune.str_list_param("params").unwrap(),
            vec!["layer1.weight".to_string(), "layer2.weight".to_string()]
        );
    }

    #[test]
    fn test_overrides_flow_through_formulas() {
        let overrides = [("num_epochs".to_string(), Value::Number(20.0))]
            .into_iter()
            .collect();
        let recipe = parse_recipe_with_overrides(
            BASIC,
            &ModifierRegistry::standard(),
            &overrides,
        )
        .unwrap();
        assert_eq!(recipe.variables["num_epochs"], Value::Number(20.0));
        assert_eq!(recipe.stages[0].specs[0].end, Some(4.0));
        assert_eq!(recipe.stages[1].specs[0].end, Some(16.0));
    }

    #[test]
    fn test_unknown_override_ignored() {
        let overrides = [("not_a_variable".to_string(), Value::Number(1.0))]
            .into_iter()
            .collect();
        let recipe = parse_recipe_with_overrides(
            BASIC,
            &ModifierRegistry::standard(),
            &overrides,
        )
        .unwrap();
        assert!(!recipe.variables.contains_key("not_a_variable"));
        assert_eq!(recipe.stages[0].specs[0].end, Some(2.0));
    }

    #[test]
    fn test_unknown_type_tag_fails() {
        let text = r#"
stages:
  main:
    - type: levitation
      start_epoch: 0.0
"#;
        let err = parse_recipe(text, &ModifierRegistry::standard()).unwrap_err();
        match err {
            RecipeError::UnknownModifierType { tag, stage } => {
                assert_eq!(tag, "levitation");
                assert_eq!(stage, "main");
            }
            other => panic!("expected UnknownModifierType, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_end_epoch_means_open() {
        let text = r#"
stages:
  main:
    - type: set_learning_rate
      start_epoch: 1.0
      end_epoch: -1
      init_lr: 0.1
      final_lr: 0.1
"#;
        let recipe = parse_recipe(text, &ModifierRegistry::standard()).unwrap();
        assert_eq!(recipe.stages[0].specs[0].end, None);
    }

    #[test]
    fn test_start_after_end_rejected() {
        let text = r#"
stages:
  main:
    - type: constant
      start_epoch: 5.0
      end_epoch: 3.0
"#;
        assert!(matches!(
            parse_recipe(text, &ModifierRegistry::standard()),
            Err(RecipeError::Malformed(_))
        ));
    }

    #[test]
    fn test_negative_start_rejected() {
        let text = r#"
stages:
  main:
    - type: constant
      start_epoch: -2.0
"#;
        assert!(matches!(
            parse_recipe(text, &ModifierRegistry::standard()),
            Err(RecipeError::Malformed(_))
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let text = r#"
version: "2.0"
stages: {}
"#;
        assert!(matches!(
            parse_recipe(text, &ModifierRegistry::standard()),
            Err(RecipeError::Malformed(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(matches!(
            parse_recipe(": not: [valid", &ModifierRegistry::standard()),
            Err(RecipeError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_stages_rejected() {
        assert!(matches!(
            parse_recipe("variables:\n  a: 1\n", &ModifierRegistry::standard()),
            Err(RecipeError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_type_tag_rejected() {
        let text = r#"
stages:
  main:
    - start_epoch: 0.0
"#;
        assert!(matches!(
            parse_recipe(text, &ModifierRegistry::standard()),
            Err(RecipeError::Malformed(_))
        ));
    }

    #[test]
    fn test_cyclic_variables_rejected() {
        let text = r#"
variables:
  a: eval(b)
  b: eval(a)
stages: {}
"#;
        assert!(matches!(
            parse_recipe(text, &ModifierRegistry::standard()),
            Err(RecipeError::Variable(_))
        ));
    }

    #[test]
    fn test_defaults_start_zero_end_open() {
        let text = r#"
stages:
  main:
    - type: constant
"#;
        let recipe = parse_recipe(text, &ModifierRegistry::standard()).unwrap();
        let spec = &recipe.stages[0].specs[0];
        assert_eq!(spec.start, 0.0);
        assert_eq!(spec.end, None);
    }
}
