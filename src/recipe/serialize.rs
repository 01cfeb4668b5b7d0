//! Recipe re-serialization
//!
//! Regenerates a YAML document from a parsed recipe. All values are
//! emitted resolved (literals, never formulas), so reparsing the output
//! reproduces identical modifier intervals and parameters.

use crate::expr::Value;
use crate::recipe::error::Result;
use crate::recipe::spec::Recipe;
use serde_yaml::Mapping;

impl Recipe {
    /// Serialize back to a recipe document with resolved values.
    pub fn to_yaml(&self) -> Result<String> {
        let mut root = Mapping::new();
        root.insert("version".into(), "1.0".into());

        if !self.variables.is_empty() {
            let mut vars = Mapping::new();
            for (name, value) in &self.variables {
                vars.insert(name.as_str().into(), yaml_value(value));
            }
            root.insert("variables".into(), vars.into());
        }

        let mut stages = Mapping::new();
        for stage in &self.stages {
            let blocks: Vec<serde_yaml::Value> = stage
                .specs
                .iter()
                .map(|spec| {
                    let mut block = Mapping::new();
                    block.insert("type".into(), spec.type_tag.as_str().into());
                    block.insert("start_epoch".into(), spec.start.into());
                    block.insert("end_epoch".into(), spec.end.unwrap_or(-1.0).into());
                    for (key, value) in &spec.params {
                        block.insert(key.as_str().into(), yaml_value(value));
                    }
                    block.into()
                })
                .collect();
            stages.insert(stage.name.as_str().into(), blocks.into());
        }
        root.insert("stages".into(), stages.into());

        Ok(serde_yaml::to_string(&serde_yaml::Value::Mapping(root))?)
    }
}

fn yaml_value(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => (*n).into(),
        Value::Str(s) => s.as_str().into(),
        Value::List(items) => items
            .iter()
            .map(yaml_value)
            .collect::<Vec<serde_yaml::Value>>()
            .into(),
    }
}
