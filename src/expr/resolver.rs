//! Recipe variable resolution
//!
//! Variables are resolved once per recipe load. A variable may be a plain
//! literal or an `eval(...)` formula referencing other variables,
//! transitively. Resolution order is keyed on sorted names so the result
//! is deterministic regardless of how the input mapping was built.

use super::error::{ExprError, Result};
use super::parser::{eval, parse};
use super::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Resolve a raw variable table into a fully-literal one.
///
/// Formulas are substituted transitively. A reference to an unknown name
/// fails with [`ExprError::UndefinedVariable`]; a reference cycle fails
/// with [`ExprError::CyclicVariable`].
pub fn resolve_variables(raw: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>> {
    let mut resolved = BTreeMap::new();
    // BTreeMap iteration is already sorted by key, giving deterministic
    // resolution and deterministic cycle reporting.
    for name in raw.keys() {
        let mut visiting = BTreeSet::new();
        resolve_one(name, raw, &mut resolved, &mut visiting)?;
    }
    Ok(resolved)
}

fn resolve_one(
    name: &str,
    raw: &BTreeMap<String, Value>,
    resolved: &mut BTreeMap<String, Value>,
    visiting: &mut BTreeSet<String>,
) -> Result<Value> {
    if let Some(v) = resolved.get(name) {
        return Ok(v.clone());
    }
    if !visiting.insert(name.to_string()) {
        return Err(ExprError::CyclicVariable(name.to_string()));
    }

    let value = raw
        .get(name)
        .ok_or_else(|| ExprError::UndefinedVariable(name.to_string()))?;

    let literal = match value.formula_body() {
        Some(body) => {
            let expr = parse(body)?;
            let mut deps = Vec::new();
            expr.variables(&mut deps);
            let mut scope = BTreeMap::new();
            for dep in deps {
                let dep_value = resolve_one(&dep, raw, resolved, visiting)?;
                scope.insert(dep, dep_value);
            }
            eval(&expr, &scope)?
        }
        None => value.clone(),
    };

    visiting.remove(name);
    resolved.insert(name.to_string(), literal.clone());
    Ok(literal)
}

/// Resolve a single value against an already-resolved variable table.
///
/// Formula strings are evaluated; lists are resolved element-wise; plain
/// literals pass through unchanged. Used by the recipe parser to
/// substitute formulas inside modifier parameters.
pub fn resolve_value(vars: &BTreeMap<String, Value>, value: &Value) -> Result<Value> {
    if let Some(body) = value.formula_body() {
        let expr = parse(body)?;
        return eval(&expr, vars);
    }
    if let Value::List(items) = value {
        let resolved = items
            .iter()
            .map(|item| resolve_value(vars, item))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::List(resolved));
    }
    Ok(value.clone())
}
