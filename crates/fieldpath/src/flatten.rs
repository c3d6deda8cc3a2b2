use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// JSON trees are acyclic, but an attacker-supplied body can still be deep
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Flatten nested objects into a single level map keyed by dotted, lower-cased paths
///
/// Every object member is recorded, including intermediate objects, so both
/// `spec` and `spec.plan` are present for `{"spec": {"plan": ..}}`.
/// Arrays are treated as leaves.
pub fn flatten(value: &Value, max_depth: usize) -> Result<BTreeMap<String, Value>> {
    flatten_prefixed("", value, max_depth)
}

/// Same as [`flatten`], with every key prefixed by `prefix.`
pub fn flatten_prefixed(
    prefix: &str,
    value: &Value,
    max_depth: usize,
) -> Result<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    if let Value::Object(obj) = value {
        walk(&prefix.to_lowercase(), obj, 0, max_depth, &mut out)?;
    }
    Ok(out)
}

fn walk(
    prefix: &str,
    obj: &Map<String, Value>,
    depth: usize,
    max_depth: usize,
    out: &mut BTreeMap<String, Value>,
) -> Result<()> {
    if depth >= max_depth {
        return Err(Error::DepthExceeded(max_depth));
    }
    for (key, value) in obj {
        let key = if prefix.is_empty() {
            key.to_lowercase()
        } else {
            format!("{}.{}", prefix, key.to_lowercase())
        };
        if let Value::Object(inner) = value {
            walk(&key, inner, depth + 1, max_depth, out)?;
        }
        out.insert(key, value.clone());
    }
    Ok(())
}
