use serde_json::{json, Value};

use super::PatchOperation;

/// Patches adding every label from `labels` the object does not carry yet
///
/// Patch paths come from diffing the object against its mutated copy, so
/// label keys containing `/` or `~` are escaped per RFC 6901.
pub fn inject_labels(object: &Value, labels: &[(String, String)]) -> serde_json::Result<Vec<PatchOperation>> {
	if labels.is_empty() {
		return Ok(Vec::new());
	}
	let mut target = object.clone();
	if let Some(metadata) = target.get_mut("metadata").and_then(Value::as_object_mut) {
		let existing = metadata.entry("labels").or_insert_with(|| json!({}));
		if existing.is_null() {
			*existing = json!({});
		}
		if let Some(existing) = existing.as_object_mut() {
			for (key, value) in labels {
				if !existing.contains_key(key) {
					existing.insert(key.clone(), Value::String(value.clone()));
				}
			}
		}
	}
	let patch = json_patch::diff(object, &target);
	serde_json::from_value(serde_json::to_value(&patch)?)
}
