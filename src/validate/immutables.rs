use fieldpath::FieldpathExt;
use log::{debug, warn};
use serde_json::Value;

use super::Verdict;
use crate::policy::{find_for_kind, ImmutablePolicy, PolicySource};

/// Check that no field marked immutable for `kind` differs between versions
///
/// Only meaningful for updates, callers skip it on create.
pub fn validate_immutables(policy: &PolicySource, kind: &str, old: &Value, new: &Value) -> Verdict {
	let table = match policy.load::<ImmutablePolicy>() {
		Ok(table) => table,
		Err(e) => {
			warn!(target: "policy", "immutables policy unavailable, allowing: {}", e);
			return Verdict::allow_with("no immutable fields are found");
		}
	};
	check_immutables(&table, kind, old, new)
}

pub fn check_immutables(table: &[ImmutablePolicy], kind: &str, old: &Value, new: &Value) -> Verdict {
	let policy = match find_for_kind(table, kind) {
		Some(policy) => policy,
		None => return Verdict::allow_with(format!("no immutable fields are found for {}", kind)),
	};
	for raw in &policy.immutable_field_paths {
		let path = match fieldpath::parse(raw) {
			Ok(path) => path,
			Err(e) => {
				warn!(target: "policy", "skipping malformed immutable path {:?}: {}", raw, e);
				continue;
			}
		};
		let resolve = |doc: &'_ Value| match doc.lookup_path(&path) {
			Ok(found) => found.cloned(),
			Err(e) => {
				debug!(target: "policy", "{} does not fit object shape: {}", path, e);
				None
			}
		};
		if resolve(old) != resolve(new) {
			return Verdict::deny(format!("{} is immutable", raw.trim()));
		}
	}
	Verdict::allow()
}
