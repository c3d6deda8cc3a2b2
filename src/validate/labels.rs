use log::{debug, warn};
use std::collections::BTreeMap;

use super::Verdict;
use crate::policy::{find_for_kind, LabelPolicy, PolicySource};

/// Check that every label required for `kind` is set, values are not checked
pub fn validate_labels(
	policy: &PolicySource,
	kind: &str,
	available: &BTreeMap<String, String>,
) -> Verdict {
	let table = match policy.load::<LabelPolicy>() {
		Ok(table) => table,
		Err(e) => {
			warn!(target: "policy", "labels policy unavailable, allowing: {}", e);
			return Verdict::allow_with("no required labels are found");
		}
	};
	check_labels(&table, kind, available)
}

pub fn check_labels(
	table: &[LabelPolicy],
	kind: &str,
	available: &BTreeMap<String, String>,
) -> Verdict {
	let policy = match find_for_kind(table, kind) {
		Some(policy) => policy,
		None => return Verdict::allow_with(format!("no required labels are found for {}", kind)),
	};
	debug!(
		target: "policy",
		"check required labels, required={:?} available={:?}",
		policy.required_labels,
		available.keys().collect::<Vec<_>>()
	);
	// Only the first missing label is reported
	for label in &policy.required_labels {
		if !available.contains_key(label) {
			return Verdict::deny(format!("required labels are not set: {}", label));
		}
	}
	Verdict::allow()
}
