use serde::Serialize;

use super::Operation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	Mutate,
	Validate,
}

/// Which requests are sent to which phase
#[derive(Clone, Debug, Serialize)]
pub struct WebhookRoute {
	pub name: &'static str,
	pub path: &'static str,
	pub phase: Phase,
	pub operations: Vec<Operation>,
	pub api_groups: Vec<&'static str>,
	pub api_versions: Vec<&'static str>,
	pub resources: Vec<&'static str>,
}

impl WebhookRoute {
	pub fn matches(&self, group: &str, version: &str, resource: &str, operation: Operation) -> bool {
		self.operations.contains(&operation)
			&& self.api_groups.contains(&group)
			&& self.api_versions.contains(&version)
			&& self.resources.contains(&resource)
	}
}

/// Routes in registration order
pub fn routes() -> Vec<WebhookRoute> {
	let create_update = vec![Operation::Create, Operation::Update];
	vec![
		WebhookRoute {
			name: "ibmcloud-operators.admission.mutate",
			path: "/mutate",
			phase: Phase::Mutate,
			operations: create_update.clone(),
			api_groups: vec!["apps"],
			api_versions: vec!["v1"],
			resources: vec!["deployments"],
		},
		WebhookRoute {
			name: "ibmcloud-operators.admission.validate",
			path: "/validate",
			phase: Phase::Validate,
			operations: create_update.clone(),
			api_groups: vec!["ibmcloud.ibm.com"],
			api_versions: vec!["v1alpha1"],
			resources: vec!["services", "bindings", "esindices", "topics"],
		},
		WebhookRoute {
			name: "ibmcloud-operators.admission.validate-workloads",
			path: "/validate",
			phase: Phase::Validate,
			operations: create_update,
			api_groups: vec!["apps"],
			api_versions: vec!["v1"],
			resources: vec!["deployments", "statefulsets"],
		},
	]
}
