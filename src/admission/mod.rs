//! Admission decisions
//!
//! Two independent phases run per request:
//! - mutating: only adds missing labels, never denies
//! - validating: labels, immutable fields (update only), plan changes of catalog
//!   services (update only), then dependency existence when the object opts in.
//!   First failing check denies, later checks are not evaluated.

mod mutate;
pub mod review;
mod routes;

pub use mutate::inject_labels;
pub use routes::{routes, Phase, WebhookRoute};

use fieldpath::{path, FieldpathExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};
use thiserror::Error;

use crate::{
	catalog::PlanCatalog,
	config::EngineConfig,
	dependency::{extract_dependencies, DependencyLookup},
	kubemodel::AdmissionObject,
	policy::PolicySource,
	validate::{validate_immutables, validate_labels},
};

/// Objects opt into dependency existence checks with this label set to `true`/`yes`
pub const DEPENDENCY_CHECK_LABEL: &str = "solsa.ibm.com/dependencyCheck";

/// Api group of catalog-backed services
pub const CATALOG_SERVICE_GROUP: &str = "ibmcloud.ibm.com";

#[derive(Error, Debug)]
pub enum Error {
	#[error("malformed admission review: {0}")]
	Decode(#[from] serde_json::Error),
	#[error("admission review has no request")]
	MissingRequest,
	#[error("admission request has no object")]
	MissingObject,
	#[error("unknown operation {0}")]
	UnknownOperation(String),
}
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
	Create,
	Update,
	Delete,
	Connect,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Create => write!(f, "CREATE"),
			Operation::Update => write!(f, "UPDATE"),
			Operation::Delete => write!(f, "DELETE"),
			Operation::Connect => write!(f, "CONNECT"),
		}
	}
}

impl FromStr for Operation {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_uppercase().as_str() {
			"CREATE" => Ok(Operation::Create),
			"UPDATE" => Ok(Operation::Update),
			"DELETE" => Ok(Operation::Delete),
			"CONNECT" => Ok(Operation::Connect),
			_ => Err(Error::UnknownOperation(s.to_owned())),
		}
	}
}

/// Everything the engine needs to know about one admission call
#[derive(Clone, Debug)]
pub struct AdmissionRequest {
	pub operation: Operation,
	pub kind: String,
	pub namespace: Option<String>,
	pub object: Value,
	pub old_object: Option<Value>,
}

impl AdmissionRequest {
	fn meta(&self) -> AdmissionObject {
		AdmissionObject::from_value(&self.object).unwrap_or_else(|e| {
			warn!(target: "admission", "object metadata is malformed, treating as empty: {}", e);
			AdmissionObject::default()
		})
	}

	pub fn labels(&self) -> BTreeMap<String, String> {
		self.meta().metadata.labels
	}

	/// Request namespace, falling back to object namespace
	pub fn namespace(&self) -> String {
		self.namespace
			.clone()
			.filter(|ns| !ns.is_empty())
			.or_else(|| self.meta().metadata.namespace)
			.unwrap_or_else(|| "default".to_owned())
	}
}

/// JSON patch operation, as sent back from mutating webhooks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
	pub op: String,
	pub path: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
}

/// Final answer for a request
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
	pub allowed: bool,
	pub message: String,
	pub patches: Vec<PatchOperation>,
}

impl Decision {
	pub fn allow() -> Self {
		Self {
			allowed: true,
			message: String::new(),
			patches: Vec::new(),
		}
	}

	pub fn deny(message: impl Into<String>) -> Self {
		Self {
			allowed: false,
			message: message.into(),
			patches: Vec::new(),
		}
	}

	pub fn patched(patches: Vec<PatchOperation>) -> Self {
		Self {
			patches,
			..Self::allow()
		}
	}
}

/// True when dependency-check label is `true` or `yes`, ignoring case
pub fn dependency_check_requested(labels: &BTreeMap<String, String>) -> bool {
	let requested = labels
		.get(DEPENDENCY_CHECK_LABEL)
		.map(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
		.unwrap_or(false);
	debug!(target: "admission", "dependency check requested: {}", requested);
	requested
}

/// Combines all checks into admission decisions
///
/// Holds no per-request state, one instance serves concurrent requests.
pub struct Coordinator {
	config: EngineConfig,
	labels: PolicySource,
	immutables: PolicySource,
	catalog: Option<Arc<dyn PlanCatalog>>,
	lookup: Option<Arc<dyn DependencyLookup>>,
}

impl Coordinator {
	pub fn new(config: EngineConfig) -> Self {
		Self {
			labels: PolicySource::new(&config.labels_policy),
			immutables: PolicySource::new(&config.immutables_policy),
			config,
			catalog: None,
			lookup: None,
		}
	}

	pub fn with_catalog(mut self, catalog: Arc<dyn PlanCatalog>) -> Self {
		self.catalog = Some(catalog);
		self
	}

	pub fn with_lookup(mut self, lookup: Arc<dyn DependencyLookup>) -> Self {
		self.lookup = Some(lookup);
		self
	}

	pub fn mutate(&self, request: &AdmissionRequest) -> Decision {
		if !matches!(request.operation, Operation::Create | Operation::Update) {
			return Decision::allow();
		}
		match inject_labels(&request.object, &self.config.inject_labels) {
			Ok(patches) => {
				debug!(target: "admission", "mutating {}: {} patches", request.kind, patches.len());
				Decision::patched(patches)
			}
			Err(e) => {
				warn!(target: "admission", "failed to build label patch, leaving object as-is: {}", e);
				Decision::allow()
			}
		}
	}

	pub async fn validate(&self, request: &AdmissionRequest) -> Decision {
		info!(target: "admission", "validating {} {}", request.operation, request.kind);
		if !matches!(request.operation, Operation::Create | Operation::Update) {
			return Decision::allow();
		}
		let labels = request.labels();

		if self.config.labels_check {
			let verdict = validate_labels(&self.labels, &request.kind, &labels);
			if !verdict.allowed {
				return Decision::deny(verdict.message);
			}
		}

		if request.operation == Operation::Update {
			match &request.old_object {
				Some(old) => {
					if self.config.immutables_check {
						let verdict =
							validate_immutables(&self.immutables, &request.kind, old, &request.object);
						if !verdict.allowed {
							return Decision::deny(verdict.message);
						}
					}
					if let Some(denied) = self.check_plan_change(old, &request.object).await {
						return denied;
					}
				}
				None => warn!(target: "admission", "update of {} without old object, skipping update checks", request.kind),
			}
		}

		if self.config.dependency_check {
			if let Some(denied) = self.check_dependencies(request, &labels).await {
				return denied;
			}
		}

		Decision::allow()
	}

	/// Plan changes are denied unless catalog confirms them
	async fn check_plan_change(&self, old: &Value, new: &Value) -> Option<Decision> {
		let meta = AdmissionObject::from_value(new).ok()?;
		if !meta.type_meta.is("service") || meta.type_meta.group() != CATALOG_SERVICE_GROUP {
			return None;
		}
		if old.lookup_path(path!(."spec"."plan")).ok().flatten()
			== new.lookup_path(path!(."spec"."plan")).ok().flatten()
		{
			return None;
		}
		let class = match new.get_path(path!(."spec"."serviceClass")).ok().and_then(Value::as_str) {
			Some(class) if !class.is_empty() => class,
			_ => {
				warn!(target: "admission", "plan of {} changes, but service class is unknown", meta);
				return Some(Decision::deny(
					"plan of service is not updateable: spec.serviceClass is missing",
				));
			}
		};
		let catalog = match &self.catalog {
			Some(catalog) => catalog,
			None => {
				warn!(target: "admission", "plan of {} changes, but catalog is not configured", meta);
				return Some(Decision::deny(format!(
					"plan of service {} is not updateable: catalog is not configured",
					class
				)));
			}
		};
		info!(target: "admission", "plan of {} changes, asking catalog", meta);
		match catalog.plan_updateable(class).await {
			Ok(true) => None,
			Ok(false) => Some(Decision::deny(format!("plan of service {} is not updateable", class))),
			Err(e) => Some(Decision::deny(format!(
				"plan of service {} is not updateable: {}",
				class, e
			))),
		}
	}

	async fn check_dependencies(
		&self,
		request: &AdmissionRequest,
		labels: &BTreeMap<String, String>,
	) -> Option<Decision> {
		let raw = serde_json::to_vec(&request.object).unwrap_or_default();
		let dependencies = extract_dependencies(&request.kind, &raw);
		if !dependency_check_requested(labels) {
			return None;
		}
		let lookup = match &self.lookup {
			Some(lookup) => lookup,
			None => {
				warn!(target: "admission", "dependency check requested, but cluster lookup is not configured");
				return None;
			}
		};
		let namespace = request.namespace();
		for dependent in &dependencies {
			match lookup.exists(&namespace, dependent).await {
				Ok(true) => {}
				Ok(false) => {
					return Some(Decision::deny(format!(
						"{} is required but does not exist",
						dependent
					)))
				}
				Err(e) => return Some(Decision::deny(format!("failed to verify {}: {}", dependent, e))),
			}
		}
		None
	}
}

#[cfg(test)]
mod tests;
