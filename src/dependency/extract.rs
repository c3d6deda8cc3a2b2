use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

use crate::kubemodel::Dependent;

/// Kinds with a pod template, matched ignoring case
pub const SUPPORTED_KINDS: &[&str] = &["deployment", "statefulset"];

#[derive(Error, Debug)]
pub enum ExtractError {
	#[error("failed to parse {kind}: {source}")]
	Parse {
		kind: String,
		#[source]
		source: serde_json::Error,
	},
}

// Only the parts of apps/v1 Deployment and StatefulSet which can reference
// other objects, both share `spec.template.spec`

#[derive(Debug, Default, Deserialize)]
struct Workload {
	spec: Option<WorkloadSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkloadSpec {
	template: Option<PodTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct PodTemplate {
	spec: Option<PodSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
	#[serde(default)]
	init_containers: Vec<Container>,
	#[serde(default)]
	containers: Vec<Container>,
	#[serde(default)]
	volumes: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Container {
	#[serde(default)]
	env: Vec<EnvVar>,
	#[serde(default)]
	env_from: Vec<EnvFromSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvVar {
	value_from: Option<EnvVarSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvVarSource {
	secret_key_ref: Option<NameRef>,
	config_map_key_ref: Option<NameRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvFromSource {
	secret_ref: Option<NameRef>,
	config_map_ref: Option<NameRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
	secret: Option<SecretVolume>,
	config_map: Option<NameRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretVolume {
	#[serde(default)]
	secret_name: String,
}

#[derive(Debug, Deserialize)]
struct NameRef {
	#[serde(default)]
	name: String,
}

/// Secrets and config maps referenced from env bindings and volumes
///
/// Unsupported kinds and malformed bodies have no dependencies.
pub fn extract_dependencies(kind: &str, raw: &[u8]) -> Vec<Dependent> {
	match pod_spec(kind, raw) {
		Ok(Some(spec)) => {
			let dependencies = unique(pod_dependencies(&spec));
			info!(target: "dependency", "{} dependencies: {:?}", kind, dependencies);
			dependencies
		}
		Ok(None) => {
			debug!(target: "dependency", "unsupported kind {}", kind);
			Vec::new()
		}
		Err(e) => {
			warn!(target: "dependency", "assuming no dependencies: {}", e);
			Vec::new()
		}
	}
}

fn pod_spec(kind: &str, raw: &[u8]) -> Result<Option<PodSpec>, ExtractError> {
	if !SUPPORTED_KINDS.iter().any(|k| k.eq_ignore_ascii_case(kind)) {
		return Ok(None);
	}
	let workload: Workload = serde_json::from_slice(raw).map_err(|source| ExtractError::Parse {
		kind: kind.to_owned(),
		source,
	})?;
	Ok(Some(
		workload
			.spec
			.and_then(|s| s.template)
			.and_then(|t| t.spec)
			.unwrap_or_default(),
	))
}

fn pod_dependencies(spec: &PodSpec) -> Vec<Dependent> {
	let mut out = Vec::new();
	for container in spec.init_containers.iter().chain(spec.containers.iter()) {
		for source in container.env.iter().filter_map(|e| e.value_from.as_ref()) {
			if let Some(secret) = &source.secret_key_ref {
				out.push(Dependent::secret(&secret.name));
			} else if let Some(config) = &source.config_map_key_ref {
				out.push(Dependent::config_map(&config.name));
			}
		}
		for source in &container.env_from {
			if let Some(secret) = &source.secret_ref {
				out.push(Dependent::secret(&secret.name));
			} else if let Some(config) = &source.config_map_ref {
				out.push(Dependent::config_map(&config.name));
			}
		}
	}
	for volume in &spec.volumes {
		if let Some(secret) = &volume.secret {
			out.push(Dependent::secret(&secret.secret_name));
		} else if let Some(config) = &volume.config_map {
			out.push(Dependent::config_map(&config.name));
		}
	}
	// Nameless references can not be looked up
	out.retain(|d| !d.name.is_empty());
	out
}

/// Drop repeated (kind, name) pairs, keeping first-seen order
pub fn unique(input: impl IntoIterator<Item = Dependent>) -> Vec<Dependent> {
	let mut seen = FxHashSet::default();
	input
		.into_iter()
		.filter(|d| seen.insert(d.clone()))
		.collect()
}
