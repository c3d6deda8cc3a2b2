use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
	collections::BTreeMap,
	fmt::{self, Display},
};

pub const SECRET_KIND: &str = "Secret";
pub const CONFIG_MAP_KIND: &str = "ConfigMap";

/// Named reference to another object in cluster, which should exist before
/// the referencing workload is admitted
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependent {
	pub kind: String,
	pub name: String,
}

impl Dependent {
	pub fn secret(name: impl Into<String>) -> Self {
		Self {
			kind: SECRET_KIND.to_owned(),
			name: name.into(),
		}
	}
	pub fn config_map(name: impl Into<String>) -> Self {
		Self {
			kind: CONFIG_MAP_KIND.to_owned(),
			name: name.into(),
		}
	}
}

impl Display for Dependent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.kind, self.name)
	}
}

/// Identifies object type in cluster
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectKind {
	// ibmcloud.ibm.com/v1alpha1
	#[serde(rename = "apiVersion", default)]
	pub api_version: String,
	// Service
	#[serde(default)]
	pub kind: String,
}

impl ObjectKind {
	/// Api group without version, empty for core objects
	pub fn group(&self) -> &str {
		match self.api_version.find('/') {
			Some(index) => &self.api_version[0..index],
			None => "",
		}
	}

	/// Kinds are compared ignoring ASCII case everywhere in the engine
	pub fn is(&self, kind: &str) -> bool {
		self.kind.eq_ignore_ascii_case(kind)
	}
}

impl Display for ObjectKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.api_version, self.kind)
	}
}

/// Object metadata subset used for admission decisions
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectLocation {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub labels: BTreeMap<String, String>,
}

/// `"labels": null` is what some clients send for an empty map
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Display for ObjectLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name)?;
		if let Some(ns) = &self.namespace {
			write!(f, " in {}", ns)?;
		}
		Ok(())
	}
}

/// Minimal parsed shape of any object passing through admission
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AdmissionObject {
	#[serde(flatten)]
	pub type_meta: ObjectKind,
	#[serde(default)]
	pub metadata: ObjectLocation,
}

impl AdmissionObject {
	pub fn from_value(value: &Value) -> serde_json::Result<Self> {
		Self::deserialize(value)
	}
}

impl Display for AdmissionObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.type_meta, self.metadata)
	}
}
