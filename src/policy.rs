//! Policy tables for required labels and immutable fields
//!
//! Tables are JSON arrays mounted from config maps, e.g.
//! `[{"kind": "deployment", "labels": ["team", "env"]}]`.
//! They are re-read on every lookup, nothing is cached between requests.

use log::{debug, trace};
use serde::{de::DeserializeOwned, Deserialize};
use std::{
	fs, io,
	path::PathBuf,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
	#[error("failed to read policy file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("malformed policy table: {0}")]
	Parse(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Single row of a policy table
pub trait PolicyEntry: DeserializeOwned {
	fn kind(&self) -> &str;

	fn table_from_slice(bytes: &[u8]) -> Result<Vec<Self>> {
		Ok(serde_json::from_slice(bytes)?)
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LabelPolicy {
	pub kind: String,
	#[serde(rename = "labels", default)]
	pub required_labels: Vec<String>,
}

impl PolicyEntry for LabelPolicy {
	fn kind(&self) -> &str {
		&self.kind
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ImmutablePolicy {
	pub kind: String,
	#[serde(rename = "immutables", default)]
	pub immutable_field_paths: Vec<String>,
}

impl PolicyEntry for ImmutablePolicy {
	fn kind(&self) -> &str {
		&self.kind
	}
}

/// First entry for kind, ignoring ASCII case on both sides
pub fn find_for_kind<'t, T: PolicyEntry>(table: &'t [T], kind: &str) -> Option<&'t T> {
	table.iter().find(|entry| {
		trace!(target: "policy", "look up requirement, config_kind={} request_kind={}", entry.kind(), kind);
		entry.kind().eq_ignore_ascii_case(kind)
	})
}

/// Policy file on disk
#[derive(Clone, Debug)]
pub struct PolicySource {
	path: PathBuf,
}

impl PolicySource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn load<T: PolicyEntry>(&self) -> Result<Vec<T>> {
		debug!(target: "policy", "loading policy table from {}", self.path.display());
		let bytes = fs::read(&self.path).map_err(|source| PolicyError::Read {
			path: self.path.clone(),
			source,
		})?;
		T::table_from_slice(&bytes)
	}
}
