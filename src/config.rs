use clap::Args;
use std::{path::PathBuf, time::Duration};

use crate::catalog::{DEFAULT_CATALOG_URL, DEFAULT_TIMEOUT};

pub const DEFAULT_LABELS_POLICY: &str = "/etc/config/labels/labels";
pub const DEFAULT_IMMUTABLES_POLICY: &str = "/etc/config/immutables/immutables";

/// Admission engine settings, every option can also come from environment
#[derive(Args, Clone, Debug)]
pub struct EngineConfig {
	/// Deny objects missing labels required by labels policy
	#[clap(long = "enable-labels-check", env = "ADMISSION_CONTROL_LABELS")]
	pub labels_check: bool,
	/// Deny updates touching fields listed in immutables policy
	#[clap(long = "enable-immutables-check", env = "ADMISSION_CONTROL_IMMUTABLES")]
	pub immutables_check: bool,
	/// Deny workloads whose secrets/config maps are missing, when the object opts in
	#[clap(long = "enable-dependency-check", env = "ADMISSION_CONTROL_DEPENDENCIES")]
	pub dependency_check: bool,

	#[clap(long, env = "LABELS_CONFIG_PATH", default_value = DEFAULT_LABELS_POLICY)]
	pub labels_policy: PathBuf,
	#[clap(long, env = "IMMUTABLES_CONFIG_PATH", default_value = DEFAULT_IMMUTABLES_POLICY)]
	pub immutables_policy: PathBuf,

	#[clap(long, env = "CLOUD_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
	pub catalog_url: String,
	/// Keep below the API server webhook timeout
	#[clap(long = "catalog-timeout-secs", env = "CLOUD_CATALOG_TIMEOUT", default_value = "15")]
	pub catalog_timeout_secs: u64,
	/// Skip catalog certificate verification, do not use outside of testing
	#[clap(long = "catalog-insecure-skip-tls-verify", env = "CLOUD_CATALOG_INSECURE")]
	pub catalog_insecure_tls: bool,

	/// Label added by the mutating webhook when missing, as key=value
	#[clap(
		long = "inject-label",
		parse(try_from_str = parse_key_val),
		multiple_occurrences(true)
	)]
	pub inject_labels: Vec<(String, String)>,
}

impl EngineConfig {
	/// Without any check enabled the engine is never invoked
	pub fn is_enabled(&self) -> bool {
		self.labels_check || self.immutables_check || self.dependency_check
	}

	pub fn catalog_timeout(&self) -> Duration {
		Duration::from_secs(self.catalog_timeout_secs)
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			labels_check: false,
			immutables_check: false,
			dependency_check: false,
			labels_policy: DEFAULT_LABELS_POLICY.into(),
			immutables_policy: DEFAULT_IMMUTABLES_POLICY.into(),
			catalog_url: DEFAULT_CATALOG_URL.to_owned(),
			catalog_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
			catalog_insecure_tls: false,
			inject_labels: Vec::new(),
		}
	}
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
	let (key, value) = s
		.split_once('=')
		.ok_or_else(|| format!("invalid key=value: no `=` found in `{}`", s))?;
	if key.is_empty() {
		return Err(format!("invalid key=value: empty key in `{}`", s));
	}
	Ok((key.to_owned(), value.to_owned()))
}
