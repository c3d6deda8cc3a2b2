//! Cloud catalog lookups, used to decide whether a service plan may change
//!
//! Any failure talking to the catalog means "not updateable".

mod client;

pub use client::{CatalogClient, RestResult, DEFAULT_CATALOG_URL, DEFAULT_TIMEOUT};

use futures::future::BoxFuture;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
	#[error("catalog lookup timed out after {0:?}")]
	Timeout(Duration),
	#[error("catalog transport error: {0}")]
	Transport(String),
	#[error("catalog responded with status {0}")]
	Status(u16),
	#[error("malformed catalog listing: {0}")]
	Decode(#[from] serde_json::Error),
	#[error("invalid catalog url: {0}")]
	InvalidUrl(#[from] url::ParseError),
}
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog listing, as returned by `GET <catalog>?q=<name>`
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CloudCatalog {
	#[serde(default)]
	pub count: f64,
	#[serde(default)]
	pub next: Option<String>,
	#[serde(default)]
	pub resources: Vec<CatalogResource>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CatalogResource {
	#[serde(default)]
	pub kind: String,
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub metadata: ResourceMetadata,
	#[serde(rename = "overview_ui", default)]
	pub overview: Overview,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ResourceMetadata {
	#[serde(default)]
	pub service: ServiceMetadata,
	#[serde(default)]
	pub original_name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ServiceMetadata {
	#[serde(default)]
	pub plan_updateable: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Overview {
	#[serde(default)]
	pub en: LocalizedOverview,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LocalizedOverview {
	#[serde(default)]
	pub display_name: String,
}

/// Catalog service whose plan can be switched in place
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateableService {
	pub name: String,
	pub display_name: String,
	pub id: String,
}

/// Resources of kind `service` with `metadata.service.plan_updateable` set
pub fn plan_updateable_services(resources: &[CatalogResource]) -> Vec<UpdateableService> {
	resources
		.iter()
		.filter(|resource| resource.kind == "service")
		.filter(|resource| {
			debug!(
				target: "catalog",
				"catalog service name={} id={} display_name={} plan_updateable={}",
				resource.name,
				resource.id,
				resource.overview.en.display_name,
				resource.metadata.service.plan_updateable
			);
			resource.metadata.service.plan_updateable
		})
		.map(|resource| UpdateableService {
			name: resource.name.clone(),
			display_name: resource.overview.en.display_name.clone(),
			id: resource.id.clone(),
		})
		.collect()
}

/// Source of plan updateability answers
pub trait PlanCatalog: Send + Sync {
	fn plan_updateable<'a>(&'a self, service: &'a str) -> BoxFuture<'a, Result<bool>>;
}
