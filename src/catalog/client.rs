use futures::future::{BoxFuture, FutureExt};
use log::{error, info, warn};
use std::time::Duration;
use url::Url;

use super::{plan_updateable_services, CatalogError, CloudCatalog, PlanCatalog, Result};

pub const DEFAULT_CATALOG_URL: &str = "https://globalcatalog.cloud.ibm.com/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of a single catalog call
///
/// Transport failures have `status_code == 0` and `error_type` set to
/// `timeout` or `transport`, with error text in `body`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestResult {
	pub status_code: u16,
	pub body: String,
	pub error_type: String,
}

impl RestResult {
	fn failed(e: &reqwest::Error) -> Self {
		Self {
			status_code: 0,
			body: e.to_string(),
			error_type: if e.is_timeout() { "timeout" } else { "transport" }.to_owned(),
		}
	}
}

pub struct CatalogClient {
	base: Url,
	timeout: Duration,
	http: reqwest::Client,
}

impl CatalogClient {
	pub fn new(base_url: &str, timeout: Duration, insecure_tls: bool) -> Result<Self> {
		let base = Url::parse(base_url)?;
		if insecure_tls {
			warn!(target: "catalog", "TLS certificate verification is disabled for {}", base);
		}
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.danger_accept_invalid_certs(insecure_tls)
			.build()
			.map_err(|e| CatalogError::Transport(e.to_string()))?;
		Ok(Self {
			base,
			timeout,
			http,
		})
	}

	/// `<base>?q=<service>`
	pub fn query_url(&self, service: &str) -> Url {
		let mut url = self.base.clone();
		url.query_pairs_mut().append_pair("q", service);
		url
	}

	pub async fn rest_get(&self, url: &Url) -> RestResult {
		let response = self
			.http
			.get(url.clone())
			.header("Content-Type", "application/json")
			.send()
			.await;
		let response = match response {
			Ok(response) => response,
			Err(e) => return RestResult::failed(&e),
		};
		let status_code = response.status().as_u16();
		match response.text().await {
			Ok(body) => RestResult {
				status_code,
				body,
				error_type: String::new(),
			},
			Err(e) => RestResult::failed(&e),
		}
	}

	pub async fn check_plan(&self, service: &str) -> Result<bool> {
		let url = self.query_url(service);
		info!(target: "catalog", "calling cloud catalog {}", url);

		let result = self.rest_get(&url).await;
		match result.error_type.as_str() {
			"" => {}
			"timeout" => return Err(CatalogError::Timeout(self.timeout)),
			_ => return Err(CatalogError::Transport(result.body)),
		}
		if result.status_code != 200 {
			return Err(CatalogError::Status(result.status_code));
		}

		let catalog: CloudCatalog = serde_json::from_str(&result.body)?;
		Ok(!plan_updateable_services(&catalog.resources).is_empty())
	}

	/// True only if catalog positively confirms the plan can change
	pub async fn is_plan_updateable(&self, service: &str) -> bool {
		match self.check_plan(service).await {
			Ok(updateable) => updateable,
			Err(e) => {
				error!(target: "catalog", "call to cloud catalog failed for {}: {}", service, e);
				false
			}
		}
	}
}

impl PlanCatalog for CatalogClient {
	fn plan_updateable<'a>(&'a self, service: &'a str) -> BoxFuture<'a, Result<bool>> {
		self.check_plan(service).boxed()
	}
}
