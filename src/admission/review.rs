//! `admission.k8s.io/v1` AdmissionReview wire format

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AdmissionRequest, Coordinator, Decision, Error, Operation, Phase, Result, WebhookRoute};

pub const API_VERSION: &str = "admission.k8s.io/v1";
pub const KIND: &str = "AdmissionReview";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
	pub api_version: String,
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request: Option<ReviewRequest>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response: Option<ReviewResponse>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupVersionKind {
	#[serde(default)]
	pub group: String,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub kind: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupVersionResource {
	#[serde(default)]
	pub group: String,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub resource: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
	pub uid: String,
	pub kind: GroupVersionKind,
	pub resource: GroupVersionResource,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub namespace: Option<String>,
	pub operation: String,
	#[serde(default)]
	pub object: Option<Value>,
	#[serde(default)]
	pub old_object: Option<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReviewStatus {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<u16>,
	#[serde(default)]
	pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
	pub uid: String,
	pub allowed: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<ReviewStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub patch_type: Option<String>,
	/// Base64 of JSON patch
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub patch: Option<String>,
}

impl AdmissionReview {
	pub fn from_slice(bytes: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(bytes)?)
	}

	pub fn respond(uid: &str, decision: Decision) -> Result<Self> {
		let patch = if decision.patches.is_empty() {
			None
		} else {
			Some(STANDARD.encode(serde_json::to_vec(&decision.patches)?))
		};
		let status = if decision.allowed {
			None
		} else {
			Some(ReviewStatus {
				code: Some(403),
				message: decision.message,
			})
		};
		Ok(Self {
			api_version: API_VERSION.to_owned(),
			kind: KIND.to_owned(),
			request: None,
			response: Some(ReviewResponse {
				uid: uid.to_owned(),
				allowed: decision.allowed,
				status,
				patch_type: patch.as_ref().map(|_| "JSONPatch".to_owned()),
				patch,
			}),
		})
	}

	fn uid(&self) -> Result<&str> {
		self.request
			.as_ref()
			.map(|r| r.uid.as_str())
			.ok_or(Error::MissingRequest)
	}
}

/// Answer allowed without evaluating anything
pub fn allow_all(review: &AdmissionReview) -> Result<AdmissionReview> {
	AdmissionReview::respond(review.uid()?, Decision::allow())
}

/// Run one phase for a review, requests not matching any route for
/// this phase are allowed untouched
pub async fn handle(
	coordinator: &Coordinator,
	routes: &[WebhookRoute],
	phase: Phase,
	review: AdmissionReview,
) -> Result<AdmissionReview> {
	let request = review.request.ok_or(Error::MissingRequest)?;
	let operation: Operation = request.operation.parse()?;
	let resource = &request.resource;

	let routed = routes.iter().any(|route| {
		route.phase == phase
			&& route.matches(&resource.group, &resource.version, &resource.resource, operation)
	});
	if !routed {
		debug!(
			target: "admission",
			"no {:?} route for {}/{} {} {}, allowing",
			phase, resource.group, resource.version, resource.resource, operation
		);
		return AdmissionReview::respond(&request.uid, Decision::allow());
	}

	let admission = AdmissionRequest {
		operation,
		kind: request.kind.kind.clone(),
		namespace: request.namespace.clone(),
		object: request.object.clone().ok_or(Error::MissingObject)?,
		old_object: request.old_object.clone(),
	};
	let decision = match phase {
		Phase::Mutate => coordinator.mutate(&admission),
		Phase::Validate => coordinator.validate(&admission).await,
	};
	info!(
		target: "admission",
		"{} {} {} in {}: allowed={} {}",
		operation,
		request.kind.kind,
		request.name.as_deref().unwrap_or_default(),
		admission.namespace(),
		decision.allowed,
		decision.message
	);
	AdmissionReview::respond(&request.uid, decision)
}
