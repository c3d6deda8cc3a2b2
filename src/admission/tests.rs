use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::{
	io::Write,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};
use tempfile::NamedTempFile;

use super::*;
use crate::{
	catalog::{self, CatalogError},
	dependency::LookupError,
	kubemodel::Dependent,
};

struct StubCatalog {
	updateable: Option<bool>,
	calls: AtomicUsize,
}

impl StubCatalog {
	fn new(updateable: Option<bool>) -> Arc<Self> {
		Arc::new(Self {
			updateable,
			calls: AtomicUsize::new(0),
		})
	}
}

impl PlanCatalog for StubCatalog {
	fn plan_updateable<'a>(&'a self, _service: &'a str) -> BoxFuture<'a, catalog::Result<bool>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let answer = self.updateable.ok_or(CatalogError::Status(503));
		async move { answer }.boxed()
	}
}

/// Knows about a fixed set of objects, `broken` fails every lookup
struct StubLookup {
	existing: Vec<Dependent>,
	broken: bool,
}

impl DependencyLookup for StubLookup {
	fn exists<'a>(
		&'a self,
		_namespace: &'a str,
		dependent: &'a Dependent,
	) -> BoxFuture<'a, std::result::Result<bool, LookupError>> {
		let answer = if self.broken {
			Err(LookupError::UnsupportedKind(dependent.kind.clone()))
		} else {
			Ok(self.existing.contains(dependent))
		};
		async move { answer }.boxed()
	}
}

struct Fixture {
	_labels: NamedTempFile,
	_immutables: NamedTempFile,
	config: EngineConfig,
}

fn policy_file(content: &str) -> NamedTempFile {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(content.as_bytes()).unwrap();
	file
}

fn fixture() -> Fixture {
	let labels = policy_file(
		r#"[
			{"kind": "deployment", "labels": ["team"]},
			{"kind": "service", "labels": ["team"]}
		]"#,
	);
	let immutables = policy_file(r#"[{"kind": "service", "immutables": ["spec.serviceClass"]}]"#);
	let config = EngineConfig {
		labels_check: true,
		immutables_check: true,
		dependency_check: true,
		labels_policy: labels.path().to_owned(),
		immutables_policy: immutables.path().to_owned(),
		inject_labels: vec![("owner".to_owned(), "seed".to_owned())],
		..EngineConfig::default()
	};
	Fixture {
		_labels: labels,
		_immutables: immutables,
		config,
	}
}

fn deployment(labels: Value) -> Value {
	json!({
		"apiVersion": "apps/v1",
		"kind": "Deployment",
		"metadata": {"name": "web", "namespace": "prod", "labels": labels},
		"spec": {"template": {"spec": {
			"containers": [{
				"name": "web",
				"env": [{"name": "PASS", "valueFrom": {"secretKeyRef": {"name": "creds", "key": "pw"}}}],
				"envFrom": [{"configMapRef": {"name": "settings"}}],
			}],
		}}},
	})
}

fn service(class: &str, plan: &str) -> Value {
	json!({
		"apiVersion": "ibmcloud.ibm.com/v1alpha1",
		"kind": "Service",
		"metadata": {"name": "mydb", "namespace": "prod", "labels": {"team": "storage"}},
		"spec": {"serviceClass": class, "plan": plan},
	})
}

fn create(kind: &str, object: Value) -> AdmissionRequest {
	AdmissionRequest {
		operation: Operation::Create,
		kind: kind.to_owned(),
		namespace: Some("prod".to_owned()),
		object,
		old_object: None,
	}
}

fn update(kind: &str, old: Value, object: Value) -> AdmissionRequest {
	AdmissionRequest {
		operation: Operation::Update,
		old_object: Some(old),
		..create(kind, object)
	}
}

fn both_exist() -> Arc<StubLookup> {
	Arc::new(StubLookup {
		existing: vec![Dependent::secret("creds"), Dependent::config_map("settings")],
		broken: false,
	})
}

#[tokio::test]
async fn labelled_deployment_without_gate_is_allowed() {
	let f = fixture();
	let coordinator = Coordinator::new(f.config.clone()).with_lookup(Arc::new(StubLookup {
		existing: vec![],
		broken: false,
	}));
	let decision = coordinator
		.validate(&create("Deployment", deployment(json!({"team": "web"}))))
		.await;
	assert_eq!(decision, Decision::allow());
}

#[tokio::test]
async fn missing_label_denies_first() {
	let f = fixture();
	let coordinator = Coordinator::new(f.config.clone());
	let decision = coordinator
		.validate(&create(
			"Deployment",
			deployment(json!({DEPENDENCY_CHECK_LABEL: "true"})),
		))
		.await;
	assert!(!decision.allowed);
	assert_eq!(decision.message, "required labels are not set: team");
}

#[tokio::test]
async fn labels_check_disabled() {
	let f = fixture();
	let config = EngineConfig {
		labels_check: false,
		..f.config.clone()
	};
	let decision = Coordinator::new(config)
		.validate(&create("Deployment", deployment(json!({}))))
		.await;
	assert!(decision.allowed);
}

#[tokio::test]
async fn immutable_change_denied_despite_labels() {
	let f = fixture();
	let catalog = StubCatalog::new(Some(true));
	let coordinator = Coordinator::new(f.config.clone()).with_catalog(catalog.clone());
	let decision = coordinator
		.validate(&update(
			"Service",
			service("cloudantnosqldb", "lite"),
			service("compose-for-redis", "lite"),
		))
		.await;
	assert!(!decision.allowed);
	assert_eq!(decision.message, "spec.serviceClass is immutable");
	assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn immutables_ignored_on_create() {
	let f = fixture();
	let decision = Coordinator::new(f.config.clone())
		.validate(&create("Service", service("cloudantnosqldb", "lite")))
		.await;
	assert!(decision.allowed);
}

#[tokio::test]
async fn plan_change_asks_catalog() {
	let f = fixture();
	let request = update(
		"Service",
		service("cloudantnosqldb", "lite"),
		service("cloudantnosqldb", "standard"),
	);

	let catalog = StubCatalog::new(Some(false));
	let decision = Coordinator::new(f.config.clone())
		.with_catalog(catalog.clone())
		.validate(&request)
		.await;
	assert_eq!(
		decision,
		Decision::deny("plan of service cloudantnosqldb is not updateable")
	);
	assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);

	let decision = Coordinator::new(f.config.clone())
		.with_catalog(StubCatalog::new(Some(true)))
		.validate(&request)
		.await;
	assert!(decision.allowed);

	let decision = Coordinator::new(f.config.clone())
		.with_catalog(StubCatalog::new(None))
		.validate(&request)
		.await;
	assert!(!decision.allowed);
	assert_eq!(
		decision.message,
		"plan of service cloudantnosqldb is not updateable: catalog responded with status 503"
	);
}

#[tokio::test]
async fn unchanged_plan_skips_catalog() {
	let f = fixture();
	let catalog = StubCatalog::new(None);
	let decision = Coordinator::new(f.config.clone())
		.with_catalog(catalog.clone())
		.validate(&update(
			"Service",
			service("cloudantnosqldb", "lite"),
			service("cloudantnosqldb", "lite"),
		))
		.await;
	assert!(decision.allowed);
	assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn plan_change_without_service_class_denied() {
	let f = fixture();
	let mut old = service("", "lite");
	let mut new = service("", "standard");
	old["spec"].as_object_mut().unwrap().remove("serviceClass");
	new["spec"].as_object_mut().unwrap().remove("serviceClass");

	let catalog = StubCatalog::new(Some(true));
	let decision = Coordinator::new(f.config.clone())
		.with_catalog(catalog.clone())
		.validate(&update("Service", old, new))
		.await;
	assert_eq!(
		decision,
		Decision::deny("plan of service is not updateable: spec.serviceClass is missing")
	);
	assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);

	let decision = Coordinator::new(f.config.clone())
		.with_catalog(catalog.clone())
		.validate(&update("Service", service("", "lite"), service("", "standard")))
		.await;
	assert!(!decision.allowed);
	assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn plan_change_without_catalog_denied() {
	let f = fixture();
	let decision = Coordinator::new(f.config.clone())
		.validate(&update(
			"Service",
			service("cloudantnosqldb", "lite"),
			service("cloudantnosqldb", "standard"),
		))
		.await;
	assert_eq!(
		decision,
		Decision::deny("plan of service cloudantnosqldb is not updateable: catalog is not configured")
	);
}

#[tokio::test]
async fn gate_label_value_ignores_case() {
	let f = fixture();
	let coordinator = Coordinator::new(f.config.clone()).with_lookup(Arc::new(StubLookup {
		existing: vec![Dependent::secret("creds")],
		broken: false,
	}));

	let decision = coordinator
		.validate(&create(
			"Deployment",
			deployment(json!({"team": "web", DEPENDENCY_CHECK_LABEL: "TRUE"})),
		))
		.await;
	assert_eq!(
		decision,
		Decision::deny("ConfigMap settings is required but does not exist")
	);

	let decision = coordinator
		.validate(&create(
			"Deployment",
			deployment(json!({"team": "web", DEPENDENCY_CHECK_LABEL: "maybe"})),
		))
		.await;
	assert!(decision.allowed);
}

#[tokio::test]
async fn dependencies_present() {
	let f = fixture();
	let decision = Coordinator::new(f.config.clone())
		.with_lookup(both_exist())
		.validate(&create(
			"Deployment",
			deployment(json!({"team": "web", DEPENDENCY_CHECK_LABEL: "yes"})),
		))
		.await;
	assert!(decision.allowed);
}

#[tokio::test]
async fn lookup_failure_denies() {
	let f = fixture();
	let decision = Coordinator::new(f.config.clone())
		.with_lookup(Arc::new(StubLookup {
			existing: vec![],
			broken: true,
		}))
		.validate(&create(
			"Deployment",
			deployment(json!({"team": "web", DEPENDENCY_CHECK_LABEL: "true"})),
		))
		.await;
	assert!(!decision.allowed);
	assert_eq!(
		decision.message,
		"failed to verify Secret creds: can not look up objects of kind Secret"
	);
}

#[tokio::test]
async fn gate_without_lookup_allows() {
	let f = fixture();
	let decision = Coordinator::new(f.config.clone())
		.validate(&create(
			"Deployment",
			deployment(json!({"team": "web", DEPENDENCY_CHECK_LABEL: "true"})),
		))
		.await;
	assert!(decision.allowed);
}

#[tokio::test]
async fn delete_is_allowed() {
	let f = fixture();
	let request = AdmissionRequest {
		operation: Operation::Delete,
		..create("Deployment", deployment(json!({})))
	};
	assert!(Coordinator::new(f.config.clone()).validate(&request).await.allowed);
}

#[test]
fn mutate_adds_configured_labels() {
	let f = fixture();
	let coordinator = Coordinator::new(f.config.clone());
	let decision = coordinator.mutate(&create("Deployment", deployment(json!({"team": "web"}))));
	assert!(decision.allowed);
	assert_eq!(
		decision.patches,
		vec![PatchOperation {
			op: "add".to_owned(),
			path: "/metadata/labels/owner".to_owned(),
			value: Some(json!("seed")),
		}]
	);

	let decision = coordinator.mutate(&create(
		"Deployment",
		deployment(json!({"team": "web", "owner": "someone"})),
	));
	assert!(decision.patches.is_empty());
}

#[test]
fn request_namespace_fallback() {
	let mut request = create("Deployment", deployment(json!({})));
	request.namespace = None;
	assert_eq!(request.namespace(), "prod");
	request.object = json!({"kind": "Deployment"});
	assert_eq!(request.namespace(), "default");
}

#[test]
fn null_labels_keep_namespace() {
	let mut request = create("Deployment", deployment(Value::Null));
	request.namespace = None;
	assert!(request.labels().is_empty());
	assert_eq!(request.namespace(), "prod");
}

#[tokio::test]
async fn null_labels_denied_by_label_policy() {
	let f = fixture();
	let decision = Coordinator::new(f.config.clone())
		.validate(&create("Deployment", deployment(Value::Null)))
		.await;
	assert_eq!(decision, Decision::deny("required labels are not set: team"));
}

#[test]
fn operation_parse() {
	assert_eq!("update".parse::<Operation>().unwrap(), Operation::Update);
	assert_eq!(Operation::Connect.to_string(), "CONNECT");
	assert!(matches!(
		"PATCH".parse::<Operation>(),
		Err(Error::UnknownOperation(op)) if op == "PATCH"
	));
}

mod review {
	use super::*;
	use crate::admission::review::{allow_all, handle, AdmissionReview};
	use base64::{engine::general_purpose::STANDARD, Engine};

	fn review(group: &str, version: &str, resource: &str, kind: &str, operation: &str, object: Value) -> AdmissionReview {
		serde_json::from_value(json!({
			"apiVersion": "admission.k8s.io/v1",
			"kind": "AdmissionReview",
			"request": {
				"uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
				"kind": {"group": group, "version": version, "kind": kind},
				"resource": {"group": group, "version": version, "resource": resource},
				"namespace": "prod",
				"operation": operation,
				"object": object,
			},
		}))
		.unwrap()
	}

	#[tokio::test]
	async fn validate_denies_with_status() {
		let f = fixture();
		let coordinator = Coordinator::new(f.config.clone());
		let answer = handle(
			&coordinator,
			&routes(),
			Phase::Validate,
			review("apps", "v1", "deployments", "Deployment", "CREATE", deployment(json!({}))),
		)
		.await
		.unwrap();

		let encoded = serde_json::to_value(&answer).unwrap();
		assert_eq!(encoded["apiVersion"], "admission.k8s.io/v1");
		assert_eq!(encoded["response"]["uid"], "705ab4f5-6393-11e8-b7cc-42010a800002");
		assert_eq!(encoded["response"]["allowed"], false);
		assert_eq!(
			encoded["response"]["status"]["message"],
			"required labels are not set: team"
		);
		assert!(encoded["response"].get("patch").is_none());
	}

	#[tokio::test]
	async fn mutate_returns_encoded_patch() {
		let f = fixture();
		let coordinator = Coordinator::new(f.config.clone());
		let answer = handle(
			&coordinator,
			&routes(),
			Phase::Mutate,
			review("apps", "v1", "deployments", "Deployment", "CREATE", deployment(json!({"team": "web"}))),
		)
		.await
		.unwrap();

		let response = answer.response.unwrap();
		assert!(response.allowed);
		assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));
		let patch: Vec<PatchOperation> =
			serde_json::from_slice(&STANDARD.decode(response.patch.unwrap()).unwrap()).unwrap();
		assert_eq!(patch[0].path, "/metadata/labels/owner");
	}

	#[tokio::test]
	async fn unrouted_resource_is_allowed() {
		let f = fixture();
		let coordinator = Coordinator::new(f.config.clone());
		// pods have no route, label policy would otherwise deny
		let answer = handle(
			&coordinator,
			&routes(),
			Phase::Validate,
			review("", "v1", "pods", "Deployment", "CREATE", deployment(json!({}))),
		)
		.await
		.unwrap();
		assert!(answer.response.unwrap().allowed);
	}

	#[tokio::test]
	async fn missing_request() {
		let f = fixture();
		let coordinator = Coordinator::new(f.config.clone());
		let empty: AdmissionReview =
			serde_json::from_value(json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"})).unwrap();
		assert!(matches!(allow_all(&empty), Err(Error::MissingRequest)));
		assert!(matches!(
			handle(&coordinator, &routes(), Phase::Validate, empty).await,
			Err(Error::MissingRequest)
		));
	}

	#[test]
	fn allow_all_keeps_uid() {
		let answer = allow_all(&review("apps", "v1", "deployments", "Deployment", "DELETE", json!({}))).unwrap();
		let response = answer.response.unwrap();
		assert!(response.allowed);
		assert_eq!(response.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
		assert!(response.status.is_none());
	}
}
