use futures::future::{BoxFuture, FutureExt};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client};
use log::trace;
use thiserror::Error;

use crate::kubemodel::{Dependent, CONFIG_MAP_KIND, SECRET_KIND};

#[derive(Error, Debug)]
pub enum LookupError {
	#[error("kube error: {0}")]
	Kube(#[from] kube::Error),
	#[error("can not look up objects of kind {0}")]
	UnsupportedKind(String),
}

/// Answers "does this object exist in namespace?"
pub trait DependencyLookup: Send + Sync {
	fn exists<'a>(
		&'a self,
		namespace: &'a str,
		dependent: &'a Dependent,
	) -> BoxFuture<'a, Result<bool, LookupError>>;
}

/// Looks objects up in live cluster
#[derive(Clone)]
pub struct KubeLookup {
	client: Client,
}

impl KubeLookup {
	pub fn new(client: Client) -> Self {
		Self { client }
	}
}

impl DependencyLookup for KubeLookup {
	fn exists<'a>(
		&'a self,
		namespace: &'a str,
		dependent: &'a Dependent,
	) -> BoxFuture<'a, Result<bool, LookupError>> {
		async move {
			trace!(target: "dependency", "looking up {} in {}", dependent, namespace);
			let found = match dependent.kind.as_str() {
				SECRET_KIND => Api::<Secret>::namespaced(self.client.clone(), namespace)
					.get_opt(&dependent.name)
					.await?
					.is_some(),
				CONFIG_MAP_KIND => Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
					.get_opt(&dependent.name)
					.await?
					.is_some(),
				other => return Err(LookupError::UnsupportedKind(other.to_owned())),
			};
			Ok(found)
		}
		.boxed()
	}
}
