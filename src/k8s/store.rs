/// Versioned object access for a single Kubernetes kind
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

use crate::error::MutateError;

/// Read, replace and delete objects of one kind within one scope
///
/// `replace` must reject writes whose resourceVersion is stale with
/// [`MutateError::VersionConflict`].
pub trait ObjectStore {
    type Object;

    /// Kind name used in log lines and errors
    fn kind(&self) -> &str;

    async fn get(&self, name: &str) -> Result<Self::Object, MutateError>;

    async fn replace(
        &self,
        name: &str,
        object: &Self::Object,
    ) -> Result<Self::Object, MutateError>;

    async fn delete(&self, name: &str) -> Result<(), MutateError>;
}

/// Object store backed by the Kubernetes API
pub struct KubeStore<K> {
    api: Api<K>,
    kind: String,
    scope: String,
}

impl<K> KubeStore<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    /// Store for a namespaced kind, bound to one namespace
    pub fn namespaced(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            kind: K::kind(&()).to_string(),
            scope: namespace.to_string(),
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<DynamicType = (), Scope = ClusterResourceScope>,
{
    /// Store for a cluster-scoped kind
    pub fn cluster(client: Client) -> Self {
        Self {
            api: Api::all(client),
            kind: K::kind(&()).to_string(),
            scope: "<cluster>".to_string(),
        }
    }
}

impl<K> ObjectStore for KubeStore<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug,
{
    type Object = K;

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn get(&self, name: &str) -> Result<K, MutateError> {
        debug!("GET {} {}/{}", self.kind, self.scope, name);
        self.api
            .get(name)
            .await
            .map_err(|e| MutateError::from_kube(e, &self.kind, name))
    }

    async fn replace(&self, name: &str, object: &K) -> Result<K, MutateError> {
        debug!(
            "PUT {} {}/{} (resourceVersion {:?})",
            self.kind,
            self.scope,
            name,
            object.meta().resource_version
        );
        self.api
            .replace(name, &PostParams::default(), object)
            .await
            .map_err(|e| MutateError::from_kube(e, &self.kind, name))
    }

    async fn delete(&self, name: &str) -> Result<(), MutateError> {
        debug!("DELETE {} {}/{}", self.kind, self.scope, name);
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| MutateError::from_kube(e, &self.kind, name))
    }
}
