// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Schema-less access to the cluster API.
//!
//! Reconcilers never talk to `kube::Api` directly. They go through the
//! [`ClusterClient`] trait over [`DynamicObject`], keyed by
//! [`GroupVersionKind`] plus namespace and name, so the kernel only needs to
//! know an object's identity and its replaceable `spec`/`data` payload.
//!
//! - [`KubeClusterClient`] is the production implementation
//! - [`CancellableClient`] wraps any client so every call observes a
//!   per-pass [`CancellationToken`]

use crate::errors::{ApiError, ApiVerb, ReconcileError};
use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identity of a single cluster object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub gvk: GroupVersionKind,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceId {
    /// Namespaced identity.
    #[must_use]
    pub fn namespaced(gvk: GroupVersionKind, namespace: &str, name: &str) -> Self {
        Self {
            gvk,
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }

    /// Cluster-scoped identity.
    #[must_use]
    pub fn cluster(gvk: GroupVersionKind, name: &str) -> Self {
        Self {
            gvk,
            namespace: None,
            name: name.to_string(),
        }
    }

    /// Identity of an object returned by the API.
    #[must_use]
    pub fn of(gvk: &GroupVersionKind, obj: &DynamicObject) -> Self {
        Self {
            gvk: gvk.clone(),
            namespace: obj.metadata.namespace.clone(),
            name: obj.metadata.name.clone().unwrap_or_default(),
        }
    }

    /// `apiVersion` string (`group/version`, or `version` for the core group).
    #[must_use]
    pub fn api_version(&self) -> String {
        api_version(&self.gvk)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.gvk.kind, ns, self.name),
            None => write!(f, "{} {}", self.gvk.kind, self.name),
        }
    }
}

/// `apiVersion` string for a kind.
#[must_use]
pub fn api_version(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

/// `group/version/Kind` string used in logs and errors.
#[must_use]
pub fn gvk_label(gvk: &GroupVersionKind) -> String {
    format!("{}/{}", api_version(gvk), gvk.kind)
}

/// Kinds the operator reads or writes.
pub mod kinds {
    use kube::core::GroupVersionKind;

    #[must_use]
    pub fn api_gateway() -> GroupVersionKind {
        GroupVersionKind::gvk("operator.kyma-project.io", "v1alpha1", "APIGateway")
    }

    #[must_use]
    pub fn api_rule() -> GroupVersionKind {
        GroupVersionKind::gvk("gateway.kyma-project.io", "v1beta1", "APIRule")
    }

    #[must_use]
    pub fn oathkeeper_rule() -> GroupVersionKind {
        GroupVersionKind::gvk("oathkeeper.ory.sh", "v1alpha1", "Rule")
    }

    #[must_use]
    pub fn istio_gateway() -> GroupVersionKind {
        GroupVersionKind::gvk("networking.istio.io", "v1alpha3", "Gateway")
    }

    #[must_use]
    pub fn virtual_service() -> GroupVersionKind {
        GroupVersionKind::gvk("networking.istio.io", "v1beta1", "VirtualService")
    }

    #[must_use]
    pub fn dns_entry() -> GroupVersionKind {
        GroupVersionKind::gvk("dns.gardener.cloud", "v1alpha1", "DNSEntry")
    }

    #[must_use]
    pub fn certificate() -> GroupVersionKind {
        GroupVersionKind::gvk("cert.gardener.cloud", "v1alpha1", "Certificate")
    }

    #[must_use]
    pub fn secret() -> GroupVersionKind {
        GroupVersionKind::gvk("", "v1", "Secret")
    }

    #[must_use]
    pub fn service() -> GroupVersionKind {
        GroupVersionKind::gvk("", "v1", "Service")
    }

    #[must_use]
    pub fn config_map() -> GroupVersionKind {
        GroupVersionKind::gvk("", "v1", "ConfigMap")
    }

    #[must_use]
    pub fn node() -> GroupVersionKind {
        GroupVersionKind::gvk("", "v1", "Node")
    }

    #[must_use]
    pub fn deployment() -> GroupVersionKind {
        GroupVersionKind::gvk("apps", "v1", "Deployment")
    }

    #[must_use]
    pub fn horizontal_pod_autoscaler() -> GroupVersionKind {
        GroupVersionKind::gvk("autoscaling", "v2", "HorizontalPodAutoscaler")
    }

    #[must_use]
    pub fn service_account() -> GroupVersionKind {
        GroupVersionKind::gvk("", "v1", "ServiceAccount")
    }

    #[must_use]
    pub fn role() -> GroupVersionKind {
        GroupVersionKind::gvk("rbac.authorization.k8s.io", "v1", "Role")
    }

    #[must_use]
    pub fn role_binding() -> GroupVersionKind {
        GroupVersionKind::gvk("rbac.authorization.k8s.io", "v1", "RoleBinding")
    }

    #[must_use]
    pub fn cron_job() -> GroupVersionKind {
        GroupVersionKind::gvk("batch", "v1", "CronJob")
    }

    #[must_use]
    pub fn peer_authentication() -> GroupVersionKind {
        GroupVersionKind::gvk("security.istio.io", "v1beta1", "PeerAuthentication")
    }

    #[must_use]
    pub fn custom_resource_definition() -> GroupVersionKind {
        GroupVersionKind::gvk("apiextensions.k8s.io", "v1", "CustomResourceDefinition")
    }
}

/// Abstract cluster API capability set used by the reconciliation kernel.
///
/// Implementations must classify failures into [`ApiError`] variants so
/// callers can treat absence and optimistic-concurrency conflicts specially.
/// No implementation retries internally.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read one object.
    async fn get(&self, id: &ResourceId) -> Result<DynamicObject, ApiError>;

    /// List all instances of a kind across namespaces, optionally filtered by a
    /// `key=value[,key=value]` label selector. A kind that is not served yields
    /// [`ApiError::KindNotInstalled`].
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ApiError>;

    /// Create `obj` at `id`.
    async fn create(&self, id: &ResourceId, obj: &DynamicObject)
        -> Result<DynamicObject, ApiError>;

    /// Replace everything but status. A stale `metadata.resourceVersion` is a [`ApiError::Conflict`].
    async fn replace(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError>;

    /// Replace only the status sub-resource, guarded by `metadata.resourceVersion`.
    async fn replace_status(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError>;

    /// Request deletion. Objects with finalizers stay until the finalizers are removed.
    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError>;
}

/// [`ClusterClient`] backed by a `kube::Client`.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, gvk: &GroupVersionKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = ApiResource::from_gvk(gvk);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }

    fn api_for(&self, id: &ResourceId) -> Api<DynamicObject> {
        self.api(&id.gvk, id.namespace.as_deref())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get(&self, id: &ResourceId) -> Result<DynamicObject, ApiError> {
        debug!(resource = %id, "get");
        self.api_for(id)
            .get(&id.name)
            .await
            .map_err(|e| ApiError::from_kube(e, ApiVerb::Get, id.to_string()))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ApiError> {
        debug!(kind = %gvk_label(gvk), selector = ?label_selector, "list");
        let mut lp = ListParams::default();
        if let Some(selector) = label_selector {
            lp = lp.labels(selector);
        }
        self.api(gvk, None)
            .list(&lp)
            .await
            .map(|list| list.items)
            .map_err(|e| ApiError::from_kube(e, ApiVerb::List, gvk_label(gvk)))
    }

    async fn create(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        debug!(resource = %id, "create");
        self.api_for(id)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| ApiError::from_kube(e, ApiVerb::Create, id.to_string()))
    }

    async fn replace(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        debug!(resource = %id, "replace");
        self.api_for(id)
            .replace(&id.name, &PostParams::default(), obj)
            .await
            .map_err(|e| ApiError::from_kube(e, ApiVerb::Update, id.to_string()))
    }

    async fn replace_status(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        debug!(resource = %id, "replace status");
        // A merge patch carrying resourceVersion is rejected with 409 when stale.
        let patch = json!({
            "metadata": { "resourceVersion": obj.metadata.resource_version },
            "status": obj.data.get("status").cloned().unwrap_or_default(),
        });
        self.api_for(id)
            .patch_status(&id.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| ApiError::from_kube(e, ApiVerb::Update, id.to_string()))
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
        debug!(resource = %id, "delete");
        self.api_for(id)
            .delete(&id.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ApiError::from_kube(e, ApiVerb::Delete, id.to_string()))
    }
}

/// Wraps a [`ClusterClient`] so every call returns [`ApiError::Cancelled`]
/// as soon as the pass's token is cancelled.
pub struct CancellableClient {
    inner: Arc<dyn ClusterClient>,
    token: CancellationToken,
}

impl CancellableClient {
    #[must_use]
    pub fn new(inner: Arc<dyn ClusterClient>, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    async fn guard<T>(
        &self,
        resource: impl FnOnce() -> String,
        call: impl Future<Output = Result<T, ApiError>> + Send,
    ) -> Result<T, ApiError> {
        if self.token.is_cancelled() {
            return Err(ApiError::Cancelled {
                resource: resource(),
            });
        }
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(ApiError::Cancelled { resource: resource() }),
            result = call => result,
        }
    }
}

#[async_trait]
impl ClusterClient for CancellableClient {
    async fn get(&self, id: &ResourceId) -> Result<DynamicObject, ApiError> {
        self.guard(|| id.to_string(), self.inner.get(id)).await
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ApiError> {
        self.guard(|| gvk_label(gvk), self.inner.list(gvk, label_selector))
            .await
    }

    async fn create(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        self.guard(|| id.to_string(), self.inner.create(id, obj))
            .await
    }

    async fn replace(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        self.guard(|| id.to_string(), self.inner.replace(id, obj))
            .await
    }

    async fn replace_status(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        self.guard(|| id.to_string(), self.inner.replace_status(id, obj))
            .await
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
        self.guard(|| id.to_string(), self.inner.delete(id)).await
    }
}

/// Convert a typed object into its dynamic form.
///
/// # Errors
///
/// Returns [`ReconcileError::Serialization`] if the object does not serialize
/// to a Kubernetes object document.
pub fn to_dynamic<T: Serialize>(resource: &str, obj: &T) -> Result<DynamicObject, ReconcileError> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|source| ReconcileError::Serialization {
            resource: resource.to_string(),
            source,
        })
}

/// Convert a dynamic object into a typed one.
///
/// # Errors
///
/// Returns [`ReconcileError::Serialization`] if the payload does not match `T`.
pub fn from_dynamic<T: DeserializeOwned>(
    resource: &str,
    obj: &DynamicObject,
) -> Result<T, ReconcileError> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|source| ReconcileError::Serialization {
            resource: resource.to_string(),
            source,
        })
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
