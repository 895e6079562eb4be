// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterClient`] used by unit tests.
//!
//! The fake behaves like the API server where the reconciler can observe it:
//!
//! - every write bumps `metadata.resourceVersion`; a write carrying a stale one is a conflict
//! - `replace` never touches status and `replace_status` touches nothing else
//! - `replace_status` merges the new status into the stored one like a merge patch
//! - `delete` on an object with finalizers only sets the deletion marker; the object
//!   disappears once a later `replace` empties its finalizer set
//! - kinds can be marked as not installed, and status writes can be made to conflict

use crate::cluster::{gvk_label, kinds, to_dynamic, ClusterClient, ResourceId};
use crate::context::Pass;
use crate::crd::{APIGateway, APIGatewaySpec};
use crate::errors::ApiError;
use crate::reconcilers::catalog::ManagedResourceCatalog;
use crate::reconcilers::topology::{resolve, EnvironmentFacts, ResourcePlan};
use crate::tls::TlsCredentials;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::{DynamicObject, GroupVersionKind};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

type Key = (String, String, String);

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<Key, DynamicObject>,
    missing_kinds: HashSet<String>,
    resource_version: u64,
    status_conflicts: u32,
    status_attempts: u32,
    status_writes: u32,
    spec_writes: u32,
    deletes: u32,
}

impl FakeState {
    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// In-memory cluster.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

fn key(id: &ResourceId) -> Key {
    (
        gvk_label(&id.gvk),
        id.namespace.clone().unwrap_or_default(),
        id.name.clone(),
    )
}

/// RFC3339 timestamp as a Kubernetes `Time`.
pub fn time_at(rfc3339: &str) -> Time {
    serde_json::from_value(json!(rfc3339)).unwrap()
}

/// Current time as a Kubernetes `Time`.
pub fn now() -> Time {
    time_at(&chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Build a dynamic object from a body holding everything but `apiVersion`/`kind`/`metadata`.
pub fn dynamic(gvk: &GroupVersionKind, namespace: Option<&str>, name: &str, body: Value) -> DynamicObject {
    let mut doc = json!({
        "apiVersion": crate::cluster::api_version(gvk),
        "kind": gvk.kind,
        "metadata": { "name": name },
    });
    if let Some(ns) = namespace {
        doc["metadata"]["namespace"] = json!(ns);
    }
    if let (Some(target), Value::Object(fields)) = (doc.as_object_mut(), body) {
        target.extend(fields);
    }
    serde_json::from_value(doc).unwrap()
}

fn selector_matches(obj: &DynamicObject, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let labels = obj.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.get(k.trim()).map(String::as_str) == Some(v.trim()),
            None => labels.contains_key(term.trim()),
        })
}

fn status_of(obj: &DynamicObject) -> Option<Value> {
    obj.data.get("status").cloned()
}

fn set_status(obj: &mut DynamicObject, status: Option<Value>) {
    if !obj.data.is_object() {
        obj.data = json!({});
    }
    if let Some(fields) = obj.data.as_object_mut() {
        match status {
            Some(s) => {
                fields.insert("status".to_string(), s);
            }
            None => {
                fields.remove("status");
            }
        }
    }
}

/// JSON merge patch (RFC 7386), as the API server applies a status patch.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Some(existing) = target.as_object_mut() {
        for (name, value) in fields {
            if value.is_null() {
                existing.remove(name);
            } else {
                merge_patch(existing.entry(name.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for `gvk` behave as if its CRD were not installed.
    pub fn remove_kind(&self, gvk: &GroupVersionKind) {
        self.state
            .lock()
            .unwrap()
            .missing_kinds
            .insert(gvk_label(gvk));
    }

    /// Seed an object without counting it as a write.
    pub fn insert(&self, gvk: &GroupVersionKind, mut obj: DynamicObject) -> DynamicObject {
        let mut state = self.state.lock().unwrap();
        let id = ResourceId::of(gvk, &obj);
        obj.metadata.resource_version = Some(state.next_version());
        if obj.metadata.uid.is_none() {
            obj.metadata.uid = Some(format!("uid-{}", state.resource_version));
        }
        state.objects.insert(key(&id), obj.clone());
        obj
    }

    /// Stored copy of an object, if present.
    pub fn object(&self, id: &ResourceId) -> Option<DynamicObject> {
        self.state.lock().unwrap().objects.get(&key(id)).cloned()
    }

    pub fn exists(&self, id: &ResourceId) -> bool {
        self.object(id).is_some()
    }

    /// Mutate a stored object out-of-band (simulates another actor); bumps the version.
    pub fn edit(&self, id: &ResourceId, f: impl FnOnce(&mut DynamicObject)) {
        let mut state = self.state.lock().unwrap();
        let version = state.next_version();
        if let Some(obj) = state.objects.get_mut(&key(id)) {
            f(obj);
            obj.metadata.resource_version = Some(version);
        }
    }

    /// The next `n` status writes fail with a conflict.
    pub fn inject_status_conflicts(&self, n: u32) {
        self.state.lock().unwrap().status_conflicts = n;
    }

    pub fn status_attempts(&self) -> u32 {
        self.state.lock().unwrap().status_attempts
    }

    pub fn status_writes(&self) -> u32 {
        self.state.lock().unwrap().status_writes
    }

    pub fn spec_writes(&self) -> u32 {
        self.state.lock().unwrap().spec_writes
    }

    pub fn deletes(&self) -> u32 {
        self.state.lock().unwrap().deletes
    }

    fn kind_missing(state: &FakeState, gvk: &GroupVersionKind) -> bool {
        state.missing_kinds.contains(&gvk_label(gvk))
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get(&self, id: &ResourceId) -> Result<DynamicObject, ApiError> {
        let state = self.state.lock().unwrap();
        if Self::kind_missing(&state, &id.gvk) {
            return Err(ApiError::NotFound {
                resource: id.to_string(),
            });
        }
        state
            .objects
            .get(&key(id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: id.to_string(),
            })
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ApiError> {
        let state = self.state.lock().unwrap();
        if Self::kind_missing(&state, gvk) {
            return Err(ApiError::KindNotInstalled {
                kind: gvk_label(gvk),
            });
        }
        let label = gvk_label(gvk);
        Ok(state
            .objects
            .iter()
            .filter(|((k, _, _), obj)| *k == label && selector_matches(obj, label_selector))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        let mut state = self.state.lock().unwrap();
        if Self::kind_missing(&state, &id.gvk) {
            return Err(ApiError::NotFound {
                resource: id.to_string(),
            });
        }
        if state.objects.contains_key(&key(id)) {
            return Err(ApiError::AlreadyExists {
                resource: id.to_string(),
            });
        }
        let mut stored = obj.clone();
        stored.metadata.resource_version = Some(state.next_version());
        stored.metadata.uid = Some(format!("uid-{}", state.resource_version));
        if stored.metadata.creation_timestamp.is_none() {
            stored.metadata.creation_timestamp = Some(now());
        }
        state.spec_writes += 1;
        state.objects.insert(key(id), stored.clone());
        Ok(stored)
    }

    async fn replace(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        let mut state = self.state.lock().unwrap();
        let Some(current) = state.objects.get(&key(id)).cloned() else {
            return Err(ApiError::NotFound {
                resource: id.to_string(),
            });
        };
        if obj.metadata.resource_version.is_some()
            && obj.metadata.resource_version != current.metadata.resource_version
        {
            return Err(ApiError::Conflict {
                resource: id.to_string(),
            });
        }
        let mut stored = obj.clone();
        set_status(&mut stored, status_of(&current));
        stored.metadata.uid = current.metadata.uid.clone();
        stored.metadata.creation_timestamp = current.metadata.creation_timestamp.clone();
        stored.metadata.deletion_timestamp = current.metadata.deletion_timestamp.clone();
        stored.metadata.resource_version = Some(state.next_version());
        state.spec_writes += 1;

        let finalized = stored.metadata.deletion_timestamp.is_some()
            && stored.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
        if finalized {
            state.objects.remove(&key(id));
        } else {
            state.objects.insert(key(id), stored.clone());
        }
        Ok(stored)
    }

    async fn replace_status(
        &self,
        id: &ResourceId,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.status_attempts += 1;
        if state.status_conflicts > 0 {
            state.status_conflicts -= 1;
            // Another writer got there first.
            let version = state.next_version();
            if let Some(current) = state.objects.get_mut(&key(id)) {
                current.metadata.resource_version = Some(version);
            }
            return Err(ApiError::Conflict {
                resource: id.to_string(),
            });
        }
        let Some(current) = state.objects.get(&key(id)).cloned() else {
            return Err(ApiError::NotFound {
                resource: id.to_string(),
            });
        };
        if obj.metadata.resource_version.is_some()
            && obj.metadata.resource_version != current.metadata.resource_version
        {
            return Err(ApiError::Conflict {
                resource: id.to_string(),
            });
        }
        let mut stored = current;
        let mut status = status_of(&stored).unwrap_or_else(|| json!({}));
        merge_patch(&mut status, &status_of(obj).unwrap_or_else(|| json!({})));
        set_status(&mut stored, Some(status));
        stored.metadata.resource_version = Some(state.next_version());
        state.status_writes += 1;
        state.objects.insert(key(id), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if Self::kind_missing(&state, &id.gvk) {
            return Err(ApiError::NotFound {
                resource: id.to_string(),
            });
        }
        let Some(current) = state.objects.get(&key(id)).cloned() else {
            return Err(ApiError::NotFound {
                resource: id.to_string(),
            });
        };
        state.deletes += 1;
        if current.metadata.finalizers.as_ref().is_some_and(|f| !f.is_empty()) {
            let version = state.next_version();
            if let Some(obj) = state.objects.get_mut(&key(id)) {
                if obj.metadata.deletion_timestamp.is_none() {
                    obj.metadata.deletion_timestamp = Some(now());
                }
                obj.metadata.resource_version = Some(version);
            }
        } else {
            state.objects.remove(&key(id));
        }
        Ok(())
    }
}

/// Everything a sub-reconciliation needs, backed by a [`FakeCluster`].
pub struct TestEnv {
    pub fake: FakeCluster,
    pub catalog: ManagedResourceCatalog,
    pub tls: TlsCredentials,
    pub plan: ResourcePlan,
    pub gateway_id: ResourceId,
}

impl TestEnv {
    /// Empty cluster, embedded catalog, local plan.
    pub fn new() -> Self {
        Self {
            fake: FakeCluster::new(),
            catalog: ManagedResourceCatalog::embedded().unwrap(),
            tls: TlsCredentials::new(),
            plan: resolve(&EnvironmentFacts::default()),
            gateway_id: ResourceId::cluster(kinds::api_gateway(), "default"),
        }
    }

    /// Store an `APIGateway` named `name` created at `created` (RFC3339).
    pub fn seed_gateway_named(&self, name: &str, enable_kyma_gateway: bool, created: &str) -> ResourceId {
        let mut gateway = APIGateway::new(
            name,
            APIGatewaySpec {
                enable_kyma_gateway: Some(enable_kyma_gateway),
            },
        );
        gateway.metadata.creation_timestamp = Some(time_at(created));
        self.fake
            .insert(&kinds::api_gateway(), to_dynamic("test", &gateway).unwrap());
        ResourceId::cluster(kinds::api_gateway(), name)
    }

    /// Store the `APIGateway` named `default`.
    pub fn seed_gateway(&self, enable_kyma_gateway: bool) {
        self.seed_gateway_named("default", enable_kyma_gateway, "2024-01-01T00:00:00Z");
    }

    /// Flip `spec.enableKymaGateway` out-of-band.
    pub fn set_kyma_gateway(&self, enabled: bool) {
        self.fake.edit(&self.gateway_id, |obj| {
            obj.data["spec"]["enableKymaGateway"] = json!(enabled);
        });
    }

    /// Stored `default` `APIGateway`.
    pub fn gateway(&self) -> APIGateway {
        let obj = self.fake.object(&self.gateway_id).unwrap();
        crate::cluster::from_dynamic("test", &obj).unwrap()
    }

    pub fn pass<'a>(&'a self, gateway: &'a APIGateway) -> Pass<'a> {
        Pass {
            client: &self.fake,
            catalog: &self.catalog,
            tls: &self.tls,
            gateway,
            gateway_id: &self.gateway_id,
            plan: &self.plan,
        }
    }

    /// Store a user `APIRule` routed through `gateway`.
    pub fn seed_api_rule(&self, namespace: &str, name: &str, gateway: &str) {
        self.fake.insert(
            &kinds::api_rule(),
            dynamic(
                &kinds::api_rule(),
                Some(namespace),
                name,
                json!({ "spec": { "gateway": gateway } }),
            ),
        );
    }
}
