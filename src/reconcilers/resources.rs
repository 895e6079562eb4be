// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Idempotent create-or-update of owned resources.
//!
//! A [`DesiredResource`] is rendered from its template on every pass and
//! applied with [`apply`]:
//!
//! 1. read the stored object, if any
//! 2. union its labels and annotations with the rendered ones and the
//!    management set, with the management set winning
//! 3. overwrite the rendered payload (`spec`, `data`, ...) but never `status`
//! 4. create when absent, replace when the merge changed anything, else do nothing
//!
//! Unrelated labels and annotations survive, and a removed disclaimer comes
//! back on the next pass. Nothing here retries.

use crate::cluster::{ClusterClient, ResourceId};
use crate::errors::{ReconcileError, TemplateError};
use crate::labels::{management_annotations, management_labels};
use crate::metrics::record_resource_operation;
use crate::template::render;
use kube::core::{DynamicObject, ObjectMeta};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Top-level fields `apply` never overwrites.
const UNMANAGED_FIELDS: [&str; 1] = ["status"];

/// A resource the current pass wants to exist.
#[derive(Clone, Debug)]
pub struct DesiredResource {
    pub id: ResourceId,
    pub template: &'static str,
    pub params: BTreeMap<String, String>,
}

impl DesiredResource {
    #[must_use]
    pub fn new(id: ResourceId, template: &'static str) -> Self {
        Self {
            id,
            template,
            params: BTreeMap::new(),
        }
    }

    /// Add a template parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Render the template and check the result has the declared identity.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] if rendering fails or the rendered
    /// `apiVersion`/`kind`/namespace/name differ from [`DesiredResource::id`].
    pub fn render(&self) -> Result<DynamicObject, TemplateError> {
        let obj = render(self.template, &self.params)?;
        let (api_version, kind) = obj
            .types
            .as_ref()
            .map(|t| (t.api_version.clone(), t.kind.clone()))
            .unwrap_or_default();
        let rendered = format!(
            "{api_version}/{kind} {}/{}",
            obj.metadata.namespace.clone().unwrap_or_default(),
            obj.metadata.name.clone().unwrap_or_default()
        );
        let declared = format!(
            "{}/{} {}/{}",
            self.id.api_version(),
            self.id.gvk.kind,
            self.id.namespace.clone().unwrap_or_default(),
            self.id.name
        );
        if rendered != declared {
            return Err(TemplateError::IdentityMismatch { declared, rendered });
        }
        Ok(obj)
    }
}

/// What [`apply`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

fn merge_map(
    existing: Option<&BTreeMap<String, String>>,
    rendered: Option<&BTreeMap<String, String>>,
    management: BTreeMap<String, String>,
) -> Option<BTreeMap<String, String>> {
    let mut merged = existing.cloned().unwrap_or_default();
    if let Some(rendered) = rendered {
        merged.extend(rendered.clone());
    }
    merged.extend(management);
    Some(merged)
}

fn stamp_management(meta: &mut ObjectMeta, rendered: &ObjectMeta, existing: Option<&ObjectMeta>) {
    meta.labels = merge_map(
        existing.and_then(|m| m.labels.as_ref()),
        rendered.labels.as_ref(),
        management_labels(),
    );
    meta.annotations = merge_map(
        existing.and_then(|m| m.annotations.as_ref()),
        rendered.annotations.as_ref(),
        management_annotations(),
    );
}

/// Merge the rendered object into the stored one.
///
/// Only labels, annotations and the rendered payload fields change; everything
/// else on `existing` (resourceVersion, finalizers, status, server-set fields) is kept.
#[must_use]
pub fn merge_into(existing: &DynamicObject, rendered: &DynamicObject) -> DynamicObject {
    let mut merged = existing.clone();
    stamp_management(&mut merged.metadata, &rendered.metadata, Some(&existing.metadata));

    if let Some(fields) = rendered.data.as_object() {
        if !merged.data.is_object() {
            merged.data = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(target) = merged.data.as_object_mut() {
            for (key, value) in fields {
                if !UNMANAGED_FIELDS.contains(&key.as_str()) {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
    merged
}

fn differs(a: &DynamicObject, b: &DynamicObject) -> bool {
    a.metadata.labels != b.metadata.labels
        || a.metadata.annotations != b.metadata.annotations
        || a.data != b.data
}

/// Create or update `desired` so the cluster matches it.
///
/// # Errors
///
/// Returns [`ReconcileError::Template`] for render failures and
/// [`ReconcileError::Api`] for the first failing API call.
pub async fn apply(
    client: &dyn ClusterClient,
    desired: &DesiredResource,
) -> Result<ApplyOutcome, ReconcileError> {
    let rendered = desired.render()?;
    let id = &desired.id;

    match client.get(id).await {
        Ok(existing) => {
            let merged = merge_into(&existing, &rendered);
            if !differs(&merged, &existing) {
                debug!(resource = %id, "Resource is up to date");
                return Ok(ApplyOutcome::Unchanged);
            }
            client.replace(id, &merged).await?;
            record_resource_operation(&id.gvk.kind, "updated");
            info!(resource = %id, "Updated resource");
            Ok(ApplyOutcome::Updated)
        }
        Err(e) if e.is_not_found() => {
            let mut obj = rendered.clone();
            stamp_management(&mut obj.metadata, &rendered.metadata, None);
            client.create(id, &obj).await?;
            record_resource_operation(&id.gvk.kind, "created");
            info!(resource = %id, "Created resource");
            Ok(ApplyOutcome::Created)
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a resource. Returns `false` when it was already absent.
///
/// # Errors
///
/// Returns [`ReconcileError::Api`] for any failure other than absence.
pub async fn delete(client: &dyn ClusterClient, id: &ResourceId) -> Result<bool, ReconcileError> {
    match client.delete(id).await {
        Ok(()) => {
            record_resource_operation(&id.gvk.kind, "deleted");
            info!(resource = %id, "Deleted resource");
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            debug!(resource = %id, "Skipped deletion of absent resource");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
