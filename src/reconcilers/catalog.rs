// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Managed-resource catalog and foreign-resource scanning.
//!
//! The catalog lists the kinds the module cares about and, per kind, the
//! name/namespace patterns of the instances the module itself owns:
//!
//! ```yaml
//! resources:
//!   - groupVersionKind:
//!       group: networking.istio.io
//!       version: v1beta1
//!       kind: VirtualService
//!     controlledList:
//!       - name: "istio-healthz"
//!         namespace: "kyma-system"
//! ```
//!
//! Patterns are compiled once at load time and anchored, so `istio-healthz`
//! only matches that exact name while `kyma-.*` matches any generated suffix.
//! An instance is managed when ANY entry of its kind matches both name and
//! namespace; overlapping entries are therefore harmless and order does not matter.
//!
//! [`find_foreign_resources`] answers "which live instances that the module
//! does not own are relevant to X", where X is a caller-supplied predicate.

use crate::cluster::{gvk_label, ClusterClient, ResourceId};
use crate::errors::{ConfigurationError, ReconcileError};
use kube::core::{DynamicObject, GroupVersionKind};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    #[serde(default)]
    resources: Vec<CatalogResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogResource {
    #[serde(alias = "GroupVersionKind")]
    group_version_kind: CatalogGvk,
    #[serde(default, alias = "ControlledList")]
    controlled_list: Vec<CatalogPattern>,
}

#[derive(Debug, Deserialize)]
struct CatalogGvk {
    #[serde(default)]
    group: String,
    version: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CatalogPattern {
    name: String,
    namespace: String,
}

/// One (kind, name-pattern, namespace-pattern) triple.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub gvk: GroupVersionKind,
    name: Regex,
    namespace: Regex,
}

impl CatalogEntry {
    /// `true` when both patterns match the whole name and namespace.
    #[must_use]
    pub fn matches(&self, name: &str, namespace: &str) -> bool {
        self.name.is_match(name) && self.namespace.is_match(namespace)
    }
}

/// Immutable set of kinds and the instances of them the module owns.
#[derive(Debug, Clone, Default)]
pub struct ManagedResourceCatalog {
    kinds: Vec<GroupVersionKind>,
    entries: Vec<CatalogEntry>,
}

fn compile(kind: &str, pattern: &str) -> Result<Regex, ConfigurationError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigurationError::InvalidPattern {
        kind: kind.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

impl ManagedResourceCatalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] for malformed YAML and
    /// [`ConfigurationError::InvalidPattern`] for the first pattern that does not compile.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        let doc: CatalogDocument = serde_yaml::from_str(yaml)?;
        let mut catalog = Self::default();

        for resource in doc.resources {
            let gvk = GroupVersionKind::gvk(
                &resource.group_version_kind.group,
                &resource.group_version_kind.version,
                &resource.group_version_kind.kind,
            );
            let label = gvk_label(&gvk);
            for pattern in resource.controlled_list {
                catalog.entries.push(CatalogEntry {
                    gvk: gvk.clone(),
                    name: compile(&label, &pattern.name)?,
                    namespace: compile(&label, &pattern.namespace)?,
                });
            }
            if !catalog.kinds.contains(&gvk) {
                catalog.kinds.push(gvk);
            }
        }

        info!(
            kinds = catalog.kinds.len(),
            entries = catalog.entries.len(),
            "Loaded managed resource catalog"
        );
        Ok(catalog)
    }

    /// Read and validate a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Read`] if the file cannot be read, otherwise
    /// the errors of [`ManagedResourceCatalog::from_yaml`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// The catalog embedded in the binary.
    ///
    /// # Errors
    ///
    /// Same as [`ManagedResourceCatalog::from_yaml`].
    pub fn embedded() -> Result<Self, ConfigurationError> {
        Self::from_yaml(crate::manifests::CONTROLLED_RESOURCES)
    }

    /// Kinds listed in the catalog, in document order.
    #[must_use]
    pub fn kinds(&self) -> &[GroupVersionKind] {
        &self.kinds
    }

    /// Whether the module owns the instance `namespace/name` of `gvk`.
    #[must_use]
    pub fn is_managed(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.gvk == *gvk && e.matches(name, namespace))
    }
}

/// A live instance seen by a scan, with its full payload for relevance checks.
#[derive(Debug, Clone)]
pub struct ObservedResource {
    pub id: ResourceId,
    pub object: DynamicObject,
}

impl ObservedResource {
    /// `namespace/name`, or `name` for cluster-scoped instances.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.id.namespace {
            Some(ns) => format!("{ns}/{}", self.id.name),
            None => self.id.name.clone(),
        }
    }
}

impl fmt::Display for ObservedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// An observed instance the module does not own that the caller found relevant.
pub type BlockingResource = ObservedResource;

/// List every instance of `kinds` and return those that are not managed and
/// satisfy `is_relevant`.
///
/// A kind that is not installed contributes zero results.
///
/// # Errors
///
/// Returns the first list failure other than an uninstalled kind.
pub async fn find_foreign_resources<F>(
    client: &dyn ClusterClient,
    catalog: &ManagedResourceCatalog,
    kinds: &[GroupVersionKind],
    is_relevant: F,
) -> Result<Vec<BlockingResource>, ReconcileError>
where
    F: Fn(&ObservedResource) -> bool + Send + Sync,
{
    let mut foreign = Vec::new();

    for gvk in kinds {
        let items = match client.list(gvk, None).await {
            Ok(items) => items,
            Err(e) if e.is_not_found() => {
                debug!(kind = %gvk_label(gvk), "Kind not installed, nothing to scan");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for object in items {
            let observed = ObservedResource {
                id: ResourceId::of(gvk, &object),
                object,
            };
            let namespace = observed.id.namespace.as_deref().unwrap_or_default();
            if catalog.is_managed(gvk, namespace, &observed.id.name) {
                continue;
            }
            if is_relevant(&observed) {
                debug!(resource = %observed, "Found foreign resource");
                foreign.push(observed);
            }
        }
    }

    Ok(foreign)
}

// ============================================================================
// Relevance predicates
// ============================================================================

/// Any instance is relevant.
#[must_use]
pub fn any_instance(_: &ObservedResource) -> bool {
    true
}

/// The instance routes through the gateway `reference` (`namespace/name`).
///
/// `APIRule`s reference a gateway in `spec.gateway`, `VirtualService`s list
/// gateways in `spec.gateways`. Other kinds never reference a gateway.
#[must_use]
pub fn references_gateway(observed: &ObservedResource, reference: &str) -> bool {
    let spec = &observed.object.data["spec"];
    match observed.id.gvk.kind.as_str() {
        "APIRule" => spec["gateway"].as_str() == Some(reference),
        "VirtualService" => spec["gateways"]
            .as_array()
            .is_some_and(|gateways| gateways.iter().any(|g| g.as_str() == Some(reference))),
        _ => false,
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod catalog_tests;
