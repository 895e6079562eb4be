// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer-guarded features of the `APIGateway`.
//!
//! Each feature of the module owns one finalizer token on the `APIGateway`.
//! The token is present for exactly as long as the feature's resources may
//! exist:
//!
//! ```text
//! NoFinalizer --enabled, not deleting--> Active
//! Active --disabled or deleting--> PendingDeletion
//! PendingDeletion --foreign resources found--> BlockedDeletion (Warning, token kept)
//! PendingDeletion --nothing found--> teardown, then token removed
//! ```
//!
//! The token is added before any owned resource is created and removed only
//! after every owned resource is deleted. Both updates are single writes: a
//! conflict fails the pass and the next pass redoes the step.
//!
//! # Example
//!
//! ```rust,ignore
//! use api_gateway_operator::reconcilers::finalizers::{reconcile_feature, GuardedFeature};
//!
//! struct Dashboard;
//!
//! #[async_trait::async_trait]
//! impl GuardedFeature for Dashboard {
//!     fn finalizer(&self) -> &'static str { "example.com/dashboard" }
//!     // ...
//! }
//!
//! let status = reconcile_feature(&Dashboard, &pass).await;
//! ```

use super::catalog::BlockingResource;
use super::status::Status;
use crate::cluster::{ClusterClient, ResourceId};
use crate::constants::MAX_BLOCKING_RESOURCES_IN_MESSAGE;
use crate::context::Pass;
use crate::crd::APIGateway;
use crate::errors::ReconcileError;
use crate::metrics::record_blocking_resources;
use crate::status_reasons::ConditionReason;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Add `finalizer` to the stored object if missing. Returns whether it was added.
///
/// # Errors
///
/// Returns the read or write failure, including a conflict.
pub async fn ensure_finalizer(
    client: &dyn ClusterClient,
    id: &ResourceId,
    finalizer: &str,
) -> Result<bool, ReconcileError> {
    let mut obj = client.get(id).await?;
    let finalizers = obj.metadata.finalizers.get_or_insert_with(Vec::new);
    if finalizers.iter().any(|f| f == finalizer) {
        return Ok(false);
    }

    finalizers.push(finalizer.to_string());
    client.replace(id, &obj).await?;
    info!(resource = %id, finalizer, "Added finalizer");
    Ok(true)
}

/// Remove `finalizer` from the stored object if present. An object that is
/// already gone counts as done. Returns whether it was removed.
///
/// # Errors
///
/// Returns the read or write failure, including a conflict.
pub async fn remove_finalizer(
    client: &dyn ClusterClient,
    id: &ResourceId,
    finalizer: &str,
) -> Result<bool, ReconcileError> {
    let mut obj = match client.get(id).await {
        Ok(obj) => obj,
        Err(e) if e.is_not_found() => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let Some(finalizers) = obj.metadata.finalizers.as_mut() else {
        return Ok(false);
    };
    if !finalizers.iter().any(|f| f == finalizer) {
        return Ok(false);
    }

    finalizers.retain(|f| f != finalizer);
    match client.replace(id, &obj).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Ok(false),
        Err(e) => return Err(e.into()),
    }
    info!(resource = %id, finalizer, "Removed finalizer");
    Ok(true)
}

/// A feature of the module whose resources are guarded by a finalizer.
#[async_trait]
pub trait GuardedFeature: Send + Sync {
    /// Finalizer token owned by this feature.
    fn finalizer(&self) -> &'static str;

    /// Human name used in messages, e.g. `Kyma Gateway`.
    fn subject(&self) -> &'static str;

    /// Whether the `APIGateway` spec enables the feature.
    fn is_enabled(&self, gateway: &APIGateway) -> bool;

    fn succeeded(&self) -> ConditionReason;

    fn failed(&self) -> ConditionReason;

    fn blocked(&self) -> ConditionReason;

    /// Status description shown while deletion is blocked by `blockers`.
    fn blocked_description(&self, blockers: &[BlockingResource]) -> String;

    /// Foreign resources that must disappear before teardown.
    async fn blocking_resources(
        &self,
        pass: &Pass<'_>,
    ) -> Result<Vec<BlockingResource>, ReconcileError>;

    /// Drive the owned resources to the plan.
    async fn converge(&self, pass: &Pass<'_>) -> Result<(), ReconcileError>;

    /// Delete every owned resource. Must be idempotent.
    async fn teardown(&self, pass: &Pass<'_>) -> Result<(), ReconcileError>;
}

/// `"a, b, c (3 in total)"` listing at most [`MAX_BLOCKING_RESOURCES_IN_MESSAGE`]
/// blockers, with `" and N more"` before the total when some were left out.
#[must_use]
pub fn summarize_blockers(blockers: &[BlockingResource]) -> String {
    if blockers.is_empty() {
        return String::new();
    }
    let mut summary = blockers
        .iter()
        .take(MAX_BLOCKING_RESOURCES_IN_MESSAGE)
        .map(BlockingResource::qualified_name)
        .collect::<Vec<_>>()
        .join(", ");
    if blockers.len() > MAX_BLOCKING_RESOURCES_IN_MESSAGE {
        summary.push_str(&format!(
            " and {} more",
            blockers.len() - MAX_BLOCKING_RESOURCES_IN_MESSAGE
        ));
    }
    summary.push_str(&format!(" ({} in total)", blockers.len()));
    summary
}

/// Run one feature through its finalizer state machine.
pub async fn reconcile_feature(feature: &dyn GuardedFeature, pass: &Pass<'_>) -> Status {
    match drive(feature, pass).await {
        Ok(status) => status,
        Err(e) => {
            warn!(feature = feature.subject(), error = %e, "Feature reconciliation failed");
            Status::error(e, feature.failed())
        }
    }
}

async fn drive(feature: &dyn GuardedFeature, pass: &Pass<'_>) -> Result<Status, ReconcileError> {
    let gateway = pass.gateway;
    let finalizer = feature.finalizer();
    let wanted = feature.is_enabled(gateway) && !gateway.is_being_deleted();

    if wanted {
        if !gateway.has_finalizer(finalizer) {
            ensure_finalizer(pass.client, pass.gateway_id, finalizer).await?;
        }
        feature.converge(pass).await?;
        return Ok(Status::ready(feature.succeeded()));
    }

    if !gateway.has_finalizer(finalizer) {
        debug!(feature = feature.subject(), "Feature inactive and not guarded");
        return Ok(Status::ready(feature.succeeded()));
    }

    let blockers = feature.blocking_resources(pass).await?;
    record_blocking_resources(finalizer, blockers.len());
    if !blockers.is_empty() {
        for blocker in &blockers {
            warn!(feature = feature.subject(), resource = %blocker, "Resource blocks deletion");
        }
        let detail = summarize_blockers(&blockers);
        return Ok(Status::warning(
            ReconcileError::DeletionBlocked {
                subject: feature.subject().to_string(),
                count: blockers.len(),
            },
            feature.blocked_description(&blockers),
            feature.blocked(),
            &detail,
        ));
    }

    feature.teardown(pass).await?;
    remove_finalizer(pass.client, pass.gateway_id, finalizer).await?;
    info!(feature = feature.subject(), "Feature torn down");
    Ok(Status::ready(feature.succeeded()))
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
