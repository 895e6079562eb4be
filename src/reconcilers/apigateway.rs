// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `APIGateway` reconciliation pass.
//!
//! One pass:
//!
//! 1. Load the `APIGateway`; stop if it is gone.
//! 2. Only the oldest `APIGateway` in the cluster reconciles the module; every
//!    other one is marked `Error` and left alone until it changes.
//! 3. Persist `Processing` (or `Deleting`).
//! 4. Discover the environment and stop with `Warning` if a required CRD is missing.
//! 5. Run the finalizer-guarded features in order and combine their statuses.
//! 6. Persist the combined status unless the object has been finalized.

use super::finalizers::{reconcile_feature, GuardedFeature};
use super::kyma_gateway::KymaGateway;
use super::module_guard::ModuleGuard;
use super::oathkeeper::Oathkeeper;
use super::retry::ConflictRetry;
use super::status::{combine, persist_status, Status};
use super::topology::{discover_facts, resolve};
use crate::cluster::{from_dynamic, kinds, ClusterClient, ResourceId};
use crate::context::{Context, Pass};
use crate::crd::{APIGateway, State};
use crate::errors::ReconcileError;
use crate::metrics::{
    record_reconciliation_error, record_reconciliation_skipped, record_reconciliation_success,
    record_reconciliation_warning,
};
use crate::status_reasons::{DEPENDENCIES_MISSING, OLDER_CR_EXISTS, RECONCILE_FAILED};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RESOURCE_TYPE: &str = "APIGateway";

/// How a pass ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Everything converged.
    Ready,
    /// Progress is deferred (blocked deletion, missing dependency).
    Warning,
    /// Another, older `APIGateway` owns the module.
    NotResponsible,
    /// The object no longer exists.
    Gone,
    /// The last finalizer was removed; the object is being dropped by the API server.
    Deleted,
}

/// Features in the order they are reconciled.
fn features() -> [&'static dyn GuardedFeature; 3] {
    [&ModuleGuard, &KymaGateway, &Oathkeeper]
}

/// Reconcile the `APIGateway` called `name`.
///
/// Every cluster call of the pass observes `cancel`.
///
/// # Errors
///
/// Returns the cause of an `Error` status (after persisting it), or any
/// failure to read the object or persist status.
pub async fn reconcile_apigateway(
    ctx: &Context,
    name: &str,
    cancel: CancellationToken,
) -> Result<ReconcileOutcome, ReconcileError> {
    let start = Instant::now();
    let client = ctx.cancellable_client(cancel);

    let result = run_pass(ctx, &client, name).await;

    let duration = start.elapsed();
    match &result {
        Ok(ReconcileOutcome::Ready | ReconcileOutcome::Deleted) => {
            record_reconciliation_success(RESOURCE_TYPE, duration);
        }
        Ok(ReconcileOutcome::Warning) => record_reconciliation_warning(RESOURCE_TYPE, duration),
        Ok(ReconcileOutcome::NotResponsible | ReconcileOutcome::Gone) => {
            record_reconciliation_skipped(RESOURCE_TYPE, duration);
        }
        Err(_) => record_reconciliation_error(RESOURCE_TYPE, duration),
    }
    result
}

/// Name of the `APIGateway` that reconciles the module: the oldest one,
/// ties broken by name. Objects without a creation timestamp sort last.
async fn responsible_gateway(client: &dyn ClusterClient) -> Result<Option<String>, ReconcileError> {
    let items = client.list(&kinds::api_gateway(), None).await?;
    let mut gateways = Vec::with_capacity(items.len());
    for obj in &items {
        let gateway: APIGateway = from_dynamic(RESOURCE_TYPE, obj)?;
        gateways.push(gateway);
    }

    Ok(gateways
        .iter()
        .min_by_key(|g| {
            (
                g.created_at().is_none(),
                g.created_at().cloned(),
                g.metadata.name.clone(),
            )
        })
        .and_then(|g| g.metadata.name.clone()))
}

/// Persist `status` and turn it into the pass result.
async fn finish(
    client: &dyn ClusterClient,
    id: &ResourceId,
    status: Status,
    policy: &ConflictRetry,
) -> Result<ReconcileOutcome, ReconcileError> {
    if let Err(e) = persist_status(client, id, &status, policy).await {
        if let Some(cause) = status.cause() {
            warn!(resource = %id, error = %cause, "Could not record failed pass");
        }
        return Err(e);
    }

    let state = status.state();
    match (state, status.into_cause()) {
        (State::Error, Some(cause)) => Err(cause),
        (State::Warning, _) => Ok(ReconcileOutcome::Warning),
        _ => Ok(ReconcileOutcome::Ready),
    }
}

async fn run_pass(
    ctx: &Context,
    client: &dyn ClusterClient,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let id = ResourceId::cluster(kinds::api_gateway(), name);
    let policy = &ctx.settings.conflict_retry;

    let gateway: APIGateway = match client.get(&id).await {
        Ok(obj) => from_dynamic(&id.to_string(), &obj)?,
        Err(e) if e.is_not_found() => {
            debug!(resource = %id, "APIGateway no longer exists");
            return Ok(ReconcileOutcome::Gone);
        }
        Err(e) => return Err(e.into()),
    };
    let deleting = gateway.is_being_deleted();

    if let Some(owner) = responsible_gateway(client).await? {
        if owner != name {
            warn!(resource = %id, %owner, "Another APIGateway reconciles the module");
            let status = Status::error(ReconcileError::NotResponsible { owner }, OLDER_CR_EXISTS);
            persist_status(client, &id, &status, policy).await?;
            return Ok(ReconcileOutcome::NotResponsible);
        }
    }

    let initial = if deleting {
        Status::deleting()
    } else {
        Status::processing()
    };
    persist_status(client, &id, &initial, policy).await?;

    let facts = match discover_facts(client).await {
        Ok(facts) => facts,
        Err(e) => return finish(client, &id, Status::error(e, RECONCILE_FAILED), policy).await,
    };
    if !deleting {
        if let Some(crd) = facts.missing_dependencies.first() {
            warn!(resource = %id, %crd, "Required CRD is not installed");
            let status = Status::warning(
                ReconcileError::MissingDependency { crd: crd.clone() },
                format!(
                    "CRD {crd} is not present. Make sure to install required dependencies for the component"
                ),
                DEPENDENCIES_MISSING,
                crd,
            );
            return finish(client, &id, status, policy).await;
        }
    }

    let plan = resolve(&facts);
    debug!(resource = %id, ?plan, "Resolved resource plan");
    let pass = Pass {
        client,
        catalog: &ctx.catalog,
        tls: &ctx.tls,
        gateway: &gateway,
        gateway_id: &id,
        plan: &plan,
    };

    let mut statuses = Vec::new();
    for feature in features() {
        let status = reconcile_feature(feature, &pass).await;
        let stop = deleting && status.is_unsuccessful();
        statuses.push(status);
        if stop {
            info!(resource = %id, feature = feature.subject(), "Deletion halted");
            break;
        }
    }
    let status = combine(statuses);

    if deleting {
        match client.get(&id).await {
            Ok(obj) if obj.metadata.finalizers.as_ref().is_some_and(|f| !f.is_empty()) => {}
            Ok(_) => {
                info!(resource = %id, "APIGateway finalized");
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(e) if e.is_not_found() => {
                info!(resource = %id, "APIGateway deleted");
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(e) => return Err(e.into()),
        }
    }

    finish(client, &id, status, policy).await
}

#[cfg(test)]
#[path = "apigateway_tests.rs"]
mod apigateway_tests;
