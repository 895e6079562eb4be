// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ory Oathkeeper, the auxiliary authorization proxy.
//!
//! Sized by the cluster profile: evaluation clusters get one small replica,
//! production clusters two larger ones plus a horizontal autoscaler. Alongside
//! the proxy the feature owns its configuration, the access-rule CRD, the
//! maester metrics `PeerAuthentication` and a cron job rotating the signing keys.
//!
//! Teardown never blocks here: user `Rule`s keep the module finalizer, which
//! is released first, so the rule CRD is only deleted once none remain.

use super::catalog::BlockingResource;
use super::finalizers::GuardedFeature;
use super::resources::{apply, delete, DesiredResource};
use super::topology::ResourcePlan;
use crate::cluster::{kinds, ResourceId};
use crate::constants::{
    FINALIZER_ORY_OATHKEEPER, KYMA_NAMESPACE, ORY_OATHKEEPER_API_SERVICE,
    ORY_OATHKEEPER_CONFIG_MAP, ORY_OATHKEEPER_JWKS_ROTATOR, ORY_OATHKEEPER_JWKS_SECRET,
    ORY_OATHKEEPER_MAESTER_PEER_AUTHENTICATION, ORY_OATHKEEPER_NAME, ORY_OATHKEEPER_RULE_CRD,
};
use crate::context::Pass;
use crate::crd::APIGateway;
use crate::errors::ReconcileError;
use crate::manifests;
use crate::status_reasons::{
    ConditionReason, OATHKEEPER_RECONCILE_FAILED, OATHKEEPER_RECONCILE_SUCCEEDED,
};
use async_trait::async_trait;
use tracing::debug;

fn rule_crd_id() -> ResourceId {
    ResourceId::cluster(kinds::custom_resource_definition(), ORY_OATHKEEPER_RULE_CRD)
}

fn config_map_id() -> ResourceId {
    ResourceId::namespaced(kinds::config_map(), KYMA_NAMESPACE, ORY_OATHKEEPER_CONFIG_MAP)
}

fn deployment_id() -> ResourceId {
    ResourceId::namespaced(kinds::deployment(), KYMA_NAMESPACE, ORY_OATHKEEPER_NAME)
}

fn service_id() -> ResourceId {
    ResourceId::namespaced(kinds::service(), KYMA_NAMESPACE, ORY_OATHKEEPER_API_SERVICE)
}

fn autoscaler_id() -> ResourceId {
    ResourceId::namespaced(kinds::horizontal_pod_autoscaler(), KYMA_NAMESPACE, ORY_OATHKEEPER_NAME)
}

fn peer_authentication_id() -> ResourceId {
    ResourceId::namespaced(
        kinds::peer_authentication(),
        KYMA_NAMESPACE,
        ORY_OATHKEEPER_MAESTER_PEER_AUTHENTICATION,
    )
}

/// Service account, role, binding and cron job of the JWKS rotator, in apply order.
fn jwks_rotator_ids() -> [ResourceId; 4] {
    [
        kinds::service_account(),
        kinds::role(),
        kinds::role_binding(),
        kinds::cron_job(),
    ]
    .map(|gvk| ResourceId::namespaced(gvk, KYMA_NAMESPACE, ORY_OATHKEEPER_JWKS_ROTATOR))
}

/// Every resource the proxy needs regardless of profile, in apply order.
///
/// The rule CRD and config come before the deployment that consumes them.
fn desired_resources(plan: &ResourcePlan) -> Vec<DesiredResource> {
    let profile = plan.proxy_profile;
    let (cpu_request, memory_request, cpu_limit, memory_limit) = profile.resources();
    let [service_account, role, role_binding, cron_job] = jwks_rotator_ids();

    vec![
        DesiredResource::new(rule_crd_id(), manifests::OATHKEEPER_RULE_CRD),
        DesiredResource::new(config_map_id(), manifests::OATHKEEPER_CONFIG)
            .param("Domain", plan.domain.clone()),
        DesiredResource::new(deployment_id(), manifests::OATHKEEPER_DEPLOYMENT)
            .param("Replicas", profile.replicas().to_string())
            .param("CpuRequest", cpu_request)
            .param("MemoryRequest", memory_request)
            .param("CpuLimit", cpu_limit)
            .param("MemoryLimit", memory_limit),
        DesiredResource::new(service_id(), manifests::OATHKEEPER_SERVICE),
        DesiredResource::new(
            peer_authentication_id(),
            manifests::OATHKEEPER_MAESTER_PEER_AUTHENTICATION,
        ),
        DesiredResource::new(service_account, manifests::JWKS_ROTATOR_SERVICE_ACCOUNT)
            .param("Name", ORY_OATHKEEPER_JWKS_ROTATOR),
        DesiredResource::new(role, manifests::JWKS_ROTATOR_ROLE)
            .param("Name", ORY_OATHKEEPER_JWKS_ROTATOR)
            .param("SecretName", ORY_OATHKEEPER_JWKS_SECRET)
            .param("OathkeeperName", ORY_OATHKEEPER_NAME),
        DesiredResource::new(role_binding, manifests::JWKS_ROTATOR_ROLE_BINDING)
            .param("Name", ORY_OATHKEEPER_JWKS_ROTATOR),
        DesiredResource::new(cron_job, manifests::JWKS_ROTATOR_CRON_JOB)
            .param("Name", ORY_OATHKEEPER_JWKS_ROTATOR)
            .param("SecretName", ORY_OATHKEEPER_JWKS_SECRET)
            .param("OathkeeperName", ORY_OATHKEEPER_NAME),
    ]
}

/// The `kyma-system/ory-oathkeeper` feature. Always enabled.
pub struct Oathkeeper;

#[async_trait]
impl GuardedFeature for Oathkeeper {
    fn finalizer(&self) -> &'static str {
        FINALIZER_ORY_OATHKEEPER
    }

    fn subject(&self) -> &'static str {
        "Ory Oathkeeper"
    }

    fn is_enabled(&self, _: &APIGateway) -> bool {
        true
    }

    fn succeeded(&self) -> ConditionReason {
        OATHKEEPER_RECONCILE_SUCCEEDED
    }

    fn failed(&self) -> ConditionReason {
        OATHKEEPER_RECONCILE_FAILED
    }

    // Never reached: the proxy has no blockers.
    fn blocked(&self) -> ConditionReason {
        OATHKEEPER_RECONCILE_FAILED
    }

    fn blocked_description(&self, _: &[BlockingResource]) -> String {
        String::new()
    }

    async fn blocking_resources(
        &self,
        _: &Pass<'_>,
    ) -> Result<Vec<BlockingResource>, ReconcileError> {
        Ok(Vec::new())
    }

    async fn converge(&self, pass: &Pass<'_>) -> Result<(), ReconcileError> {
        let profile = pass.plan.proxy_profile;
        debug!(?profile, "Reconciling Ory Oathkeeper");

        for desired in desired_resources(pass.plan) {
            apply(pass.client, &desired).await?;
        }

        if pass.plan.proxy_autoscaler {
            let (min_replicas, max_replicas) = profile.autoscaling();
            apply(
                pass.client,
                &DesiredResource::new(autoscaler_id(), manifests::OATHKEEPER_HPA)
                    .param("MinReplicas", min_replicas.to_string())
                    .param("MaxReplicas", max_replicas.to_string()),
            )
            .await?;
        } else {
            delete(pass.client, &autoscaler_id()).await?;
        }
        Ok(())
    }

    async fn teardown(&self, pass: &Pass<'_>) -> Result<(), ReconcileError> {
        let mut owned = vec![autoscaler_id()];
        owned.extend(desired_resources(pass.plan).into_iter().rev().map(|d| d.id));
        for id in owned {
            delete(pass.client, &id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "oathkeeper_tests.rs"]
mod oathkeeper_tests;
