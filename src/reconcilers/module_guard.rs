// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The module-wide finalizer.
//!
//! Owns the `APIRule` CRD. It holds the `APIGateway` back from deletion
//! while user `APIRule`s or Ory Oathkeeper `Rule`s still exist, since those
//! stop working once the module is gone; the CRD is removed only after that.

use super::catalog::{any_instance, find_foreign_resources, BlockingResource};
use super::finalizers::GuardedFeature;
use super::resources::{apply, delete, DesiredResource};
use crate::cluster::{kinds, ResourceId};
use crate::constants::{API_RULE_CRD, FINALIZER_API_GATEWAY};
use crate::context::Pass;
use crate::crd::APIGateway;
use crate::errors::ReconcileError;
use crate::status_reasons::{
    ConditionReason, DELETION_BLOCKED_EXISTING_RESOURCES, RECONCILE_FAILED, RECONCILE_SUCCEEDED,
};
use crate::manifests;
use async_trait::async_trait;

fn api_rule_crd_id() -> ResourceId {
    ResourceId::cluster(kinds::custom_resource_definition(), API_RULE_CRD)
}

/// Finalizer `gateways.operator.kyma-project.io/api-gateway`.
pub struct ModuleGuard;

#[async_trait]
impl GuardedFeature for ModuleGuard {
    fn finalizer(&self) -> &'static str {
        FINALIZER_API_GATEWAY
    }

    fn subject(&self) -> &'static str {
        "API-Gateway CR"
    }

    fn is_enabled(&self, _: &APIGateway) -> bool {
        true
    }

    fn succeeded(&self) -> ConditionReason {
        RECONCILE_SUCCEEDED
    }

    fn failed(&self) -> ConditionReason {
        RECONCILE_FAILED
    }

    fn blocked(&self) -> ConditionReason {
        DELETION_BLOCKED_EXISTING_RESOURCES
    }

    fn blocked_description(&self, blockers: &[BlockingResource]) -> String {
        let api_rules = blockers.iter().any(|b| b.id.gvk == kinds::api_rule());
        let what = if api_rules {
            "APIRule(s)"
        } else {
            "ORY Oathkeeper Rule(s)"
        };
        format!(
            "There are {what} that block the deletion of API-Gateway CR. \
             Please take a look at kyma-system/api-gateway-controller-manager logs \
             to see more information about the warning"
        )
    }

    async fn blocking_resources(
        &self,
        pass: &Pass<'_>,
    ) -> Result<Vec<BlockingResource>, ReconcileError> {
        find_foreign_resources(
            pass.client,
            pass.catalog,
            &[kinds::api_rule(), kinds::oathkeeper_rule()],
            any_instance,
        )
        .await
    }

    async fn converge(&self, pass: &Pass<'_>) -> Result<(), ReconcileError> {
        apply(
            pass.client,
            &DesiredResource::new(api_rule_crd_id(), manifests::API_RULE_CRD),
        )
        .await?;
        Ok(())
    }

    async fn teardown(&self, pass: &Pass<'_>) -> Result<(), ReconcileError> {
        delete(pass.client, &api_rule_crd_id()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "module_guard_tests.rs"]
mod module_guard_tests;
