// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard status condition reasons for the `APIGateway` resource.
//!
//! The module reports a single encompassing `type: Ready` condition. Each
//! [`ConditionReason`] pairs a programmatic `CamelCase` reason with its default
//! message and the condition status it implies.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   state: Warning
//!   description: "There are custom resources that block the deletion of Kyma Gateway. Please take a look at kyma-system/api-gateway-controller-manager logs to see more information about the warning"
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: KymaGatewayDeletionBlockedReason
//!       message: "Kyma Gateway deletion blocked because of the existing custom resources: default/api-rule (1 in total)"
//! ```

// ============================================================================
// Condition Types and Status Values
// ============================================================================

/// The single condition type reported on `APIGateway`
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status for a satisfied condition
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition status for an unsatisfied condition
pub const CONDITION_STATUS_FALSE: &str = "False";

/// Condition status while the outcome is not yet known
pub const CONDITION_STATUS_UNKNOWN: &str = "Unknown";

/// A condition reason with its default message and implied status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionReason {
    /// Programmatic `CamelCase` identifier
    pub reason: &'static str,
    /// Default human-readable message
    pub message: &'static str,
    /// Condition status this reason implies
    pub status: &'static str,
}

impl ConditionReason {
    /// Default message followed by `detail`, separated by `": "`.
    #[must_use]
    pub fn message_with(&self, detail: &str) -> String {
        if detail.is_empty() {
            self.message.to_string()
        } else {
            format!("{}: {detail}", self.message)
        }
    }
}

// ============================================================================
// Module Reasons
// ============================================================================

/// A reconciliation pass is running.
pub const RECONCILE_PROCESSING: ConditionReason = ConditionReason {
    reason: "ReconcileProcessing",
    message: "Reconcile processing",
    status: CONDITION_STATUS_UNKNOWN,
};

/// The pass converged.
pub const RECONCILE_SUCCEEDED: ConditionReason = ConditionReason {
    reason: "ReconcileSucceeded",
    message: "Reconciliation succeeded",
    status: CONDITION_STATUS_TRUE,
};

/// The pass failed for a reason not covered by a more specific reason.
pub const RECONCILE_FAILED: ConditionReason = ConditionReason {
    reason: "ReconcileFailedReason",
    message: "Reconciliation failed",
    status: CONDITION_STATUS_FALSE,
};

/// Another, older `APIGateway` owns the module.
pub const OLDER_CR_EXISTS: ConditionReason = ConditionReason {
    reason: "OlderCRExistsReason",
    message: "Reconciliation failed",
    status: CONDITION_STATUS_FALSE,
};

/// A required CRD is not installed.
pub const DEPENDENCIES_MISSING: ConditionReason = ConditionReason {
    reason: "DependenciesMissingReason",
    message: "Module dependencies missing",
    status: CONDITION_STATUS_FALSE,
};

/// User `APIRule`s or Oathkeeper `Rule`s still exist.
pub const DELETION_BLOCKED_EXISTING_RESOURCES: ConditionReason = ConditionReason {
    reason: "DeletionBlockedExistingResources",
    message: "API Gateway deletion blocked because of the existing custom resources",
    status: CONDITION_STATUS_FALSE,
};

// ============================================================================
// Kyma Gateway Reasons
// ============================================================================

pub const KYMA_GATEWAY_RECONCILE_SUCCEEDED: ConditionReason = ConditionReason {
    reason: "KymaGatewayReconcileSucceededReason",
    message: "Kyma Gateway reconciliation succeeded",
    status: CONDITION_STATUS_TRUE,
};

pub const KYMA_GATEWAY_RECONCILE_FAILED: ConditionReason = ConditionReason {
    reason: "KymaGatewayReconcileFailedReason",
    message: "Kyma Gateway reconciliation failed",
    status: CONDITION_STATUS_FALSE,
};

/// Foreign resources still reference `kyma-system/kyma-gateway`.
pub const KYMA_GATEWAY_DELETION_BLOCKED: ConditionReason = ConditionReason {
    reason: "KymaGatewayDeletionBlockedReason",
    message: "Kyma Gateway deletion blocked because of the existing custom resources",
    status: CONDITION_STATUS_FALSE,
};

// ============================================================================
// Ory Oathkeeper Reasons
// ============================================================================

pub const OATHKEEPER_RECONCILE_SUCCEEDED: ConditionReason = ConditionReason {
    reason: "OathkeeperReconcileSucceeded",
    message: "Ory Oathkeeper reconciliation succeeded",
    status: CONDITION_STATUS_TRUE,
};

pub const OATHKEEPER_RECONCILE_FAILED: ConditionReason = ConditionReason {
    reason: "OathkeeperReconcileFailed",
    message: "Ory Oathkeeper reconciliation failed",
    status: CONDITION_STATUS_FALSE,
};

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
