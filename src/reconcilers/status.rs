// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Outcome values of sub-reconciliations and the only write path to
//! `APIGateway.status`.
//!
//! Every sub-reconciliation reports a [`Status`]. The orchestrator folds them
//! with [`combine`] and hands the result to [`persist_status`], which re-reads
//! the stored object, merges the condition, and writes the status subresource
//! back. A conflicting write redoes the whole read-modify-write with backoff.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (always `Ready` here)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition status changed

use super::retry::{retry_on_conflict, ConflictRetry};
use crate::cluster::{from_dynamic, ClusterClient, ResourceId};
use crate::crd::{APIGateway, APIGatewayStatus, Condition, State};
use crate::errors::ReconcileError;
use crate::status_reasons::{ConditionReason, CONDITION_TYPE_READY, RECONCILE_PROCESSING, RECONCILE_SUCCEEDED};
use chrono::Utc;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Example
///
/// ```rust
/// # use api_gateway_operator::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "ReconcileSucceeded", "Reconciled");
/// assert_eq!(condition.r#type, "Ready");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Update or add a condition in a conditions list, keyed by type.
///
/// The `lastTransitionTime` of an existing condition is preserved when its
/// status does not change. No API call is made.
pub fn update_condition_in_memory(conditions: &mut Vec<Condition>, condition: &Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        let last_transition_time = if existing.status == condition.status {
            existing
                .last_transition_time
                .clone()
                .or_else(|| condition.last_transition_time.clone())
        } else {
            condition.last_transition_time.clone()
        };

        existing.status.clone_from(&condition.status);
        existing.reason.clone_from(&condition.reason);
        existing.message.clone_from(&condition.message);
        existing.last_transition_time = last_transition_time;
    } else {
        conditions.push(condition.clone());
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|c| {
            c.r#type == new_cond.r#type
                && c.status == new_cond.status
                && c.reason == new_cond.reason
                && c.message == new_cond.message
        })
    })
}

fn ready_condition(reason: ConditionReason, message: String) -> Condition {
    create_condition(CONDITION_TYPE_READY, reason.status, reason.reason, &message)
}

/// Outcome of one sub-reconciliation, or of a whole pass after [`combine`].
///
/// `Warning` and `Error` always carry the error that caused them; `Ready` never does.
#[derive(Debug)]
pub struct Status {
    state: State,
    description: String,
    condition: Option<Condition>,
    cause: Option<ReconcileError>,
}

impl Status {
    #[must_use]
    pub fn ready(reason: ConditionReason) -> Self {
        Self {
            state: State::Ready,
            description: String::new(),
            condition: Some(ready_condition(reason, reason.message.to_string())),
            cause: None,
        }
    }

    #[must_use]
    pub fn processing() -> Self {
        Self {
            state: State::Processing,
            description: String::new(),
            condition: Some(ready_condition(
                RECONCILE_PROCESSING,
                RECONCILE_PROCESSING.message.to_string(),
            )),
            cause: None,
        }
    }

    #[must_use]
    pub fn deleting() -> Self {
        Self {
            state: State::Deleting,
            description: String::new(),
            condition: Some(ready_condition(
                RECONCILE_PROCESSING,
                RECONCILE_PROCESSING.message_with("deletion in progress"),
            )),
            cause: None,
        }
    }

    /// Progress is deliberately deferred. `detail` is appended to the reason's message.
    #[must_use]
    pub fn warning(
        cause: ReconcileError,
        description: impl Into<String>,
        reason: ConditionReason,
        detail: &str,
    ) -> Self {
        Self {
            state: State::Warning,
            description: description.into(),
            condition: Some(ready_condition(reason, reason.message_with(detail))),
            cause: Some(cause),
        }
    }

    /// A sub-reconciliation failed. The description is the cause's message.
    #[must_use]
    pub fn error(cause: ReconcileError, reason: ConditionReason) -> Self {
        let description = cause.to_string();
        Self {
            state: State::Error,
            condition: Some(ready_condition(reason, reason.message_with(&description))),
            description,
            cause: Some(cause),
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    #[must_use]
    pub fn cause(&self) -> Option<&ReconcileError> {
        self.cause.as_ref()
    }

    #[must_use]
    pub fn into_cause(self) -> Option<ReconcileError> {
        self.cause
    }

    /// `true` for `Warning` and `Error`.
    #[must_use]
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self.state, State::Warning | State::Error)
    }
}

/// Fold sub-reconciliation outcomes into one.
///
/// The most severe state wins (Error > Warning > Deleting > Processing > Ready).
/// Among the outcomes sharing that state, descriptions are joined with `"; "`
/// in input order and the first condition and cause are kept. No outcomes
/// means `Ready`.
#[must_use]
pub fn combine(statuses: impl IntoIterator<Item = Status>) -> Status {
    let statuses: Vec<Status> = statuses.into_iter().collect();
    let Some(top) = statuses.iter().map(|s| s.state.severity()).max() else {
        return Status::ready(RECONCILE_SUCCEEDED);
    };

    let mut combined: Option<Status> = None;
    for status in statuses.into_iter().filter(|s| s.state.severity() == top) {
        match combined.as_mut() {
            None => combined = Some(status),
            Some(acc) => {
                if !status.description.is_empty() {
                    if !acc.description.is_empty() {
                        acc.description.push_str("; ");
                    }
                    acc.description.push_str(&status.description);
                }
                if acc.condition.is_none() {
                    acc.condition = status.condition;
                }
                if acc.cause.is_none() {
                    acc.cause = status.cause;
                }
            }
        }
    }

    combined.unwrap_or_else(|| Status::ready(RECONCILE_SUCCEEDED))
}

/// The status `current` becomes once `status` is applied to it.
#[must_use]
pub fn next_status(current: &APIGatewayStatus, status: &Status) -> APIGatewayStatus {
    let mut conditions = current.conditions.clone();
    if let Some(condition) = &status.condition {
        update_condition_in_memory(&mut conditions, condition);
    }
    APIGatewayStatus {
        state: status.state,
        description: status.description.clone(),
        conditions,
    }
}

fn status_unchanged(current: &APIGatewayStatus, next: &APIGatewayStatus) -> bool {
    current.state == next.state
        && current.description == next.description
        && conditions_equal(&current.conditions, &next.conditions)
}

async fn write_status(
    client: &dyn ClusterClient,
    id: &ResourceId,
    status: &Status,
) -> Result<bool, ReconcileError> {
    let resource = id.to_string();
    let mut stored = client.get(id).await?;
    let gateway: APIGateway = from_dynamic(&resource, &stored)?;
    let current = gateway.status.unwrap_or_default();
    let next = next_status(&current, status);

    if status_unchanged(&current, &next) {
        debug!(resource = %id, state = %next.state, "Status unchanged, skipping write");
        return Ok(false);
    }

    stored.data["status"] =
        serde_json::to_value(&next).map_err(|source| ReconcileError::Serialization {
            resource: resource.clone(),
            source,
        })?;
    client.replace_status(id, &stored).await?;
    debug!(resource = %id, state = %next.state, "Persisted status");
    Ok(true)
}

/// Write `status` to the stored `APIGateway`, retrying the full
/// read-modify-write on conflicts. Returns whether a write happened.
///
/// # Errors
///
/// Returns [`ReconcileError::ConflictRetriesExhausted`] after `policy.attempts`
/// conflicting attempts, or the first other failure.
pub async fn persist_status(
    client: &dyn ClusterClient,
    id: &ResourceId,
    status: &Status,
    policy: &ConflictRetry,
) -> Result<bool, ReconcileError> {
    retry_on_conflict(policy, &id.to_string(), || write_status(client, id, status)).await
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
