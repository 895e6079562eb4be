// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        combine, conditions_equal, create_condition, next_status, persist_status,
        update_condition_in_memory, Status,
    };
    use crate::cluster::{from_dynamic, kinds, ResourceId};
    use crate::crd::{APIGateway, APIGatewayStatus, State};
    use crate::errors::ReconcileError;
    use crate::reconcilers::retry::ConflictRetry;
    use crate::status_reasons::{
        KYMA_GATEWAY_DELETION_BLOCKED, RECONCILE_FAILED, RECONCILE_SUCCEEDED,
    };
    use crate::testing::{dynamic, FakeCluster};
    use serde_json::json;
    use std::time::Duration;

    const OLD_TIME: &str = "2020-01-01T00:00:00+00:00";

    fn gateway_id() -> ResourceId {
        ResourceId::cluster(kinds::api_gateway(), "default")
    }

    fn seed_gateway(fake: &FakeCluster, status: serde_json::Value) {
        fake.insert(
            &kinds::api_gateway(),
            dynamic(
                &kinds::api_gateway(),
                None,
                "default",
                json!({ "spec": {}, "status": status }),
            ),
        );
    }

    fn stored_status(fake: &FakeCluster) -> APIGatewayStatus {
        let obj = fake.object(&gateway_id()).unwrap();
        let gateway: APIGateway = from_dynamic("test", &obj).unwrap();
        gateway.status.unwrap()
    }

    fn immediate(attempts: u32) -> ConflictRetry {
        ConflictRetry {
            attempts,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
        }
    }

    fn warning(message: &str) -> Status {
        Status::warning(
            ReconcileError::Environment(message.to_string()),
            message,
            KYMA_GATEWAY_DELETION_BLOCKED,
            "",
        )
    }

    fn error(message: &str) -> Status {
        Status::error(ReconcileError::Environment(message.to_string()), RECONCILE_FAILED)
    }

    fn build(kind: &str) -> Status {
        match kind {
            "warning" => warning("x"),
            "error" => error("y"),
            _ => Status::ready(RECONCILE_SUCCEEDED),
        }
    }

    #[test]
    fn test_combine_picks_error_regardless_of_order() {
        let orders = [
            ["ready", "warning", "error"],
            ["error", "warning", "ready"],
            ["warning", "error", "ready"],
            ["ready", "error", "warning"],
        ];
        for order in orders {
            let combined = combine(order.iter().map(|k| build(k)));
            assert_eq!(combined.state(), State::Error, "order {order:?}");
            assert_eq!(combined.description(), "y");
            assert!(combined.cause().is_some());
        }
    }

    #[test]
    fn test_combine_ready_with_ready_is_ready() {
        let combined = combine([
            Status::ready(RECONCILE_SUCCEEDED),
            Status::ready(RECONCILE_SUCCEEDED),
        ]);
        assert_eq!(combined.state(), State::Ready);
        assert!(combined.cause().is_none());
    }

    #[test]
    fn test_combine_empty_is_ready() {
        assert_eq!(combine(Vec::new()).state(), State::Ready);
    }

    #[test]
    fn test_combine_joins_messages_of_equal_severity_in_order() {
        let combined = combine([warning("first"), Status::ready(RECONCILE_SUCCEEDED), warning("second")]);
        assert_eq!(combined.state(), State::Warning);
        assert_eq!(combined.description(), "first; second");
        assert_eq!(
            combined.condition().unwrap().reason.as_deref(),
            Some(KYMA_GATEWAY_DELETION_BLOCKED.reason)
        );
    }

    #[test]
    fn test_warning_and_error_carry_cause_ready_does_not() {
        assert!(warning("w").cause().is_some());
        assert!(error("e").cause().is_some());
        assert!(Status::ready(RECONCILE_SUCCEEDED).cause().is_none());
        assert!(Status::processing().cause().is_none());
    }

    #[test]
    fn test_update_condition_preserves_transition_time_when_status_unchanged() {
        let mut conditions = vec![create_condition("Ready", "True", "Old", "old")];
        conditions[0].last_transition_time = Some(OLD_TIME.to_string());

        update_condition_in_memory(&mut conditions, &create_condition("Ready", "True", "New", "new"));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(OLD_TIME));
        assert_eq!(conditions[0].reason.as_deref(), Some("New"));

        update_condition_in_memory(&mut conditions, &create_condition("Ready", "False", "Bad", "bad"));
        assert_ne!(conditions[0].last_transition_time.as_deref(), Some(OLD_TIME));
    }

    #[test]
    fn test_conditions_equal_ignores_transition_time() {
        let a = create_condition("Ready", "True", "R", "m");
        let mut b = a.clone();
        b.last_transition_time = Some(OLD_TIME.to_string());
        assert!(conditions_equal(&[a.clone()], &[b]));
        assert!(!conditions_equal(&[a], &[]));
    }

    #[test]
    fn test_next_status_replaces_state_and_merges_condition() {
        let current = APIGatewayStatus {
            state: State::Processing,
            description: "old".to_string(),
            conditions: vec![],
        };
        let next = next_status(&current, &error("boom"));
        assert_eq!(next.state, State::Error);
        assert_eq!(next.description, "boom");
        assert_eq!(next.conditions.len(), 1);
        assert_eq!(next.conditions[0].status, "False");
    }

    #[tokio::test]
    async fn test_persist_writes_status() {
        let fake = FakeCluster::new();
        seed_gateway(&fake, json!({}));

        let written = persist_status(
            &fake,
            &gateway_id(),
            &Status::ready(RECONCILE_SUCCEEDED),
            &immediate(1),
        )
        .await
        .unwrap();

        assert!(written);
        let status = stored_status(&fake);
        assert_eq!(status.state, State::Ready);
        assert_eq!(status.conditions[0].reason.as_deref(), Some("ReconcileSucceeded"));
    }

    #[tokio::test]
    async fn test_persist_skips_unchanged_status() {
        let fake = FakeCluster::new();
        seed_gateway(&fake, json!({}));
        let policy = immediate(1);

        persist_status(&fake, &gateway_id(), &Status::ready(RECONCILE_SUCCEEDED), &policy)
            .await
            .unwrap();
        let written = persist_status(&fake, &gateway_id(), &Status::ready(RECONCILE_SUCCEEDED), &policy)
            .await
            .unwrap();

        assert!(!written);
        assert_eq!(fake.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_persist_keeps_transition_time_of_unchanged_condition() {
        let fake = FakeCluster::new();
        seed_gateway(
            &fake,
            json!({
                "state": "Warning",
                "description": "blocked",
                "conditions": [{
                    "type": "Ready",
                    "status": "True",
                    "reason": "KymaGatewayReconcileSucceededReason",
                    "message": "old",
                    "lastTransitionTime": OLD_TIME,
                }],
            }),
        );

        persist_status(&fake, &gateway_id(), &Status::ready(RECONCILE_SUCCEEDED), &immediate(1))
            .await
            .unwrap();

        let status = stored_status(&fake);
        assert_eq!(status.state, State::Ready);
        assert_eq!(status.conditions[0].last_transition_time.as_deref(), Some(OLD_TIME));
    }

    #[tokio::test]
    async fn test_persist_ready_after_warning_clears_description() {
        let fake = FakeCluster::new();
        seed_gateway(
            &fake,
            json!({
                "state": "Warning",
                "description": "There are custom resources that block the deletion of Kyma Gateway",
                "conditions": [],
            }),
        );

        let policy = immediate(1);
        persist_status(&fake, &gateway_id(), &Status::ready(RECONCILE_SUCCEEDED), &policy)
            .await
            .unwrap();

        let status = stored_status(&fake);
        assert_eq!(status.state, State::Ready);
        assert_eq!(status.description, "");

        // Converged: the next pass has nothing to write
        let writes = fake.status_writes();
        persist_status(&fake, &gateway_id(), &Status::ready(RECONCILE_SUCCEEDED), &policy)
            .await
            .unwrap();
        assert_eq!(fake.status_writes(), writes);
    }

    #[tokio::test]
    async fn test_persist_retries_conflicts_within_budget() {
        for n in 0..3 {
            let fake = FakeCluster::new();
            seed_gateway(&fake, json!({}));
            fake.inject_status_conflicts(n);

            persist_status(&fake, &gateway_id(), &error("e"), &immediate(n + 1))
                .await
                .unwrap();

            assert_eq!(fake.status_attempts(), n + 1);
            assert_eq!(stored_status(&fake).state, State::Error);
        }
    }

    #[tokio::test]
    async fn test_persist_fails_when_conflicts_exceed_budget() {
        let fake = FakeCluster::new();
        seed_gateway(&fake, json!({}));
        fake.inject_status_conflicts(3);

        let err = persist_status(&fake, &gateway_id(), &error("e"), &immediate(3))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::ConflictRetriesExhausted { attempts: 3, .. }));
        assert_eq!(fake.status_attempts(), 3);
        assert_eq!(fake.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_persist_on_missing_object_is_not_found() {
        let fake = FakeCluster::new();
        let err = persist_status(&fake, &gateway_id(), &Status::processing(), &immediate(3))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
