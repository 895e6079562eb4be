// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the API Gateway module.
//!
//! [`APIGateway`] is a cluster-scoped singleton. Only the oldest instance in
//! the cluster drives the module; any later instance is reported as an error
//! and left alone.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: operator.kyma-project.io/v1alpha1
//! kind: APIGateway
//! metadata:
//!   name: default
//! spec:
//!   enableKymaGateway: true
//! ```

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. The module reports a single `Ready` condition.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Externally observable state of an `APIGateway`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
pub enum State {
    /// Every sub-reconciliation converged.
    Ready,
    /// A pass is in progress.
    #[default]
    Processing,
    /// A sub-reconciliation failed; the pass is retried.
    Error,
    /// The resource is being deleted.
    Deleting,
    /// Progress is deferred but nothing is broken (e.g. deletion blocked by user resources).
    Warning,
}

impl State {
    /// Rank used when combining sub-reconciliation outcomes; higher wins.
    #[must_use]
    pub fn severity(self) -> u8 {
        match self {
            State::Ready => 0,
            State::Processing => 1,
            State::Deleting => 2,
            State::Warning => 3,
            State::Error => 4,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Ready => "Ready",
            State::Processing => "Processing",
            State::Error => "Error",
            State::Deleting => "Deleting",
            State::Warning => "Warning",
        };
        f.write_str(s)
    }
}

/// `APIGateway` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct APIGatewayStatus {
    /// Overall state of the module.
    #[serde(default)]
    pub state: State,

    /// Human-readable description of the state.
    ///
    /// Always serialized: status is written as a merge patch, so an omitted
    /// field would keep the previous description.
    #[serde(default)]
    pub description: String,

    /// Standard Kubernetes conditions, keyed by type.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `APIGateway` configures the API Gateway module of a cluster.
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.kyma-project.io/v1alpha1
/// kind: APIGateway
/// metadata:
///   name: default
/// spec:
///   enableKymaGateway: true
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "operator.kyma-project.io",
    version = "v1alpha1",
    kind = "APIGateway",
    plural = "apigateways",
    shortname = "ag",
    doc = "APIGateway configures the API Gateway module. Only the oldest APIGateway in the cluster is reconciled.",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "APIGatewayStatus")]
#[serde(rename_all = "camelCase")]
pub struct APIGatewaySpec {
    /// Deploys the shared Kyma gateway (`kyma-system/kyma-gateway`) and its TLS and DNS satellites.
    ///
    /// Defaults to disabled when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_kyma_gateway: Option<bool>,
}

impl APIGateway {
    /// `true` when the shared Kyma gateway is requested.
    #[must_use]
    pub fn kyma_gateway_enabled(&self) -> bool {
        self.spec.enable_kyma_gateway.unwrap_or(false)
    }

    /// `true` once the deletion marker is set.
    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether `token` is present in the finalizer set.
    #[must_use]
    pub fn has_finalizer(&self, token: &str) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|t| t == token))
    }

    /// Creation timestamp used for singleton ordering.
    #[must_use]
    pub fn created_at(&self) -> Option<&Time> {
        self.metadata.creation_timestamp.as_ref()
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
