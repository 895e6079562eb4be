// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # API Gateway Operator - Kyma API Gateway module for Kubernetes
//!
//! Reconciles the cluster-scoped `APIGateway` custom resource: the shared
//! Kyma ingress gateway with its TLS certificate and DNS entry, and the
//! Ory Oathkeeper proxy.
//!
//! ## Overview
//!
//! - Manifests are rendered from embedded templates and applied idempotently,
//!   with management labels and a disclaimer annotation kept in place
//! - Shared infrastructure is only torn down once no foreign resource uses it
//! - Each feature holds a finalizer on the `APIGateway` for as long as its
//!   resources exist
//! - Feature outcomes are combined into one status, written with
//!   conflict retries
//!
//! ## Modules
//!
//! - [`crd`] - The `APIGateway` custom resource
//! - [`reconcilers`] - Reconciliation pass and features
//! - [`cluster`] - Cluster API abstraction over dynamic objects
//! - [`context`] - Shared state of the controller
//! - [`template`] - Strict manifest template rendering
//! - [`tls`] - Self-signed gateway certificates
//!
//! ## Example
//!
//! ```rust,no_run
//! use api_gateway_operator::crd::{APIGateway, APIGatewaySpec};
//!
//! let gateway = APIGateway::new(
//!     "default",
//!     APIGatewaySpec {
//!         enable_kyma_gateway: Some(true),
//!     },
//! );
//! assert!(gateway.kyma_gateway_enabled());
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod manifests;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod template;
pub mod tls;

#[cfg(test)]
pub mod testing;
