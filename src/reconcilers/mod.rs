// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the `APIGateway` module.
//!
//! # Reconciliation Architecture
//!
//! A pass follows the standard Kubernetes controller pattern:
//!
//! 1. **Discover** - Read environment facts and resolve them into a [`topology::ResourcePlan`]
//! 2. **Guard** - Each feature owns a finalizer on the `APIGateway` ([`finalizers`])
//! 3. **Converge** - Render and apply the feature's manifests ([`resources`])
//! 4. **Protect** - Before teardown, scan for foreign resources still in use ([`catalog`])
//! 5. **Status** - Combine feature outcomes and persist them ([`status`])
//!
//! # Features
//!
//! - [`module_guard`] - Blocks module deletion while user rules exist
//! - [`kyma_gateway`] - Shared Kyma gateway, TLS certificate and DNS entry
//! - [`oathkeeper`] - Ory Oathkeeper proxy sized by the cluster profile
//!
//! # Example
//!
//! ```rust,no_run
//! use api_gateway_operator::context::Context;
//! use api_gateway_operator::reconcilers::reconcile_apigateway;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(ctx: &Context) -> Result<(), api_gateway_operator::errors::ReconcileError> {
//!     let outcome = reconcile_apigateway(ctx, "default", CancellationToken::new()).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod apigateway;
pub mod catalog;
pub mod finalizers;
pub mod kyma_gateway;
pub mod module_guard;
pub mod oathkeeper;
pub mod resources;
pub mod retry;
pub mod status;
pub mod topology;

pub use apigateway::{reconcile_apigateway, ReconcileOutcome};
