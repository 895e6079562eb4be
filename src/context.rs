// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared state handed to every reconciliation.
//!
//! [`Context`] is built once at start-up and shared as `Arc<Context>`. It owns
//! the cluster client, the managed-resource catalog, the TLS credential handle
//! and the tunables. Each pass derives a [`Pass`] from it: a borrowed view
//! whose client observes the pass's cancellation token.

use crate::cluster::{CancellableClient, ClusterClient, ResourceId};
use crate::config::ReconcileSettings;
use crate::crd::APIGateway;
use crate::reconcilers::catalog::ManagedResourceCatalog;
use crate::reconcilers::topology::ResourcePlan;
use crate::tls::TlsCredentials;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Process-wide dependencies of the controller.
#[derive(Clone)]
pub struct Context {
    /// Cluster access for all passes
    pub client: Arc<dyn ClusterClient>,

    /// Kinds and instances owned by the module, loaded once at start-up
    pub catalog: Arc<ManagedResourceCatalog>,

    /// Self-signed certificate cache
    pub tls: Arc<TlsCredentials>,

    pub settings: ReconcileSettings,
}

impl Context {
    #[must_use]
    pub fn new(
        client: Arc<dyn ClusterClient>,
        catalog: ManagedResourceCatalog,
        tls: Arc<TlsCredentials>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            client,
            catalog: Arc::new(catalog),
            tls,
            settings,
        }
    }

    /// Client whose calls fail fast once `token` is cancelled.
    #[must_use]
    pub fn cancellable_client(&self, token: CancellationToken) -> CancellableClient {
        CancellableClient::new(Arc::clone(&self.client), token)
    }
}

/// Inputs of one sub-reconciliation.
#[derive(Clone, Copy)]
pub struct Pass<'a> {
    pub client: &'a dyn ClusterClient,
    pub catalog: &'a ManagedResourceCatalog,
    pub tls: &'a TlsCredentials,
    /// The `APIGateway` as read at the start of the pass
    pub gateway: &'a APIGateway,
    pub gateway_id: &'a ResourceId,
    pub plan: &'a ResourcePlan,
}
