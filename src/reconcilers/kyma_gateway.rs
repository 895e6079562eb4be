// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The shared Kyma gateway and its TLS/DNS satellites.
//!
//! Owned resources:
//!
//! - `Gateway` `kyma-system/kyma-gateway` serving `*.<domain>`
//! - `VirtualService` `kyma-system/istio-healthz`
//! - managed branch: Gardener `DNSEntry` `kyma-system/kyma-gateway` and
//!   `Certificate` `istio-system/kyma-tls-cert`
//! - self-signed branch: `Secret` `istio-system/kyma-gateway-certs`
//!
//! The gateway is shared with user workloads, so it is only torn down when no
//! unmanaged `APIRule` or `VirtualService` still routes through it.

use super::catalog::{find_foreign_resources, references_gateway, BlockingResource};
use super::finalizers::GuardedFeature;
use super::resources::{apply, delete, DesiredResource};
use super::topology::CertificateSource;
use crate::cluster::{kinds, ClusterClient, ResourceId};
use crate::constants::{
    FINALIZER_KYMA_GATEWAY, HEALTHZ_VIRTUAL_SERVICE_NAME, ISTIO_NAMESPACE,
    KYMA_CERTIFICATE_NAME, KYMA_DNS_ENTRY_NAME, KYMA_GATEWAY_CERTS_SECRET, KYMA_GATEWAY_NAME,
    KYMA_GATEWAY_REFERENCE, KYMA_NAMESPACE,
};
use crate::context::Pass;
use crate::crd::APIGateway;
use crate::errors::ReconcileError;
use crate::manifests;
use crate::status_reasons::{
    ConditionReason, KYMA_GATEWAY_DELETION_BLOCKED, KYMA_GATEWAY_RECONCILE_FAILED,
    KYMA_GATEWAY_RECONCILE_SUCCEEDED,
};
use crate::tls::certificate_secret_id;
use async_trait::async_trait;
use tracing::debug;

fn gateway_id() -> ResourceId {
    ResourceId::namespaced(kinds::istio_gateway(), KYMA_NAMESPACE, KYMA_GATEWAY_NAME)
}

fn healthz_id() -> ResourceId {
    ResourceId::namespaced(kinds::virtual_service(), KYMA_NAMESPACE, HEALTHZ_VIRTUAL_SERVICE_NAME)
}

fn dns_entry_id() -> ResourceId {
    ResourceId::namespaced(kinds::dns_entry(), KYMA_NAMESPACE, KYMA_DNS_ENTRY_NAME)
}

fn certificate_id() -> ResourceId {
    ResourceId::namespaced(kinds::certificate(), ISTIO_NAMESPACE, KYMA_CERTIFICATE_NAME)
}

async fn delete_all(client: &dyn ClusterClient, ids: &[ResourceId]) -> Result<(), ReconcileError> {
    for id in ids {
        delete(client, id).await?;
    }
    Ok(())
}

/// The `kyma-system/kyma-gateway` feature.
pub struct KymaGateway;

impl KymaGateway {
    async fn converge_managed_certificate(
        pass: &Pass<'_>,
        ingress_address: Option<&str>,
    ) -> Result<(), ReconcileError> {
        let address = ingress_address.ok_or_else(|| {
            ReconcileError::Environment(
                "load balancer address of istio-system/istio-ingressgateway is not assigned yet"
                    .to_string(),
            )
        })?;
        let domain = pass.plan.domain.as_str();

        apply(
            pass.client,
            &DesiredResource::new(dns_entry_id(), manifests::DNS_ENTRY)
                .param("Domain", domain)
                .param("IngressAddress", address),
        )
        .await?;
        apply(
            pass.client,
            &DesiredResource::new(certificate_id(), manifests::CERTIFICATE)
                .param("Domain", domain)
                .param("SecretName", KYMA_GATEWAY_CERTS_SECRET),
        )
        .await?;
        Ok(())
    }

    async fn converge_self_signed_certificate(pass: &Pass<'_>) -> Result<(), ReconcileError> {
        let domain = pass.plan.domain.as_str();
        delete_all(pass.client, &[dns_entry_id(), certificate_id()]).await?;

        if pass.tls.cached(domain).await.is_none() {
            pass.tls.reload(pass.client, domain).await?;
        }
        let credential = pass.tls.get_or_generate(domain).await?;

        apply(
            pass.client,
            &DesiredResource::new(certificate_secret_id(), manifests::CERTIFICATE_SECRET)
                .param("Domain", domain)
                .param("Certificate", credential.certificate_base64())
                .param("PrivateKey", credential.private_key_base64()),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl GuardedFeature for KymaGateway {
    fn finalizer(&self) -> &'static str {
        FINALIZER_KYMA_GATEWAY
    }

    fn subject(&self) -> &'static str {
        "Kyma Gateway"
    }

    fn is_enabled(&self, gateway: &APIGateway) -> bool {
        gateway.kyma_gateway_enabled()
    }

    fn succeeded(&self) -> ConditionReason {
        KYMA_GATEWAY_RECONCILE_SUCCEEDED
    }

    fn failed(&self) -> ConditionReason {
        KYMA_GATEWAY_RECONCILE_FAILED
    }

    fn blocked(&self) -> ConditionReason {
        KYMA_GATEWAY_DELETION_BLOCKED
    }

    fn blocked_description(&self, _: &[BlockingResource]) -> String {
        "There are custom resources that block the deletion of Kyma Gateway. \
         Please take a look at kyma-system/api-gateway-controller-manager logs \
         to see more information about the warning"
            .to_string()
    }

    async fn blocking_resources(
        &self,
        pass: &Pass<'_>,
    ) -> Result<Vec<BlockingResource>, ReconcileError> {
        find_foreign_resources(pass.client, pass.catalog, pass.catalog.kinds(), |r| {
            references_gateway(r, KYMA_GATEWAY_REFERENCE)
        })
        .await
    }

    async fn converge(&self, pass: &Pass<'_>) -> Result<(), ReconcileError> {
        let domain = pass.plan.domain.as_str();
        debug!(domain, certificate = ?pass.plan.certificate, "Reconciling Kyma gateway");

        match &pass.plan.certificate {
            CertificateSource::Managed { ingress_address } => {
                Self::converge_managed_certificate(pass, ingress_address.as_deref()).await?;
            }
            CertificateSource::SelfSigned => Self::converge_self_signed_certificate(pass).await?,
        }

        apply(
            pass.client,
            &DesiredResource::new(gateway_id(), manifests::KYMA_GATEWAY)
                .param("Domain", domain)
                .param("CertSecretName", KYMA_GATEWAY_CERTS_SECRET),
        )
        .await?;
        apply(
            pass.client,
            &DesiredResource::new(healthz_id(), manifests::HEALTHZ_VIRTUAL_SERVICE)
                .param("Domain", domain),
        )
        .await?;
        Ok(())
    }

    async fn teardown(&self, pass: &Pass<'_>) -> Result<(), ReconcileError> {
        delete_all(
            pass.client,
            &[
                healthz_id(),
                gateway_id(),
                dns_entry_id(),
                certificate_id(),
                certificate_secret_id(),
            ],
        )
        .await
    }
}

#[cfg(test)]
#[path = "kyma_gateway_tests.rs"]
mod kyma_gateway_tests;
