// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-wide handle for self-signed gateway certificates.
//!
//! Clusters without a Gardener certificate issuer get a self-signed wildcard
//! certificate for `*.<domain>`. Generating a new key pair on every pass would
//! make the Secret differ each time, so the handle caches one pair per domain.
//! After a restart, [`TlsCredentials::reload`] adopts the pair already stored
//! in the cluster instead of issuing a new one.
//!
//! The handle is built once in `main` and shared through
//! [`crate::context::Context`].

use crate::cluster::{kinds, ClusterClient, ResourceId};
use crate::constants::{ISTIO_NAMESPACE, KYMA_GATEWAY_CERTS_SECRET};
use crate::errors::ReconcileError;
use crate::labels::CERTIFICATE_DOMAIN_ANNOTATION;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// PEM-encoded certificate and private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

impl Credential {
    /// Base64 of the certificate PEM, as stored in a Secret's `tls.crt`.
    #[must_use]
    pub fn certificate_base64(&self) -> String {
        BASE64.encode(&self.certificate_pem)
    }

    /// Base64 of the key PEM, as stored in a Secret's `tls.key`.
    #[must_use]
    pub fn private_key_base64(&self) -> String {
        BASE64.encode(&self.private_key_pem)
    }
}

/// Cache of self-signed credentials keyed by domain.
#[derive(Debug, Default)]
pub struct TlsCredentials {
    cache: RwLock<HashMap<String, Credential>>,
}

/// Id of the Secret holding the self-signed gateway certificate.
#[must_use]
pub fn certificate_secret_id() -> ResourceId {
    ResourceId::namespaced(kinds::secret(), ISTIO_NAMESPACE, KYMA_GATEWAY_CERTS_SECRET)
}

fn generate(domain: &str) -> Result<Credential, ReconcileError> {
    let names = vec![format!("*.{domain}"), domain.to_string()];
    let certified = rcgen::generate_simple_self_signed(names)
        .map_err(|e| ReconcileError::Tls(format!("{domain}: {e}")))?;
    Ok(Credential {
        certificate_pem: certified.cert.pem(),
        private_key_pem: certified.key_pair.serialize_pem(),
    })
}

fn decode_field(secret: &kube::core::DynamicObject, key: &str) -> Option<String> {
    let encoded = secret.data["data"][key].as_str()?;
    let bytes = BASE64.decode(encoded).ok()?;
    String::from_utf8(bytes).ok().filter(|s| !s.is_empty())
}

impl TlsCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached credential for `domain`, if any.
    pub async fn cached(&self, domain: &str) -> Option<Credential> {
        self.cache.read().await.get(domain).cloned()
    }

    /// Cached credential for `domain`, generating and caching one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Tls`] if key generation fails.
    pub async fn get_or_generate(&self, domain: &str) -> Result<Credential, ReconcileError> {
        if let Some(existing) = self.cached(domain).await {
            return Ok(existing);
        }
        let mut cache = self.cache.write().await;
        if let Some(existing) = cache.get(domain) {
            return Ok(existing.clone());
        }
        let credential = generate(domain)?;
        info!(domain, "Generated self-signed gateway certificate");
        cache.insert(domain.to_string(), credential.clone());
        Ok(credential)
    }

    /// Replace the cache with the credential stored in the gateway
    /// certificate Secret, if that Secret was issued for `domain`.
    /// Returns whether a credential was adopted.
    ///
    /// # Errors
    ///
    /// Returns any read failure other than the Secret being absent.
    pub async fn reload(
        &self,
        client: &dyn ClusterClient,
        domain: &str,
    ) -> Result<bool, ReconcileError> {
        let secret = match client.get(&certificate_secret_id()).await {
            Ok(secret) => secret,
            Err(e) if e.is_not_found() => {
                debug!("No gateway certificate Secret to adopt");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let issued_for = secret
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(CERTIFICATE_DOMAIN_ANNOTATION));
        if issued_for.map(String::as_str) != Some(domain) {
            debug!(domain, ?issued_for, "Stored certificate is for another domain");
            return Ok(false);
        }

        let (Some(certificate_pem), Some(private_key_pem)) =
            (decode_field(&secret, "tls.crt"), decode_field(&secret, "tls.key"))
        else {
            debug!("Stored certificate Secret is incomplete");
            return Ok(false);
        };

        let mut cache = self.cache.write().await;
        cache.clear();
        cache.insert(
            domain.to_string(),
            Credential {
                certificate_pem,
                private_key_pem,
            },
        );
        info!(domain, "Adopted existing gateway certificate");
        Ok(true)
    }

    /// Drop every cached credential.
    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tls_tests;
