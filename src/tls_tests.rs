// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `tls.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::kinds;
    use crate::testing::{dynamic, FakeCluster};
    use crate::tls::{Credential, TlsCredentials};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde_json::json;

    fn seed_secret(fake: &FakeCluster, domain: &str, cert: &str, key: &str) {
        fake.insert(
            &kinds::secret(),
            dynamic(
                &kinds::secret(),
                Some("istio-system"),
                "kyma-gateway-certs",
                json!({
                    "metadata": {
                        "name": "kyma-gateway-certs",
                        "namespace": "istio-system",
                        "annotations": { "operator.kyma-project.io/domain": domain },
                    },
                    "data": {
                        "tls.crt": BASE64.encode(cert),
                        "tls.key": BASE64.encode(key),
                    },
                }),
            ),
        );
    }

    #[tokio::test]
    async fn test_generated_credential_is_cached_per_domain() {
        let tls = TlsCredentials::new();
        let first = tls.get_or_generate("local.kyma.dev").await.unwrap();
        let second = tls.get_or_generate("local.kyma.dev").await.unwrap();

        assert_eq!(first, second);
        assert!(first.certificate_pem.contains("BEGIN CERTIFICATE"));
        assert!(first.private_key_pem.contains("PRIVATE KEY"));

        let other = tls.get_or_generate("example.com").await.unwrap();
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_credential() {
        let tls = TlsCredentials::new();
        let first = tls.get_or_generate("local.kyma.dev").await.unwrap();
        tls.invalidate().await;
        assert!(tls.cached("local.kyma.dev").await.is_none());
        let second = tls.get_or_generate("local.kyma.dev").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_reload_adopts_secret_for_same_domain() {
        let fake = FakeCluster::new();
        seed_secret(&fake, "local.kyma.dev", "CERT", "KEY");
        let tls = TlsCredentials::new();

        assert!(tls.reload(&fake, "local.kyma.dev").await.unwrap());
        assert_eq!(
            tls.get_or_generate("local.kyma.dev").await.unwrap(),
            Credential {
                certificate_pem: "CERT".to_string(),
                private_key_pem: "KEY".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_reload_ignores_secret_for_other_domain() {
        let fake = FakeCluster::new();
        seed_secret(&fake, "old.example.com", "CERT", "KEY");
        let tls = TlsCredentials::new();

        assert!(!tls.reload(&fake, "local.kyma.dev").await.unwrap());
        assert!(tls.cached("local.kyma.dev").await.is_none());
    }

    #[tokio::test]
    async fn test_reload_without_secret_is_noop() {
        let fake = FakeCluster::new();
        let tls = TlsCredentials::new();
        assert!(!tls.reload(&fake, "local.kyma.dev").await.unwrap());
    }

    #[test]
    fn test_base64_fields() {
        let credential = Credential {
            certificate_pem: "cert".to_string(),
            private_key_pem: "key".to_string(),
        };
        assert_eq!(credential.certificate_base64(), "Y2VydA==");
        assert_eq!(credential.private_key_base64(), "a2V5");
    }
}
