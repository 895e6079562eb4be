// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Manifest templates embedded at build time.
//!
//! Placeholders use `{{ Name }}` syntax and are rendered strictly by
//! [`crate::template::render`].

/// Shared Kyma gateway. Parameters: `Domain`, `CertSecretName`.
pub const KYMA_GATEWAY: &str = include_str!("manifests/kyma_gateway.yaml");

/// Health-check `VirtualService` on the Kyma gateway. Parameters: `Domain`.
pub const HEALTHZ_VIRTUAL_SERVICE: &str = include_str!("manifests/healthz_virtual_service.yaml");

/// Gardener `DNSEntry`. Parameters: `Domain`, `IngressAddress`.
pub const DNS_ENTRY: &str = include_str!("manifests/dns_entry.yaml");

/// Gardener `Certificate`. Parameters: `Domain`, `SecretName`.
pub const CERTIFICATE: &str = include_str!("manifests/certificate.yaml");

/// Self-signed TLS `Secret`. Parameters: `Domain`, `Certificate`, `PrivateKey` (both base64 PEM).
pub const CERTIFICATE_SECRET: &str = include_str!("manifests/certificate_secret.yaml");

/// Ory Oathkeeper deployment. Parameters: `Replicas`, `CpuRequest`,
/// `MemoryRequest`, `CpuLimit`, `MemoryLimit`.
pub const OATHKEEPER_DEPLOYMENT: &str = include_str!("manifests/oathkeeper_deployment.yaml");

/// Ory Oathkeeper API service. No parameters.
pub const OATHKEEPER_SERVICE: &str = include_str!("manifests/oathkeeper_service.yaml");

/// Ory Oathkeeper autoscaler. Parameters: `MinReplicas`, `MaxReplicas`.
pub const OATHKEEPER_HPA: &str = include_str!("manifests/oathkeeper_hpa.yaml");

/// Ory Oathkeeper configuration `ConfigMap`. Parameters: `Domain`.
pub const OATHKEEPER_CONFIG: &str = include_str!("manifests/oathkeeper_config.yaml");

/// `rules.oathkeeper.ory.sh` CRD. No parameters.
pub const OATHKEEPER_RULE_CRD: &str = include_str!("manifests/oathkeeper_rule_crd.yaml");

/// Oathkeeper maester metrics `PeerAuthentication`. No parameters.
pub const OATHKEEPER_MAESTER_PEER_AUTHENTICATION: &str =
    include_str!("manifests/oathkeeper_maester_peer_authentication.yaml");

/// JWKS rotator service account. Parameters: `Name`.
pub const JWKS_ROTATOR_SERVICE_ACCOUNT: &str =
    include_str!("manifests/jwks_rotator_service_account.yaml");

/// JWKS rotator role. Parameters: `Name`, `SecretName`, `OathkeeperName`.
pub const JWKS_ROTATOR_ROLE: &str = include_str!("manifests/jwks_rotator_role.yaml");

/// JWKS rotator role binding. Parameters: `Name`.
pub const JWKS_ROTATOR_ROLE_BINDING: &str = include_str!("manifests/jwks_rotator_role_binding.yaml");

/// JWKS rotator `CronJob`. Parameters: `Name`, `SecretName`, `OathkeeperName`.
pub const JWKS_ROTATOR_CRON_JOB: &str = include_str!("manifests/jwks_rotator_cron_job.yaml");

/// `apirules.gateway.kyma-project.io` CRD. No parameters.
pub const API_RULE_CRD: &str = include_str!("manifests/api_rule_crd.yaml");

/// Default managed-resource catalog.
pub const CONTROLLED_RESOURCES: &str = include_str!("manifests/controlled_resources_list.yaml");
