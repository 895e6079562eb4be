// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the API Gateway operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `APIGateway` CRD
pub const API_GROUP: &str = "operator.kyma-project.io";

/// API version of the `APIGateway` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Kind name for the `APIGateway` resource
pub const KIND_API_GATEWAY: &str = "APIGateway";

// ============================================================================
// Finalizers
// ============================================================================

/// Guards the module as a whole; blocked by user `APIRule`s and Oathkeeper `Rule`s
pub const FINALIZER_API_GATEWAY: &str = "gateways.operator.kyma-project.io/api-gateway";

/// Guards the shared Kyma gateway and its TLS and DNS satellites
pub const FINALIZER_KYMA_GATEWAY: &str = "gateways.operator.kyma-project.io/kyma-gateway";

/// Guards the Ory Oathkeeper deployment
pub const FINALIZER_ORY_OATHKEEPER: &str = "gateways.operator.kyma-project.io/ory-oathkeeper";

// ============================================================================
// Namespaces and Names
// ============================================================================

/// Namespace of module-owned workloads
pub const KYMA_NAMESPACE: &str = "kyma-system";

/// Namespace of the Istio control plane and ingress gateway
pub const ISTIO_NAMESPACE: &str = "istio-system";

/// Name of the shared Kyma gateway
pub const KYMA_GATEWAY_NAME: &str = "kyma-gateway";

/// `namespace/name` reference used by `APIRule`s and `VirtualService`s
pub const KYMA_GATEWAY_REFERENCE: &str = "kyma-system/kyma-gateway";

/// Health-check `VirtualService` bound to the Kyma gateway
pub const HEALTHZ_VIRTUAL_SERVICE_NAME: &str = "istio-healthz";

/// Gardener `Certificate` issued for the Kyma gateway
pub const KYMA_CERTIFICATE_NAME: &str = "kyma-tls-cert";

/// Secret holding the Kyma gateway TLS credential (issued or self-signed)
pub const KYMA_GATEWAY_CERTS_SECRET: &str = "kyma-gateway-certs";

/// Gardener `DNSEntry` for the Kyma gateway wildcard host
pub const KYMA_DNS_ENTRY_NAME: &str = "kyma-gateway";

/// Istio ingress gateway service whose load balancer address backs the `DNSEntry`
pub const INGRESS_GATEWAY_SERVICE: &str = "istio-ingressgateway";

/// Ory Oathkeeper deployment and autoscaler name
pub const ORY_OATHKEEPER_NAME: &str = "ory-oathkeeper";

/// Ory Oathkeeper API service name
pub const ORY_OATHKEEPER_API_SERVICE: &str = "ory-oathkeeper-api";

/// `ConfigMap` holding the Ory Oathkeeper configuration file
pub const ORY_OATHKEEPER_CONFIG_MAP: &str = "ory-oathkeeper-config";

/// Secret holding the JSON Web Key Set Ory Oathkeeper signs tokens with
pub const ORY_OATHKEEPER_JWKS_SECRET: &str = "ory-oathkeeper-jwks-secret";

/// `PeerAuthentication` exposing the Oathkeeper maester metrics port
pub const ORY_OATHKEEPER_MAESTER_PEER_AUTHENTICATION: &str = "ory-oathkeeper-maester-metrics";

/// `CronJob` rotating the Oathkeeper JWKS, with its service account, role and binding
pub const ORY_OATHKEEPER_JWKS_ROTATOR: &str = "oathkeeper-jwks-rotator";

/// CRD of Ory Oathkeeper access rules
pub const ORY_OATHKEEPER_RULE_CRD: &str = "rules.oathkeeper.ory.sh";

/// CRD of `APIRule`
pub const API_RULE_CRD: &str = "apirules.gateway.kyma-project.io";

// ============================================================================
// Environment Discovery Constants
// ============================================================================

/// Namespace of the Gardener shoot-info `ConfigMap`
pub const SHOOT_INFO_NAMESPACE: &str = "kube-system";

/// Name of the Gardener shoot-info `ConfigMap`
pub const SHOOT_INFO_CONFIG_MAP: &str = "shoot-info";

/// Key of the cluster domain in the shoot-info `ConfigMap`
pub const SHOOT_INFO_DOMAIN_KEY: &str = "domain";

/// Domain used when the cluster is not a Gardener shoot
pub const DEFAULT_LOCAL_DOMAIN: &str = "local.kyma.dev";

/// CRD of the Gardener DNS provider
pub const DNS_ENTRY_CRD: &str = "dnsentries.dns.gardener.cloud";

/// CRD of the Gardener certificate provider
pub const CERTIFICATE_CRD: &str = "certificates.cert.gardener.cloud";

/// Istio CRDs the module always requires
pub const REQUIRED_ISTIO_CRDS: [&str; 2] = [
    "gateways.networking.istio.io",
    "virtualservices.networking.istio.io",
];

/// Minimum total node CPU (cores) of a production cluster
pub const PRODUCTION_MIN_CPU_CORES: f64 = 5.0;

/// Minimum total node memory (bytes) of a production cluster (10 GiB)
pub const PRODUCTION_MIN_MEMORY_BYTES: f64 = 10.0 * 1024.0 * 1024.0 * 1024.0;

// ============================================================================
// Status Constants
// ============================================================================

/// Maximum number of blocking resource names listed in a condition message
pub const MAX_BLOCKING_RESOURCES_IN_MESSAGE: usize = 5;

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue interval after a `Ready` pass (1 hour)
pub const READY_REQUEUE_DURATION_SECS: u64 = 3600;

/// Requeue interval after a `Warning` pass (1 minute)
pub const WARNING_REQUEUE_DURATION_SECS: u64 = 60;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Number of status write attempts before giving up on conflicts
pub const DEFAULT_CONFLICT_RETRY_ATTEMPTS: u32 = 5;

/// Initial backoff between conflicting status writes (10ms)
pub const DEFAULT_CONFLICT_RETRY_INITIAL_MILLIS: u64 = 10;

/// Maximum backoff between conflicting status writes (1 second)
pub const DEFAULT_CONFLICT_RETRY_MAX_MILLIS: u64 = 1000;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default number of concurrent reconciliations
pub const DEFAULT_CONTROLLER_CONCURRENCY: u16 = 1;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
