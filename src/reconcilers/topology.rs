// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Environment discovery and resource-branch selection.
//!
//! [`discover_facts`] performs every cluster read that influences which
//! optional resources should exist. [`resolve`] turns those facts into a
//! [`ResourcePlan`] without touching the cluster, so the branch logic is
//! deterministic and testable on its own.
//!
//! Any fact that cannot be established falls back to the least capable
//! branch: no Gardener domain means the local domain, unknown cluster size
//! means an evaluation cluster.

use crate::cluster::{kinds, ClusterClient, ResourceId};
use crate::constants::{
    CERTIFICATE_CRD, DEFAULT_LOCAL_DOMAIN, DNS_ENTRY_CRD, INGRESS_GATEWAY_SERVICE,
    ISTIO_NAMESPACE, PRODUCTION_MIN_CPU_CORES, PRODUCTION_MIN_MEMORY_BYTES,
    REQUIRED_ISTIO_CRDS, SHOOT_INFO_CONFIG_MAP, SHOOT_INFO_DOMAIN_KEY, SHOOT_INFO_NAMESPACE,
};
use crate::errors::{ApiError, ReconcileError};
use kube::core::DynamicObject;
use tracing::{debug, warn};

/// Aggregate node capacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterSize {
    pub cpu_cores: f64,
    pub memory_bytes: f64,
}

impl ClusterSize {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.cpu_cores >= PRODUCTION_MIN_CPU_CORES && self.memory_bytes >= PRODUCTION_MIN_MEMORY_BYTES
    }
}

/// What one pass learned about the cluster.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvironmentFacts {
    /// Domain published by Gardener in `kube-system/shoot-info`
    pub gardener_domain: Option<String>,
    /// `DNSEntry` CRD installed
    pub dns_provider: bool,
    /// `Certificate` CRD installed
    pub cert_provider: bool,
    /// `None` when capacity could not be determined
    pub cluster_size: Option<ClusterSize>,
    /// Load balancer IP or hostname of the Istio ingress gateway
    pub ingress_address: Option<String>,
    /// Required CRDs that are not installed, in check order
    pub missing_dependencies: Vec<String>,
}

/// Where the gateway's TLS certificate comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CertificateSource {
    /// Gardener issues the certificate and publishes the DNS record.
    Managed { ingress_address: Option<String> },
    /// The operator stores a self-signed wildcard certificate in a Secret.
    SelfSigned,
}

/// Resource sizing of the auxiliary proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyProfile {
    /// Evaluation cluster: one small replica, no autoscaler
    Light,
    /// Production cluster: two replicas and an autoscaler
    Production,
}

impl ProxyProfile {
    #[must_use]
    pub fn replicas(self) -> u32 {
        match self {
            ProxyProfile::Light => 1,
            ProxyProfile::Production => 2,
        }
    }

    /// `(cpu request, memory request, cpu limit, memory limit)`
    #[must_use]
    pub fn resources(self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            ProxyProfile::Light => ("10m", "64Mi", "100m", "128Mi"),
            ProxyProfile::Production => ("100m", "128Mi", "1", "512Mi"),
        }
    }

    /// `(min replicas, max replicas)` of the autoscaler.
    #[must_use]
    pub fn autoscaling(self) -> (u32, u32) {
        (self.replicas(), 10)
    }
}

/// Which optional resource branches this pass wants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourcePlan {
    pub domain: String,
    pub certificate: CertificateSource,
    pub proxy_profile: ProxyProfile,
    pub proxy_autoscaler: bool,
}

/// Choose the resource branches for `facts`. Pure and total.
#[must_use]
pub fn resolve(facts: &EnvironmentFacts) -> ResourcePlan {
    let domain = facts
        .gardener_domain
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCAL_DOMAIN.to_string());

    let managed = facts.dns_provider && facts.cert_provider && domain != DEFAULT_LOCAL_DOMAIN;
    let certificate = if managed {
        CertificateSource::Managed {
            ingress_address: facts.ingress_address.clone(),
        }
    } else {
        CertificateSource::SelfSigned
    };

    let production = facts.cluster_size.is_some_and(|s| s.is_production());
    let proxy_profile = if production {
        ProxyProfile::Production
    } else {
        ProxyProfile::Light
    };

    ResourcePlan {
        domain,
        certificate,
        proxy_profile,
        proxy_autoscaler: production,
    }
}

/// Parse a Kubernetes quantity (`500m`, `4`, `16Gi`, `1G`, `1.5`) into a number
/// of base units. Returns `None` for anything unrecognized.
#[must_use]
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    const SUFFIXES: [(&str, f64); 12] = [
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("m", 0.001),
        ("k", 1e3),
        ("K", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
    ];

    let quantity = quantity.trim();
    let (number, factor) = SUFFIXES
        .iter()
        .find_map(|(suffix, factor)| quantity.strip_suffix(suffix).map(|n| (n, *factor)))
        .unwrap_or((quantity, 1.0));

    let value: f64 = number.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value * factor)
}

/// Sum node capacity. `None` if there are no nodes or any quantity is unreadable.
#[must_use]
pub fn cluster_size(nodes: &[DynamicObject]) -> Option<ClusterSize> {
    if nodes.is_empty() {
        return None;
    }
    let mut size = ClusterSize {
        cpu_cores: 0.0,
        memory_bytes: 0.0,
    };
    for node in nodes {
        let capacity = &node.data["status"]["capacity"];
        size.cpu_cores += parse_quantity(capacity["cpu"].as_str()?)?;
        size.memory_bytes += parse_quantity(capacity["memory"].as_str()?)?;
    }
    Some(size)
}

fn ingress_address(service: &DynamicObject) -> Option<String> {
    let ingress = &service.data["status"]["loadBalancer"]["ingress"][0];
    ingress["ip"]
        .as_str()
        .or_else(|| ingress["hostname"].as_str())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

async fn crd_installed(client: &dyn ClusterClient, name: &str) -> Result<bool, ReconcileError> {
    let id = ResourceId::cluster(kinds::custom_resource_definition(), name);
    match client.get(&id).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Read every fact [`resolve`] needs.
///
/// Absent objects are treated as unknown facts. Node listing failures only
/// make the cluster size unknown.
///
/// # Errors
///
/// Returns the first failing read other than absence (e.g. cancellation).
pub async fn discover_facts(client: &dyn ClusterClient) -> Result<EnvironmentFacts, ReconcileError> {
    let mut facts = EnvironmentFacts::default();

    let shoot_info = ResourceId::namespaced(kinds::config_map(), SHOOT_INFO_NAMESPACE, SHOOT_INFO_CONFIG_MAP);
    match client.get(&shoot_info).await {
        Ok(cm) => {
            facts.gardener_domain = cm.data["data"][SHOOT_INFO_DOMAIN_KEY]
                .as_str()
                .filter(|d| !d.is_empty())
                .map(str::to_string);
        }
        Err(e) if e.is_not_found() => debug!("No Gardener shoot-info, assuming a local cluster"),
        Err(e) => return Err(e.into()),
    }

    facts.dns_provider = crd_installed(client, DNS_ENTRY_CRD).await?;
    facts.cert_provider = crd_installed(client, CERTIFICATE_CRD).await?;

    let mut required: Vec<&str> = REQUIRED_ISTIO_CRDS.to_vec();
    if facts.gardener_domain.is_some() {
        required.extend([DNS_ENTRY_CRD, CERTIFICATE_CRD]);
    }
    for crd in required {
        let installed = match crd {
            DNS_ENTRY_CRD => facts.dns_provider,
            CERTIFICATE_CRD => facts.cert_provider,
            _ => crd_installed(client, crd).await?,
        };
        if !installed {
            facts.missing_dependencies.push(crd.to_string());
        }
    }

    facts.cluster_size = match client.list(&kinds::node(), None).await {
        Ok(nodes) => cluster_size(&nodes),
        Err(e @ ApiError::Cancelled { .. }) => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Could not list nodes, assuming an evaluation cluster");
            None
        }
    };

    let ingress = ResourceId::namespaced(kinds::service(), ISTIO_NAMESPACE, INGRESS_GATEWAY_SERVICE);
    match client.get(&ingress).await {
        Ok(service) => facts.ingress_address = ingress_address(&service),
        Err(e) if e.is_not_found() => debug!("Istio ingress gateway service not found"),
        Err(e) => return Err(e.into()),
    }

    debug!(?facts, "Discovered environment");
    Ok(facts)
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod topology_tests;
