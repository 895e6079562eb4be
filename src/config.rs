// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration from command-line flags and environment variables.

use crate::constants::{
    DEFAULT_CONFLICT_RETRY_ATTEMPTS, DEFAULT_CONFLICT_RETRY_INITIAL_MILLIS,
    DEFAULT_CONFLICT_RETRY_MAX_MILLIS, DEFAULT_CONTROLLER_CONCURRENCY,
    ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT,
    READY_REQUEUE_DURATION_SECS, WARNING_REQUEUE_DURATION_SECS,
};
use crate::errors::ConfigurationError;
use crate::reconcilers::catalog::ManagedResourceCatalog;
use crate::reconcilers::retry::ConflictRetry;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Kubernetes operator for the API Gateway module
#[derive(Parser, Debug, Clone)]
#[command(name = "api-gateway-operator", version, about, long_about = None)]
pub struct OperatorConfig {
    /// Managed-resource catalog; the catalog built into the binary is used when unset
    #[arg(long, env = "CONTROLLED_RESOURCES_PATH")]
    pub catalog_path: Option<PathBuf>,

    /// Maximum number of concurrent reconciliations
    #[arg(long, env = "CONTROLLER_CONCURRENCY", default_value_t = DEFAULT_CONTROLLER_CONCURRENCY)]
    pub concurrency: u16,

    /// Address the metrics server binds to
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Port of the metrics server
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Attempts for a conflicting status write, including the first
    #[arg(long, env = "STATUS_CONFLICT_RETRY_ATTEMPTS", default_value_t = DEFAULT_CONFLICT_RETRY_ATTEMPTS)]
    pub conflict_retry_attempts: u32,

    /// Backoff before the first status write retry, in milliseconds
    #[arg(long, env = "STATUS_CONFLICT_RETRY_INITIAL_MS", default_value_t = DEFAULT_CONFLICT_RETRY_INITIAL_MILLIS)]
    pub conflict_retry_initial_ms: u64,

    /// Requeue delay after a Ready pass, in seconds
    #[arg(long, env = "READY_REQUEUE_SECS", default_value_t = READY_REQUEUE_DURATION_SECS)]
    pub ready_requeue_secs: u64,

    /// Requeue delay after a Warning pass, in seconds
    #[arg(long, env = "WARNING_REQUEUE_SECS", default_value_t = WARNING_REQUEUE_DURATION_SECS)]
    pub warning_requeue_secs: u64,

    /// Requeue delay after a failed pass, in seconds
    #[arg(long, env = "ERROR_REQUEUE_SECS", default_value_t = ERROR_REQUEUE_DURATION_SECS)]
    pub error_requeue_secs: u64,
}

/// Per-pass tunables derived from [`OperatorConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub conflict_retry: ConflictRetry,
    pub ready_requeue: Duration,
    pub warning_requeue: Duration,
    pub error_requeue: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            conflict_retry: ConflictRetry::default(),
            ready_requeue: Duration::from_secs(READY_REQUEUE_DURATION_SECS),
            warning_requeue: Duration::from_secs(WARNING_REQUEUE_DURATION_SECS),
            error_requeue: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
        }
    }
}

impl OperatorConfig {
    #[must_use]
    pub fn settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            conflict_retry: ConflictRetry {
                attempts: self.conflict_retry_attempts,
                initial_interval: Duration::from_millis(self.conflict_retry_initial_ms),
                max_interval: Duration::from_millis(DEFAULT_CONFLICT_RETRY_MAX_MILLIS),
            },
            ready_requeue: Duration::from_secs(self.ready_requeue_secs),
            warning_requeue: Duration::from_secs(self.warning_requeue_secs),
            error_requeue: Duration::from_secs(self.error_requeue_secs),
        }
    }

    /// Load the configured catalog, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the file is unreadable or invalid.
    pub fn load_catalog(&self) -> Result<ManagedResourceCatalog, ConfigurationError> {
        match &self.catalog_path {
            Some(path) => ManagedResourceCatalog::from_file(path),
            None => ManagedResourceCatalog::embedded(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
