// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::{OperatorConfig, ReconcileSettings};
    use crate::errors::ConfigurationError;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_settings_defaults() {
        let config = OperatorConfig::try_parse_from(["api-gateway-operator"]).unwrap();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.metrics_port, 8080);
        assert!(config.catalog_path.is_none());
        assert_eq!(config.settings(), ReconcileSettings::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = OperatorConfig::try_parse_from([
            "api-gateway-operator",
            "--conflict-retry-attempts",
            "9",
            "--warning-requeue-secs",
            "5",
        ])
        .unwrap();
        let settings = config.settings();
        assert_eq!(settings.conflict_retry.attempts, 9);
        assert_eq!(settings.warning_requeue, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_catalog_file_is_configuration_error() {
        let config = OperatorConfig::try_parse_from([
            "api-gateway-operator",
            "--catalog-path",
            "/nonexistent/controlled_resources.yaml",
        ])
        .unwrap();
        assert!(matches!(
            config.load_catalog(),
            Err(ConfigurationError::Read { .. })
        ));
    }

    #[test]
    fn test_embedded_catalog_is_default() {
        let config = OperatorConfig::try_parse_from(["api-gateway-operator"]).unwrap();
        assert!(!config.load_catalog().unwrap().kinds().is_empty());
    }
}
