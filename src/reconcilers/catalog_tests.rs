// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `catalog.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        any_instance, find_foreign_resources, references_gateway, ManagedResourceCatalog,
    };
    use crate::cluster::kinds;
    use crate::errors::ConfigurationError;
    use crate::testing::{dynamic, FakeCluster};
    use serde_json::json;
    use std::io::Write;

    const KYMA_GATEWAY: &str = "kyma-system/kyma-gateway";

    const EMPTY_APIRULE_CATALOG: &str = r#"
resources:
  - groupVersionKind:
      group: gateway.kyma-project.io
      version: v1beta1
      kind: APIRule
"#;

    const APIRULE_CATALOG_WITH_ENTRY: &str = r#"
resources:
  - groupVersionKind:
      group: gateway.kyma-project.io
      version: v1beta1
      kind: APIRule
    controlledList:
      - name: "api-rule"
        namespace: "default"
"#;

    fn seed_api_rule(fake: &FakeCluster, namespace: &str, name: &str, gateway: &str) {
        fake.insert(
            &kinds::api_rule(),
            dynamic(
                &kinds::api_rule(),
                Some(namespace),
                name,
                json!({ "spec": { "gateway": gateway } }),
            ),
        );
    }

    #[tokio::test]
    async fn test_unlisted_api_rule_referencing_gateway_is_foreign() {
        let fake = FakeCluster::new();
        seed_api_rule(&fake, "default", "api-rule", KYMA_GATEWAY);
        let catalog = ManagedResourceCatalog::from_yaml(EMPTY_APIRULE_CATALOG).unwrap();

        let found = find_foreign_resources(&fake, &catalog, catalog.kinds(), |r| {
            references_gateway(r, KYMA_GATEWAY)
        })
        .await
        .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), "default/api-rule");
    }

    #[tokio::test]
    async fn test_listed_api_rule_is_not_foreign() {
        let fake = FakeCluster::new();
        seed_api_rule(&fake, "default", "api-rule", KYMA_GATEWAY);
        let catalog = ManagedResourceCatalog::from_yaml(APIRULE_CATALOG_WITH_ENTRY).unwrap();

        let found = find_foreign_resources(&fake, &catalog, catalog.kinds(), |r| {
            references_gateway(r, KYMA_GATEWAY)
        })
        .await
        .unwrap();

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_irrelevant_foreign_resource_is_ignored() {
        let fake = FakeCluster::new();
        seed_api_rule(&fake, "default", "other", "custom/gateway");
        let catalog = ManagedResourceCatalog::from_yaml(EMPTY_APIRULE_CATALOG).unwrap();

        let found = find_foreign_resources(&fake, &catalog, catalog.kinds(), |r| {
            references_gateway(r, KYMA_GATEWAY)
        })
        .await
        .unwrap();
        assert!(found.is_empty());

        let found = find_foreign_resources(&fake, &catalog, catalog.kinds(), any_instance)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_uninstalled_kind_yields_no_results() {
        let fake = FakeCluster::new();
        fake.remove_kind(&kinds::oathkeeper_rule());
        seed_api_rule(&fake, "default", "api-rule", KYMA_GATEWAY);
        let catalog = ManagedResourceCatalog::embedded().unwrap();

        let found = find_foreign_resources(
            &fake,
            &catalog,
            &[kinds::oathkeeper_rule(), kinds::api_rule()],
            any_instance,
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_virtual_service_gateway_list_is_checked() {
        let fake = FakeCluster::new();
        for (name, gateways) in [
            ("uses-kyma", json!(["mesh", KYMA_GATEWAY])),
            ("uses-other", json!(["custom/gateway"])),
        ] {
            fake.insert(
                &kinds::virtual_service(),
                dynamic(
                    &kinds::virtual_service(),
                    Some("default"),
                    name,
                    json!({ "spec": { "gateways": gateways } }),
                ),
            );
        }
        // The module's own health check VirtualService also references the gateway.
        fake.insert(
            &kinds::virtual_service(),
            dynamic(
                &kinds::virtual_service(),
                Some("kyma-system"),
                "istio-healthz",
                json!({ "spec": { "gateways": [KYMA_GATEWAY] } }),
            ),
        );
        let catalog = ManagedResourceCatalog::embedded().unwrap();

        let found = find_foreign_resources(&fake, &catalog, catalog.kinds(), |r| {
            references_gateway(r, KYMA_GATEWAY)
        })
        .await
        .unwrap();

        let names: Vec<String> = found.iter().map(|r| r.qualified_name()).collect();
        assert_eq!(names, vec!["default/uses-kyma".to_string()]);
    }

    #[test]
    fn test_patterns_are_anchored() {
        let catalog = ManagedResourceCatalog::from_yaml(APIRULE_CATALOG_WITH_ENTRY).unwrap();
        let gvk = kinds::api_rule();
        assert!(catalog.is_managed(&gvk, "default", "api-rule"));
        assert!(!catalog.is_managed(&gvk, "default", "my-api-rule"));
        assert!(!catalog.is_managed(&gvk, "default-2", "api-rule"));
        assert!(!catalog.is_managed(&kinds::virtual_service(), "default", "api-rule"));
    }

    #[test]
    fn test_overlapping_entries_are_order_independent() {
        let yaml = r#"
resources:
  - groupVersionKind: { group: networking.istio.io, version: v1beta1, kind: VirtualService }
    controlledList:
      - { name: "kyma-.*", namespace: ".*" }
      - { name: "kyma-gateway", namespace: "kyma-system" }
"#;
        let reversed = r#"
resources:
  - groupVersionKind: { group: networking.istio.io, version: v1beta1, kind: VirtualService }
    controlledList:
      - { name: "kyma-gateway", namespace: "kyma-system" }
      - { name: "kyma-.*", namespace: ".*" }
"#;
        let a = ManagedResourceCatalog::from_yaml(yaml).unwrap();
        let b = ManagedResourceCatalog::from_yaml(reversed).unwrap();
        let gvk = kinds::virtual_service();
        for (ns, name) in [("kyma-system", "kyma-gateway"), ("default", "kyma-x"), ("a", "b")] {
            assert_eq!(a.is_managed(&gvk, ns, name), b.is_managed(&gvk, ns, name));
        }
    }

    #[test]
    fn test_invalid_pattern_fails_at_load() {
        let yaml = r#"
resources:
  - groupVersionKind: { group: gateway.kyma-project.io, version: v1beta1, kind: APIRule }
    controlledList:
      - { name: "api-rule(", namespace: "default" }
"#;
        let err = ManagedResourceCatalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPattern { ref pattern, .. } if pattern == "api-rule("));
    }

    #[test]
    fn test_pascal_case_keys_are_accepted() {
        let yaml = r#"
resources:
  - GroupVersionKind: { group: networking.istio.io, version: v1beta1, kind: VirtualService }
    ControlledList:
      - { name: "istio-healthz", namespace: "istio-system" }
"#;
        let catalog = ManagedResourceCatalog::from_yaml(yaml).unwrap();
        assert!(catalog.is_managed(&kinds::virtual_service(), "istio-system", "istio-healthz"));
    }

    #[test]
    fn test_from_file_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(APIRULE_CATALOG_WITH_ENTRY.as_bytes()).unwrap();
        let catalog = ManagedResourceCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.kinds(), &[kinds::api_rule()]);

        let err = ManagedResourceCatalog::from_file(std::path::Path::new("/nonexistent/catalog.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn test_embedded_catalog_lists_gateway_consumers() {
        let catalog = ManagedResourceCatalog::embedded().unwrap();
        assert!(catalog.kinds().contains(&kinds::api_rule()));
        assert!(catalog.kinds().contains(&kinds::virtual_service()));
        assert!(catalog.kinds().contains(&kinds::oathkeeper_rule()));
    }
}
