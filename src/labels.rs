// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Management labels and annotations stamped on every owned resource.
//!
//! `ResourceSync` re-applies these on every pass, so a removed or edited
//! disclaimer is restored on the next reconciliation.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Standard label for the version of the application
pub const K8S_VERSION: &str = "app.kubernetes.io/version";

// ============================================================================
// Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` and the module label
pub const MODULE_NAME: &str = "api-gateway";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_OPERATOR: &str = "api-gateway-operator";

/// Version stamped into `app.kubernetes.io/version`
pub const MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Module Labels
// ============================================================================

/// Label marking a resource as belonging to a Kyma module
pub const KYMA_MODULE_LABEL: &str = "kyma-project.io/module";

// ============================================================================
// Module Annotations
// ============================================================================

/// Annotation warning users that manual edits are reverted
pub const DISCLAIMER_ANNOTATION: &str =
    "apigateways.operator.kyma-project.io/managed-by-disclaimer";

/// Value of [`DISCLAIMER_ANNOTATION`]
pub const DISCLAIMER_VALUE: &str = "DO NOT EDIT - This resource is managed by Kyma.\nAny modifications are discarded and the resource is reverted to the original state.";

/// Domain a self-signed certificate Secret was issued for
pub const CERTIFICATE_DOMAIN_ANNOTATION: &str = "operator.kyma-project.io/domain";

/// Labels every owned resource must carry.
#[must_use]
pub fn management_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (KYMA_MODULE_LABEL.to_string(), MODULE_NAME.to_string()),
        (K8S_PART_OF.to_string(), MODULE_NAME.to_string()),
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_OPERATOR.to_string()),
        (K8S_VERSION.to_string(), MODULE_VERSION.to_string()),
    ])
}

/// Annotations every owned resource must carry.
#[must_use]
pub fn management_annotations() -> BTreeMap<String, String> {
    BTreeMap::from([(
        DISCLAIMER_ANNOTATION.to_string(),
        DISCLAIMER_VALUE.to_string(),
    )])
}
