// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Strict manifest template rendering.
//!
//! Templates are YAML documents with `{{ Name }}` placeholders. Rendering is
//! strict in both directions: every placeholder needs a value and every value
//! must be used. The result is parsed into a [`DynamicObject`] and must carry
//! `apiVersion`, `kind` and `metadata.name`.

use crate::errors::TemplateError;
use kube::core::DynamicObject;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Names referenced by `template`, in order of first appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Substitute placeholders without parsing the result.
///
/// # Errors
///
/// - [`TemplateError::UnresolvedPlaceholder`] for the first placeholder without a value
/// - [`TemplateError::UnusedParameter`] for the first parameter the template never references
pub fn substitute(
    template: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let referenced = placeholders(template);
    if let Some(name) = referenced.iter().find(|n| !params.contains_key(*n)) {
        return Err(TemplateError::UnresolvedPlaceholder { name: name.clone() });
    }
    if let Some(name) = params.keys().find(|k| !referenced.contains(k)) {
        return Err(TemplateError::UnusedParameter { name: name.clone() });
    }

    Ok(PLACEHOLDER
        .replace_all(template, |c: &Captures| {
            params.get(&c[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

/// Render `template` with `params` into a resource object.
///
/// # Errors
///
/// Returns a [`TemplateError`] when substitution fails or the rendered text is
/// not a single well-formed resource document.
pub fn render(
    template: &str,
    params: &BTreeMap<String, String>,
) -> Result<DynamicObject, TemplateError> {
    let text = substitute(template, params)?;

    let doc: serde_json::Value =
        serde_yaml::from_str(&text).map_err(|e| TemplateError::Malformed {
            reason: e.to_string(),
        })?;

    for (pointer, field) in [
        ("/apiVersion", "apiVersion"),
        ("/kind", "kind"),
        ("/metadata/name", "metadata.name"),
    ] {
        let present = doc
            .pointer(pointer)
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !present {
            return Err(TemplateError::Malformed {
                reason: format!("missing {field}"),
            });
        }
    }

    serde_json::from_value(doc).map_err(|e| TemplateError::Malformed {
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod template_tests;
