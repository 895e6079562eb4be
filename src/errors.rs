// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the reconciliation kernel.
//!
//! The taxonomy separates failures by where they originate and how the
//! reconciler reacts to them:
//!
//! - [`TemplateError`] - a manifest could not be rendered; fatal for that resource
//! - [`ConfigurationError`] - the managed-resource catalog could not be loaded; fatal at start-up
//! - [`ApiError`] - any cluster API failure, with `NotFound` and `Conflict` split out
//!   because callers treat them differently (absence as success, conflict as retryable)
//! - [`ReconcileError`] - the umbrella error returned by reconcilers and carried as the
//!   cause of `Warning`/`Error` statuses

use thiserror::Error;

/// Errors raised while rendering a manifest template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template references a placeholder with no value in the parameter map.
    #[error("template placeholder '{name}' has no value")]
    UnresolvedPlaceholder {
        /// Name of the unresolved placeholder
        name: String,
    },

    /// A parameter was supplied that the template never references.
    #[error("template parameter '{name}' is not referenced by the template")]
    UnusedParameter {
        /// Name of the unused parameter
        name: String,
    },

    /// The rendered text is not a well-formed resource document.
    #[error("rendered manifest is not a valid resource: {reason}")]
    Malformed {
        /// Parser error or missing field description
        reason: String,
    },

    /// The rendered resource does not have the identity the caller declared.
    #[error("rendered manifest identity {rendered} does not match declared identity {declared}")]
    IdentityMismatch {
        /// Identity the caller expected
        declared: String,
        /// Identity found in the rendered document
        rendered: String,
    },
}

/// Errors raised while loading the managed-resource catalog.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The catalog file could not be read.
    #[error("failed to read resource catalog {path}: {source}")]
    Read {
        /// Path of the catalog file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The catalog document is not valid YAML for the catalog schema.
    #[error("failed to parse resource catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A name or namespace pattern does not compile as a regular expression.
    #[error("resource catalog pattern \"{pattern}\" for {kind} is not a valid regular expression: {source}")]
    InvalidPattern {
        /// Kind the pattern belongs to
        kind: String,
        /// The offending pattern
        pattern: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },
}

/// Errors raised by cluster API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The addressed object does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// `Kind namespace/name` of the missing object
        resource: String,
    },

    /// Create was called for an object that already exists.
    #[error("{resource} already exists")]
    AlreadyExists {
        /// `Kind namespace/name` of the existing object
        resource: String,
    },

    /// The object changed between read and write (stale resourceVersion).
    #[error("conflict writing {resource}: the object has been modified")]
    Conflict {
        /// `Kind namespace/name` of the contended object
        resource: String,
    },

    /// The kind is not served by the cluster (CRD not installed).
    #[error("kind {kind} is not installed in the cluster")]
    KindNotInstalled {
        /// `group/version/Kind` of the missing kind
        kind: String,
    },

    /// The caller cancelled the reconciliation pass.
    #[error("operation on {resource} cancelled")]
    Cancelled {
        /// Object the cancelled call addressed
        resource: String,
    },

    /// The API server could not serve the request.
    #[error("request for {resource} failed: {message}")]
    Unavailable {
        /// Object the failed call addressed
        resource: String,
        /// Failure description
        message: String,
    },

    /// Any other kube client error.
    #[error("request for {resource} failed: {source}")]
    Kube {
        /// Object the failed call addressed
        resource: String,
        /// Underlying kube error
        #[source]
        source: kube::Error,
    },
}

/// Which API verb produced a kube error; decides how HTTP 404/409 are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVerb {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl ApiError {
    /// Classify a kube client error by HTTP status and verb.
    ///
    /// - 404 on `List` means the kind itself is not served
    /// - 404 otherwise means the object is absent
    /// - 409 on `Create` is `AlreadyExists`, on `Update` it is an optimistic-concurrency `Conflict`
    /// - 503 is `Unavailable`
    #[must_use]
    pub fn from_kube(err: kube::Error, verb: ApiVerb, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        match &err {
            kube::Error::Api(ae) if ae.code == 404 && verb == ApiVerb::List => {
                ApiError::KindNotInstalled { kind: resource }
            }
            kube::Error::Api(ae) if ae.code == 404 => ApiError::NotFound { resource },
            kube::Error::Api(ae) if ae.code == 409 && verb == ApiVerb::Create => {
                ApiError::AlreadyExists { resource }
            }
            kube::Error::Api(ae) if ae.code == 409 => ApiError::Conflict { resource },
            kube::Error::Api(ae) if ae.code == 503 => ApiError::Unavailable {
                resource,
                message: ae.message.clone(),
            },
            _ => ApiError::Kube {
                resource,
                source: err,
            },
        }
    }

    /// `true` when the addressed object (or its kind) does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound { .. } | ApiError::KindNotInstalled { .. }
        )
    }

    /// `true` for optimistic-concurrency failures.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

/// Umbrella error for a reconciliation step.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Status persistence kept hitting conflicts past the retry budget.
    #[error("giving up on {resource} after {attempts} conflicting attempts")]
    ConflictRetriesExhausted {
        /// Object whose write kept conflicting
        resource: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Deletion is intentionally deferred because foreign resources still depend on it.
    #[error("could not delete {subject} since there are {count} custom resource(s) present that block its deletion")]
    DeletionBlocked {
        /// What could not be deleted
        subject: String,
        /// Number of blocking resources found
        count: usize,
    },

    /// A CRD the module depends on is not installed.
    #[error("CRD {crd} is not present")]
    MissingDependency {
        /// Name of the missing CRD
        crd: String,
    },

    /// Another APIGateway is responsible for the module.
    #[error("stopped APIGateway CR reconciliation: only APIGateway CR {owner} reconciles the module")]
    NotResponsible {
        /// Name of the APIGateway that owns the module
        owner: String,
    },

    /// An object could not be converted between typed and dynamic form.
    #[error("failed to convert {resource}: {source}")]
    Serialization {
        /// Object being converted
        resource: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Self-signed certificate material could not be produced.
    #[error("failed to generate TLS certificate: {0}")]
    Tls(String),

    /// A required fact about the environment is missing at execution time.
    #[error("{0}")]
    Environment(String),
}

impl ReconcileError {
    /// `true` when the error is (or wraps) an absent-object API error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::Api(e) if e.is_not_found())
    }

    /// `true` when the error is (or wraps) an optimistic-concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Api(e) if e.is_conflict())
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
