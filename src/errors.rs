// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the reconciliation engine.
//!
//! Every reconciliation step returns [`Result`]; the first error aborts the pass and
//! is handed back to the controller, which requeues the whole pass. Not-found reads
//! never surface here: the cluster client turns them into "absent".

use thiserror::Error;

/// Errors that abort a reconciliation pass.
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API call failed (network, conflict, forbidden, ...)
    ///
    /// Transient by nature; the controller retries the pass from the top.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// A resource to write has no `metadata.name`
    #[error("{kind} has no metadata.name")]
    MissingName {
        /// Kind of the offending resource
        kind: String,
    },

    /// A resource could not be converted to or from its JSON form
    #[error("Failed to serialize {kind}: {source}")]
    Serialization {
        /// Kind of the resource being converted
        kind: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The pass was cancelled before the step completed
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// A watched certificate could not be read or hashed
    ///
    /// The deployment step aborts so the pod is never rolled out without its certificates.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// The plugin configuration could not be rendered
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn api_code(&self) -> Option<u16> {
        match self {
            Self::Kube(kube::Error::Api(ae)) => Some(ae.code),
            _ => None,
        }
    }

    /// HTTP 404 from the API server
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// HTTP 409 caused by a stale `resourceVersion`
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Kube(kube::Error::Api(ae)) if ae.code == 409 && ae.reason == "Conflict")
    }

    /// HTTP 409 returned by a create of an existing object
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Kube(kube::Error::Api(ae)) if ae.code == 409 && ae.reason == "AlreadyExists")
    }

    /// Short category used as the `error_type` metric label.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Kube(_) if self.is_conflict() => "conflict",
            Self::Kube(_) => "api_error",
            Self::MissingName { .. } | Self::Serialization { .. } => "invalid_resource",
            Self::Cancelled => "cancelled",
            Self::Certificate(_) => "certificate_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
