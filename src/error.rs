//! Error types for the domain authorization controller
//!
//! Errors carry the domain or object they relate to so that a failed
//! reconciliation can be traced back from the controller logs.

use thiserror::Error;

use crate::template::TemplateError;

/// Domain placeholder when no specific domain is known
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Main error type for domain authorization operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The object being created is already present in the store
    ///
    /// Expected during retries; provisioning treats it as success.
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Resource kind (e.g. "RoleBinding")
        kind: String,
        /// Object name
        name: String,
    },

    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Role template missing or malformed
    #[error("template error: {source}")]
    Template {
        /// The underlying template error
        #[from]
        source: TemplateError,
    },

    /// Token issuance produced no usable credential
    #[error("credential error for {principal}: {message}")]
    Credential {
        /// ServiceAccount the token was requested for
        principal: String,
        /// Description of what failed
        message: String,
    },

    /// Domain object is missing data needed for provisioning
    #[error("validation error for {domain}: {message}")]
    Validation {
        /// Name of the domain (or "unknown")
        domain: String,
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create an already-exists error for the given kind and name
    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a credential error for the given principal
    pub fn credential(principal: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Credential {
            principal: principal.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error with domain context
    pub fn validation(domain: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            domain: domain.into(),
            message: msg.into(),
        }
    }

    /// Returns true if this error reports an object that already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
