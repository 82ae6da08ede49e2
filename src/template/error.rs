//! Template error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while materializing an object from a template
///
/// All of these are configuration errors: the template file is shipped
/// with the controller and a failure here is never a transient condition.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file could not be read
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        /// Template path
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Template rendering failed (syntax error or undefined variable)
    #[error("template render error: {0}")]
    Render(#[from] minijinja::Error),

    /// Rendered output is not a valid manifest for the target type
    #[error("failed to parse rendered template {}: {message}", path.display())]
    Parse {
        /// Template path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Rendered manifest has no metadata.name
    #[error("rendered template {} has no metadata.name", path.display())]
    MissingName {
        /// Template path
        path: PathBuf,
    },
}
