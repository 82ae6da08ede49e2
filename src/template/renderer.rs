//! Template Renderer
//!
//! Materializes typed Kubernetes objects from manifest templates on disk.

use std::path::Path;

use k8s_openapi::api::rbac::v1::Role;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(test)]
use mockall::automock;

use super::engine::TemplateEngine;
use super::error::TemplateError;

/// Substitution input for the domain Role template
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleTemplateInput {
    /// Domain the Role is rendered for
    #[serde(rename = "DomainID")]
    pub domain_id: String,
}

impl RoleTemplateInput {
    /// Create the template input for a domain
    pub fn new(domain_id: impl Into<String>) -> Self {
        Self {
            domain_id: domain_id.into(),
        }
    }
}

/// Trait abstracting Role template rendering
///
/// Allows provisioning tests to supply Roles without touching the filesystem.
#[cfg_attr(test, automock)]
pub trait TemplateRenderer: Send + Sync {
    /// Render the Role template at `path` for the given input
    fn render_role(&self, path: &Path, input: &RoleTemplateInput) -> Result<Role, TemplateError>;
}

/// Renders templates read from the local filesystem
#[derive(Default)]
pub struct FileTemplateRenderer {
    engine: TemplateEngine,
}

impl FileTemplateRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the template file at `path` into an object of type `T`
    pub fn render_object<T, S>(&self, path: &Path, input: S) -> Result<T, TemplateError>
    where
        T: DeserializeOwned,
        S: Serialize,
    {
        let template = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rendered = self.engine.render(&template, input)?;
        serde_yaml::from_str(&rendered).map_err(|e| TemplateError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn render_role(&self, path: &Path, input: &RoleTemplateInput) -> Result<Role, TemplateError> {
        let role: Role = self.render_object(path, input)?;
        if role.metadata.name.as_deref().map_or(true, str::is_empty) {
            return Err(TemplateError::MissingName {
                path: path.to_path_buf(),
            });
        }
        Ok(role)
    }
}
