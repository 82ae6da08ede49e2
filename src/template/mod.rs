//! Manifest templating
//!
//! Domain Roles are not hard-coded: they are rendered from a manifest file
//! shipped under `etc/conf`, with the domain name substituted in.

mod engine;
mod error;
mod renderer;

pub use engine::TemplateEngine;
pub use error::TemplateError;
#[cfg(test)]
pub use renderer::MockTemplateRenderer;
pub use renderer::{FileTemplateRenderer, RoleTemplateInput, TemplateRenderer};
