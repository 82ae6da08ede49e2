//! Template engine for manifest templates
//!
//! Uses minijinja with strict undefined handling. Placeholders written in
//! Go template style (`{{.DomainID}}`) are accepted alongside the native
//! `{{ DomainID }}` form so existing manifest files render unchanged.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use super::error::TemplateError;

/// Template engine for manifest placeholder resolution
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new template engine with strict undefined handling
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// Render a template string with the given context
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` if the syntax is invalid or a
    /// referenced variable is missing from `ctx`.
    pub fn render<S: Serialize>(&self, template: &str, ctx: S) -> Result<String, TemplateError> {
        let normalized = normalize_dot_placeholders(template);
        self.env
            .render_str(&normalized, ctx)
            .map_err(TemplateError::from)
    }
}

/// Strip the leading dot of Go-style field references: `{{.X}}` → `{{ X}}`
///
/// A whitespace-trim marker (`{{- .X }}`) is kept in front of the name.
fn normalize_dot_placeholders(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        let (trim, body) = match remaining.strip_prefix('-') {
            Some(body) => ("-", body),
            None => ("", remaining),
        };
        if let Some(rest) = body.trim_start().strip_prefix('.') {
            result.push_str(trim);
            result.push(' ');
            remaining = rest;
        }
    }

    result.push_str(remaining);
    result
}
