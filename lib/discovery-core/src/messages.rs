//! Human-readable error text keyed by error kind

use crate::error::{DiscoveryError, ErrorKind, Result};
use std::collections::HashMap;
use std::time::Duration;

const NOT_FOUND: &str = "Service not found: {name}";
const SERVICE_UNAVAILABLE: &str =
    "Service unavailable: {name} did not become ready after {attempts} attempts in {elapsed_ms}ms";

/// Message templates with `{placeholder}` interpolation
#[derive(Clone, Debug)]
pub struct MessageCatalog {
    templates: HashMap<ErrorKind, String>,
}

impl MessageCatalog {
    /// Load templates from a JSON object keyed by kind name, e.g.
    /// `{"notFound": "No such service: {name}"}`.
    ///
    /// Kinds missing from the document keep their built-in template.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: HashMap<String, String> = serde_json::from_str(json).map_err(|e| {
            DiscoveryError::InvalidConfiguration(format!("message catalog is not valid: {}", e))
        })?;

        let mut catalog = Self::default();
        for (key, template) in overrides {
            let kind = ErrorKind::from_name(&key).ok_or_else(|| {
                DiscoveryError::InvalidConfiguration(format!("unknown message key: {}", key))
            })?;
            catalog.templates.insert(kind, template);
        }
        Ok(catalog)
    }

    /// Replace the template for one kind
    pub fn with_template(mut self, kind: ErrorKind, template: impl Into<String>) -> Self {
        self.templates.insert(kind, template.into());
        self
    }

    /// Render the template for `kind`, leaving unknown placeholders untouched
    pub fn render(&self, kind: ErrorKind, args: &[(&str, &str)]) -> String {
        let mut message = self
            .templates
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.as_str().to_string());
        for (key, value) in args {
            message = message.replace(&format!("{{{}}}", key), value);
        }
        message
    }

    pub fn not_found(&self, name: &str) -> DiscoveryError {
        DiscoveryError::NotFound {
            name: name.to_string(),
            message: self.render(ErrorKind::NotFound, &[("name", name)]),
        }
    }

    pub fn service_unavailable(&self, name: &str, attempts: u32, elapsed: Duration) -> DiscoveryError {
        let attempts_text = attempts.to_string();
        let elapsed_text = elapsed.as_millis().to_string();
        DiscoveryError::ServiceUnavailable {
            message: self.render(
                ErrorKind::ServiceUnavailable,
                &[
                    ("name", name),
                    ("attempts", attempts_text.as_str()),
                    ("elapsed_ms", elapsed_text.as_str()),
                ],
            ),
            attempts,
            elapsed,
        }
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut templates = HashMap::new();
        templates.insert(ErrorKind::NotFound, NOT_FOUND.to_string());
        templates.insert(ErrorKind::ServiceUnavailable, SERVICE_UNAVAILABLE.to_string());
        Self { templates }
    }
}
