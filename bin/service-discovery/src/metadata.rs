//! Identity of this service, read from the package manifest

/// Package attributes, with an optional override for the announced name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub authors: String,
    service: Option<String>,
}

impl ServiceMetadata {
    /// Metadata of the running binary's package
    pub fn from_package() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: env!("CARGO_PKG_DESCRIPTION").to_string(),
            authors: env!("CARGO_PKG_AUTHORS").to_string(),
            service: None,
        }
    }

    /// Override the service name; blank values are ignored
    pub fn with_service(mut self, service: Option<String>) -> Self {
        self.service = service.filter(|s| !s.trim().is_empty());
        self
    }

    /// Name announced to the catalog, falling back to the package name
    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or(&self.name)
    }
}
