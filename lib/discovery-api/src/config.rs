//! Backend selection
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which discovery mechanism is active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Ordered DNS record lookups
    #[default]
    #[serde(alias = "dns")]
    NameResolution,
    /// HTTP catalog (Consul agent API)
    #[serde(alias = "consul")]
    Catalog,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::NameResolution => write!(f, "dns"),
            BackendKind::Catalog => write!(f, "consul"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown discovery backend: {0}")]
pub struct UnknownBackendKind(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackendKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dns" | "name-resolution" => Ok(BackendKind::NameResolution),
            "consul" | "catalog" => Ok(BackendKind::Catalog),
            other => Err(UnknownBackendKind(other.to_string())),
        }
    }
}

/// Configuration consumed by the backend factory
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Catalog base URL, or a comma-separated resolver server list
    #[serde(default)]
    pub target: String,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }

    pub fn name_resolution(servers: impl Into<String>) -> Self {
        Self::new(BackendKind::NameResolution, servers)
    }

    pub fn catalog(endpoint: impl Into<String>) -> Self {
        Self::new(BackendKind::Catalog, endpoint)
    }

    /// Resolver servers from the target, blank entries dropped, order kept
    pub fn resolver_servers(&self) -> Vec<String> {
        self.target
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("dns".parse::<BackendKind>().unwrap(), BackendKind::NameResolution);
        assert_eq!("Consul".parse::<BackendKind>().unwrap(), BackendKind::Catalog);
        assert_eq!(" catalog ".parse::<BackendKind>().unwrap(), BackendKind::Catalog);
        assert_eq!(
            "etcd".parse::<BackendKind>(),
            Err(UnknownBackendKind("etcd".to_string()))
        );
    }

    #[test]
    fn test_resolver_servers_drop_blanks_and_keep_order() {
        let config = BackendConfig::name_resolution("4.2.2.4, ,8.8.8.8,,  ,1.1.1.1");
        assert_eq!(config.resolver_servers(), vec!["4.2.2.4", "8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn test_resolver_servers_empty() {
        assert!(BackendConfig::name_resolution("").resolver_servers().is_empty());
        assert!(BackendConfig::name_resolution(" , ").resolver_servers().is_empty());
    }

    #[test]
    fn test_deserialize_aliases() {
        let config: BackendConfig =
            serde_json::from_str(r#"{"kind":"consul","target":"http://localhost:8500"}"#).unwrap();
        assert_eq!(config, BackendConfig::catalog("http://localhost:8500"));

        let config: BackendConfig = serde_json::from_str(r#"{"kind":"name-resolution"}"#).unwrap();
        assert_eq!(config.kind, BackendKind::NameResolution);
        assert!(config.target.is_empty());
    }
}
