//! Service registration inputs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque bag of health-check parameters.
///
/// The map is forwarded to the catalog verbatim; no key or value is
/// validated. The setters below only cover the keys most agents expect.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthCheckSpec(Map<String, Value>);

impl HealthCheckSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP URL probed by the agent
    pub fn http(self, url: impl Into<String>) -> Self {
        self.with("HTTP", url.into())
    }

    /// Probe interval, e.g. "10s"
    pub fn interval(self, interval: impl Into<String>) -> Self {
        self.with("Interval", interval.into())
    }

    /// Time-to-live for TTL checks, e.g. "15s"
    pub fn ttl(self, ttl: impl Into<String>) -> Self {
        self.with("TTL", ttl.into())
    }

    /// Deregister the service after the check stays critical this long, e.g. "90m"
    pub fn deregister_after(self, after: impl Into<String>) -> Self {
        self.with("DeregisterCriticalServiceAfter", after.into())
    }

    /// Set an arbitrary parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for HealthCheckSpec {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Optional parameters for a registration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterOptions {
    /// Instance id; defaults to the service name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tags replacing any tags previously registered under the same id
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<HealthCheckSpec>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn check(mut self, check: HealthCheckSpec) -> Self {
        self.check = Some(check);
        self
    }
}

/// A provider announcement, as sent to a catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,
}

impl ServiceRegistration {
    /// Build a registration, defaulting the id to the service name
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        options: RegisterOptions,
    ) -> Self {
        let name = name.into();
        let id = options
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| name.clone());

        Self {
            id,
            name,
            address: address.into(),
            port,
            tags: options.tags,
            health_check: options.check,
        }
    }
}
