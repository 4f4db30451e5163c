//! Catalog backend: lookups and registrations against a Consul agent

use crate::context::DiscoveryContext;
use crate::discovery::Discovery;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use discovery_api::{BackendKind, Endpoint, HealthCheckSpec, RegisterOptions, ServiceRegistration};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn, Instrument};

/// One instance of a service as listed by `/v1/catalog/service/{name}`
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogNode {
    /// Address of the node running the agent
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "ServiceID")]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    /// Address the service registered with; empty means the node address
    #[serde(default)]
    pub service_address: String,
    pub service_port: u16,
    #[serde(default)]
    pub service_tags: Option<Vec<String>>,
}

impl CatalogNode {
    fn into_endpoint(self) -> Endpoint {
        let address = if self.service_address.is_empty() {
            self.address
        } else {
            self.service_address
        };
        Endpoint::new(address, Some(self.service_port))
    }
}

/// A check as listed by `/v1/agent/checks`
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentCheck {
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "ServiceID")]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
}

/// Body of `PUT /v1/agent/service/register`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    tags: &'a [String],
    /// Always false: a re-registration replaces the tag set
    enable_tag_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<&'a HealthCheckSpec>,
}

impl<'a> From<&'a ServiceRegistration> for AgentServiceRegistration<'a> {
    fn from(registration: &'a ServiceRegistration) -> Self {
        Self {
            id: &registration.id,
            name: &registration.name,
            address: &registration.address,
            port: registration.port,
            tags: &registration.tags,
            enable_tag_override: false,
            check: registration.health_check.as_ref().filter(|check| !check.is_empty()),
        }
    }
}

/// Consul-backed discovery
pub struct CatalogDiscovery {
    ctx: DiscoveryContext,
    endpoint: String,
    base: Url,
    client: Client,
}

impl CatalogDiscovery {
    /// Create a backend for the agent at `endpoint`, e.g. `http://localhost:8500`.
    ///
    /// No request is made until the first operation.
    pub fn new(endpoint: impl Into<String>, ctx: DiscoveryContext) -> Result<Self> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        let base = Url::parse(&endpoint).map_err(|e| {
            DiscoveryError::InvalidConfiguration(format!("invalid catalog endpoint '{}': {}", endpoint, e))
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(DiscoveryError::InvalidConfiguration(format!(
                "catalog endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(ctx.request_timeout())
            .build()
            .map_err(|e| DiscoveryError::InvalidConfiguration(format!("failed to build HTTP client: {}", e)))?;

        debug!(endpoint = %endpoint, "Catalog discovery configured");
        Ok(Self {
            ctx,
            endpoint,
            base,
            client,
        })
    }

    /// Agent base URL as configured
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    /// All catalog entries registered under `name`
    pub async fn service_nodes(&self, name: &str) -> Result<Vec<CatalogNode>> {
        let nodes = self
            .client
            .get(self.url(&["catalog", "service", name]))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CatalogNode>>()
            .await?;
        Ok(nodes)
    }

    /// The local agent's checks keyed by check id (`service:<id>` for service checks)
    pub async fn checks(&self) -> Result<HashMap<String, AgentCheck>> {
        let checks = self
            .client
            .get(self.url(&["agent", "checks"]))
            .send()
            .await?
            .error_for_status()?
            .json::<HashMap<String, AgentCheck>>()
            .await?;
        Ok(checks)
    }
}

#[async_trait]
impl Discovery for CatalogDiscovery {
    fn kind(&self) -> BackendKind {
        BackendKind::Catalog
    }

    fn describe(&self) -> String {
        format!("consul({})", self.endpoint)
    }

    fn context(&self) -> &DiscoveryContext {
        &self.ctx
    }

    async fn ready(&self) -> bool {
        let url = self.url(&["status", "leader"]);
        async move {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => true,
                Ok(response) => {
                    debug!(endpoint = %self.endpoint, status = %response.status(), "Catalog is not ready");
                    false
                }
                Err(e) => {
                    debug!(endpoint = %self.endpoint, error = %e, "Catalog is not ready");
                    false
                }
            }
        }
        .instrument(self.ctx.span().clone())
        .await
    }

    async fn lookup(&self, name: &str, port: Option<u16>) -> Result<Vec<Endpoint>> {
        async move {
            if let Some(port) = port {
                warn!(name, port, "The specified port for the service will be ignored");
            }

            let nodes = self.service_nodes(name).await?;
            if nodes.is_empty() {
                debug!(name, "Catalog has no instance of the service");
                return Err(self.ctx.messages().not_found(name));
            }

            debug!(name, instances = nodes.len(), "Catalog instances found");
            Ok(nodes.into_iter().map(CatalogNode::into_endpoint).collect())
        }
        .instrument(self.ctx.span().clone())
        .await
    }

    async fn register(
        &self,
        name: &str,
        address: &str,
        port: u16,
        options: RegisterOptions,
    ) -> Result<bool> {
        let registration = ServiceRegistration::new(name, address, port, options);
        async move {
            self.client
                .put(self.url(&["agent", "service", "register"]))
                .json(&AgentServiceRegistration::from(&registration))
                .send()
                .await?
                .error_for_status()?;

            debug!(
                name = %registration.name,
                id = %registration.id,
                address = %registration.address,
                port = registration.port,
                "Registered service"
            );
            Ok(true)
        }
        .instrument(self.ctx.span().clone())
        .await
    }
}
