//! Backend selection from configuration

use crate::catalog::CatalogDiscovery;
use crate::context::DiscoveryContext;
use crate::discovery::Discovery;
use crate::dns::DnsDiscovery;
use crate::error::Result;
use async_trait::async_trait;
use discovery_api::{BackendConfig, BackendKind, Endpoint, RegisterOptions};
use tracing::debug;

/// The discovery backends this crate provides
pub enum Backend {
    Dns(DnsDiscovery),
    Catalog(CatalogDiscovery),
}

/// Build the backend selected by `config`. Performs no I/O.
pub fn find(config: &BackendConfig, ctx: DiscoveryContext) -> Result<Backend> {
    let backend = match config.kind {
        BackendKind::Catalog => Backend::Catalog(CatalogDiscovery::new(config.target.as_str(), ctx)?),
        BackendKind::NameResolution => Backend::Dns(DnsDiscovery::new(config.resolver_servers(), ctx)?),
    };
    debug!(backend = %backend.describe(), "Selected discovery backend");
    Ok(backend)
}

impl Backend {
    fn inner(&self) -> &dyn Discovery {
        match self {
            Backend::Dns(dns) => dns,
            Backend::Catalog(catalog) => catalog,
        }
    }
}

#[async_trait]
impl Discovery for Backend {
    fn kind(&self) -> BackendKind {
        self.inner().kind()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }

    fn context(&self) -> &DiscoveryContext {
        self.inner().context()
    }

    async fn ready(&self) -> bool {
        self.inner().ready().await
    }

    async fn lookup(&self, name: &str, port: Option<u16>) -> Result<Vec<Endpoint>> {
        self.inner().lookup(name, port).await
    }

    async fn register(
        &self,
        name: &str,
        address: &str,
        port: u16,
        options: RegisterOptions,
    ) -> Result<bool> {
        self.inner().register(name, address, port, options).await
    }
}
