//! Name-resolution backend: ordered DNS record lookups

use crate::context::DiscoveryContext;
use crate::discovery::Discovery;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use discovery_api::{BackendKind, Endpoint, RegisterOptions};
use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{Name, RData, RecordType as HickoryRecordType};
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::Resolver;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn, Instrument};

const DNS_PORT: u16 = 53;

type TokioResolver = Resolver<TokioConnectionProvider>;

/// Record types tried by `lookup`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    Srv,
    A,
    Cname,
    Aaaa,
}

impl RecordType {
    /// Fallback order; the first type with an answer wins
    pub const LOOKUP_ORDER: [RecordType; 4] =
        [RecordType::Srv, RecordType::A, RecordType::Cname, RecordType::Aaaa];
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::Srv => "SRV",
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Aaaa => "AAAA",
        };
        f.write_str(name)
    }
}

impl From<RecordType> for HickoryRecordType {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Srv => HickoryRecordType::SRV,
            RecordType::A => HickoryRecordType::A,
            RecordType::Cname => HickoryRecordType::CNAME,
            RecordType::Aaaa => HickoryRecordType::AAAA,
        }
    }
}

/// One answer from a record query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordValue {
    /// SRV target host and port
    Service { target: String, port: u16 },
    /// IP address or alias target; carries no port
    Host(String),
}

impl RecordValue {
    fn into_endpoint(self, port: Option<u16>) -> Endpoint {
        match self {
            RecordValue::Service { target, port } => Endpoint::new(target, Some(port)),
            RecordValue::Host(host) => Endpoint::new(host, port),
        }
    }
}

/// Issues a single DNS query for one record type
#[async_trait]
pub trait RecordResolver: Send + Sync {
    async fn resolve(&self, name: &str, record_type: RecordType) -> anyhow::Result<Vec<RecordValue>>;
}

/// `RecordResolver` backed by hickory.
///
/// The underlying resolver is built on first use, so constructing this type
/// reads no system configuration and opens no sockets.
pub struct HickoryRecordResolver {
    servers: Vec<SocketAddr>,
    resolver: OnceCell<TokioResolver>,
}

impl HickoryRecordResolver {
    /// An empty server list means the system resolver configuration
    pub fn new(servers: Vec<SocketAddr>) -> Self {
        Self {
            servers,
            resolver: OnceCell::new(),
        }
    }

    fn build(&self) -> anyhow::Result<TokioResolver> {
        let mut builder = if self.servers.is_empty() {
            Resolver::builder_tokio()?
        } else {
            Resolver::builder_with_config(self.config(), TokioConnectionProvider::default())
        };
        // every lookup must reach a server
        builder.options_mut().cache_size = 0;
        Ok(builder.build())
    }

    fn config(&self) -> ResolverConfig {
        let name_servers: Vec<NameServerConfig> = self
            .servers
            .iter()
            .flat_map(|addr| {
                [
                    NameServerConfig::new(*addr, Protocol::Udp),
                    NameServerConfig::new(*addr, Protocol::Tcp),
                ]
            })
            .collect();
        ResolverConfig::from_parts(None, vec![], name_servers)
    }
}

#[async_trait]
impl RecordResolver for HickoryRecordResolver {
    async fn resolve(&self, name: &str, record_type: RecordType) -> anyhow::Result<Vec<RecordValue>> {
        let resolver = self.resolver.get_or_try_init(|| async { self.build() }).await?;
        let lookup = resolver.lookup(name, record_type.into()).await?;

        let values = lookup
            .iter()
            .filter_map(|rdata| match (record_type, rdata) {
                (RecordType::Srv, RData::SRV(srv)) => Some(RecordValue::Service {
                    target: host_name(srv.target()),
                    port: srv.port(),
                }),
                (RecordType::A, RData::A(a)) => Some(RecordValue::Host(a.to_string())),
                (RecordType::Aaaa, RData::AAAA(aaaa)) => Some(RecordValue::Host(aaaa.to_string())),
                (RecordType::Cname, RData::CNAME(cname)) => Some(RecordValue::Host(host_name(&cname.0))),
                _ => None,
            })
            .collect();

        Ok(values)
    }
}

/// Fully-qualified names come back with the root label; drop it
fn host_name(name: &Name) -> String {
    name.to_utf8().trim_end_matches('.').to_string()
}

fn parse_server(server: &str) -> Result<SocketAddr> {
    server
        .parse::<SocketAddr>()
        .or_else(|_| server.parse::<IpAddr>().map(|ip| SocketAddr::new(ip, DNS_PORT)))
        .map_err(|_| DiscoveryError::InvalidConfiguration(format!("invalid DNS server address: {}", server)))
}

/// Name-resolution discovery backend
pub struct DnsDiscovery {
    ctx: DiscoveryContext,
    servers: Vec<String>,
    resolver: Arc<dyn RecordResolver>,
}

impl DnsDiscovery {
    /// Create a backend querying `servers`, or the system resolver when the
    /// list holds no non-blank entry.
    pub fn new<I, S>(servers: I, ctx: DiscoveryContext) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let servers = active_servers(servers);
        let addrs = servers
            .iter()
            .map(|s| parse_server(s))
            .collect::<Result<Vec<_>>>()?;

        debug!(servers = addrs.len(), "DNS discovery configured");
        Ok(Self {
            ctx,
            servers,
            resolver: Arc::new(HickoryRecordResolver::new(addrs)),
        })
    }

    /// Create a backend with a custom record resolver
    pub fn with_resolver<I, S>(servers: I, resolver: Arc<dyn RecordResolver>, ctx: DiscoveryContext) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ctx,
            servers: active_servers(servers),
            resolver,
        }
    }

    /// Resolver servers in use; empty means the system default
    pub fn servers(&self) -> &[String] {
        &self.servers
    }
}

fn active_servers<I, S>(servers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    servers
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl Discovery for DnsDiscovery {
    fn kind(&self) -> BackendKind {
        BackendKind::NameResolution
    }

    fn describe(&self) -> String {
        if self.servers.is_empty() {
            "dns(system)".to_string()
        } else {
            format!("dns({})", self.servers.join(","))
        }
    }

    fn context(&self) -> &DiscoveryContext {
        &self.ctx
    }

    async fn ready(&self) -> bool {
        true
    }

    async fn lookup(&self, name: &str, port: Option<u16>) -> Result<Vec<Endpoint>> {
        async move {
            for record_type in RecordType::LOOKUP_ORDER {
                trace!(record = %record_type, name, "Resolving DNS record");
                match self.resolver.resolve(name, record_type).await {
                    Ok(values) if !values.is_empty() => {
                        debug!(record = %record_type, name, entries = values.len(), "DNS record found");
                        return Ok(values
                            .into_iter()
                            .map(|value| value.into_endpoint(port))
                            .collect());
                    }
                    Ok(_) => {
                        trace!(record = %record_type, name, "DNS answer is empty. Continue the search");
                    }
                    Err(e) => {
                        trace!(record = %record_type, name, error = %e, "DNS record not found. Continue the search");
                    }
                }
            }

            debug!(name, "DNS record not found");
            Err(self.ctx.messages().not_found(name))
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
        self.ctx.span().in_scope(|| {
            warn!(
                name,
                address,
                port,
                options = ?options,
                "Can not register service. Operation is not supported."
            )
        });
        Ok(true)
    }
}
