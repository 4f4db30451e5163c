//! Pluggable service discovery
//!
//! This library provides:
//! - The `Discovery` capability: ready, lookup, register and a bounded-backoff wait
//! - `DnsDiscovery`: ordered SRV, A, CNAME, AAAA record resolution
//! - `CatalogDiscovery`: lookups and registrations against a Consul agent
//! - `find`: selection of one backend from configuration

pub mod backoff;
pub mod catalog;
pub mod context;
pub mod discovery;
pub mod dns;
pub mod error;
pub mod factory;
pub mod messages;

#[cfg(test)]
mod testing;

pub use backoff::{Backoff, WaitPolicy, WaitState};
pub use catalog::{AgentCheck, CatalogDiscovery, CatalogNode};
pub use context::DiscoveryContext;
pub use discovery::Discovery;
pub use dns::{DnsDiscovery, HickoryRecordResolver, RecordResolver, RecordType, RecordValue};
pub use error::{DiscoveryError, ErrorKind, Result};
pub use factory::{find, Backend};
pub use messages::MessageCatalog;

pub use discovery_api::{
    BackendConfig, BackendKind, Endpoint, HealthCheckSpec, RegisterOptions, ServiceRegistration,
};
