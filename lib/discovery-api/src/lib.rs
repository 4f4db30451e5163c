//! Service discovery data model
//!
//! This library defines the values exchanged with discovery backends:
//! - Endpoint: a resolved address/port pair returned by lookups
//! - ServiceRegistration: a provider announcement sent to a catalog
//! - HealthCheckSpec: opaque health-check parameters forwarded to a catalog
//! - BackendConfig: selects the active discovery backend

pub mod config;
pub mod endpoint;
pub mod registration;

pub use config::{BackendConfig, BackendKind, UnknownBackendKind};
pub use endpoint::Endpoint;
pub use registration::{HealthCheckSpec, RegisterOptions, ServiceRegistration};
