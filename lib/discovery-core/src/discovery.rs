//! The capability every discovery backend provides

use crate::backoff::{wait_until_ready, WaitPolicy};
use crate::context::DiscoveryContext;
use crate::error::Result;
use async_trait::async_trait;
use discovery_api::{BackendKind, Endpoint, RegisterOptions};
use tokio_util::sync::CancellationToken;

/// A discovery backend.
///
/// Implementations hold only read-only configuration, so one instance can
/// serve any number of concurrent callers.
#[async_trait]
pub trait Discovery: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Short label used in diagnostics and `ServiceUnavailable` messages
    fn describe(&self) -> String;

    fn context(&self) -> &DiscoveryContext;

    /// Whether the backend is usable right now. Never fails.
    async fn ready(&self) -> bool;

    /// Resolve `name` to its endpoints; never returns an empty list.
    async fn lookup(&self, name: &str, port: Option<u16>) -> Result<Vec<Endpoint>>;

    /// Announce a provider of `name`
    async fn register(
        &self,
        name: &str,
        address: &str,
        port: u16,
        options: RegisterOptions,
    ) -> Result<bool>;

    /// Block until `ready()` holds or the policy's budget runs out
    async fn wait(&self, policy: &WaitPolicy) -> Result<bool> {
        self.wait_with_cancel(policy, &CancellationToken::new()).await
    }

    /// Like `wait`, returning `Cancelled` as soon as `cancel` fires
    async fn wait_with_cancel(
        &self,
        policy: &WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let subject = self.describe();
        wait_until_ready(&subject, policy, self.context().messages(), cancel, || self.ready()).await
    }
}
