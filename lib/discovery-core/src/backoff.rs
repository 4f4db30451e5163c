//! Bounded exponential backoff over a readiness probe

use crate::error::{DiscoveryError, Result};
use crate::messages::MessageCatalog;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Budget for waiting on a backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Give up once this much time has elapsed since the first probe
    pub timeout: Duration,
    /// Give up once this many probes have failed
    pub max_attempts: u32,
    /// Delay after the first failed probe; doubles after each further failure
    pub base_delay: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl WaitPolicy {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

/// Wait states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitState {
    /// A readiness probe is due
    Probing,
    /// The last probe failed; probe again after this delay
    BackingOff(Duration),
    /// The backend reported ready
    Resolved,
    /// The attempt or time budget is exhausted
    Failed,
}

/// Transition logic for `wait`, free of any clock or I/O.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: WaitPolicy,
    state: WaitState,
    attempts: u32,
    probes: u32,
    delay: Duration,
}

impl Backoff {
    pub fn new(policy: WaitPolicy) -> Self {
        let delay = policy.base_delay;
        Self {
            policy,
            state: WaitState::Probing,
            attempts: 1,
            probes: 0,
            delay,
        }
    }

    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Number of probes performed so far
    pub fn probes(&self) -> u32 {
        self.probes
    }

    /// Record a probe result observed `elapsed` after the first probe started.
    ///
    /// Ignored unless the machine is `Probing`.
    pub fn on_probe(&mut self, ready: bool, elapsed: Duration) -> WaitState {
        if self.state != WaitState::Probing {
            return self.state;
        }
        self.probes += 1;

        self.state = if ready {
            WaitState::Resolved
        } else {
            self.attempts += 1;
            if self.attempts > self.policy.max_attempts || elapsed > self.policy.timeout {
                WaitState::Failed
            } else {
                let delay = self.delay;
                self.delay = self.delay.saturating_mul(2);
                WaitState::BackingOff(delay)
            }
        };
        self.state
    }

    /// The back-off delay has elapsed
    pub fn on_delay_elapsed(&mut self) -> WaitState {
        if let WaitState::BackingOff(_) = self.state {
            self.state = WaitState::Probing;
        }
        self.state
    }
}

/// Drive `probe` until it reports ready, the budget runs out or `cancel` fires.
///
/// `subject` names the backend in the `ServiceUnavailable` message.
pub async fn wait_until_ready<F, Fut>(
    subject: &str,
    policy: &WaitPolicy,
    messages: &MessageCatalog,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let mut backoff = Backoff::new(policy.clone());

    loop {
        match backoff.state() {
            WaitState::Probing => {
                let ready = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
                    ready = probe() => ready,
                };
                let state = backoff.on_probe(ready, started.elapsed());
                debug!(subject, probe = backoff.probes(), state = ?state, "Readiness probe finished");
            }
            WaitState::BackingOff(delay) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
                    _ = sleep(delay) => {}
                }
                backoff.on_delay_elapsed();
            }
            WaitState::Resolved => return Ok(true),
            WaitState::Failed => {
                let elapsed = started.elapsed();
                debug!(subject, probes = backoff.probes(), elapsed = ?elapsed, "Giving up on readiness");
                return Err(messages.service_unavailable(subject, backoff.probes(), elapsed));
            }
        }
    }
}
