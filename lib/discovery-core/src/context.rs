//! Explicit context shared by the factory and every backend

use crate::messages::MessageCatalog;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Collaborators handed to each backend at construction time.
///
/// Cloning is cheap; backends keep their own copy and never mutate it.
#[derive(Clone, Debug)]
pub struct DiscoveryContext {
    messages: Arc<MessageCatalog>,
    request_timeout: Duration,
    span: Span,
}

impl DiscoveryContext {
    pub fn new(messages: MessageCatalog) -> Self {
        Self {
            messages: Arc::new(messages),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            span: Span::none(),
        }
    }

    /// Timeout applied to each catalog HTTP request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parent span for backend diagnostics
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
