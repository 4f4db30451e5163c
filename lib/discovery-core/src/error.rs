use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("{message}")]
    NotFound { name: String, message: String },

    #[error("{message}")]
    ServiceUnavailable {
        message: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Invalid discovery configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Wait for discovery backend was cancelled")]
    Cancelled,
}

/// Error kinds, used as message catalog keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ServiceUnavailable,
    Transport,
    NotSupported,
    InvalidConfiguration,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "notFound",
            ErrorKind::ServiceUnavailable => "serviceUnavailable",
            ErrorKind::Transport => "transport",
            ErrorKind::NotSupported => "notSupported",
            ErrorKind::InvalidConfiguration => "invalidConfiguration",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "notFound" => Some(ErrorKind::NotFound),
            "serviceUnavailable" => Some(ErrorKind::ServiceUnavailable),
            "transport" => Some(ErrorKind::Transport),
            "notSupported" => Some(ErrorKind::NotSupported),
            "invalidConfiguration" => Some(ErrorKind::InvalidConfiguration),
            "cancelled" => Some(ErrorKind::Cancelled),
            _ => None,
        }
    }
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::NotFound { .. } => ErrorKind::NotFound,
            DiscoveryError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            DiscoveryError::Transport(_) => ErrorKind::Transport,
            DiscoveryError::NotSupported(_) => ErrorKind::NotSupported,
            DiscoveryError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            DiscoveryError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DiscoveryError::NotFound { .. })
    }
}
