//! Error types for Noor

use std::fmt;
use thiserror::Error;

/// Why a fetch attempt did not produce a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    Network(String),
    Http { status: u16, message: Option<String> },
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "request timed out"),
            FetchFailure::Network(reason) => write!(f, "network error: {}", reason),
            FetchFailure::Http { status, message: Some(message) } => {
                write!(f, "HTTP {}: {}", status, message)
            }
            FetchFailure::Http { status, message: None } => write!(f, "HTTP {}", status),
        }
    }
}

// Clone is required: one failed fetch is handed to every coalesced caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoorError {
    #[error("Fetch failed: {0}")]
    FetchFailed(FetchFailure),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("{what} {value} is out of range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl NoorError {
    pub fn timeout() -> Self {
        NoorError::FetchFailed(FetchFailure::Timeout)
    }

    pub fn network(reason: impl Into<String>) -> Self {
        NoorError::FetchFailed(FetchFailure::Network(reason.into()))
    }

    pub fn http(status: u16, message: Option<String>) -> Self {
        NoorError::FetchFailed(FetchFailure::Http { status, message })
    }

    /// True for failures that usually mean a slow or missing connection
    /// rather than a broken server response.
    pub fn is_connectivity(&self) -> bool {
        match self {
            NoorError::FetchFailed(FetchFailure::Timeout)
            | NoorError::FetchFailed(FetchFailure::Network(_)) => true,
            NoorError::FetchFailed(FetchFailure::Http { status, .. }) => {
                matches!(status, 503 | 504)
            }
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for NoorError {
    fn from(e: rusqlite::Error) -> Self {
        NoorError::StorageUnavailable(e.to_string())
    }
}

impl From<reqwest::Error> for NoorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NoorError::timeout()
        } else if e.is_decode() {
            NoorError::InvalidPayload(e.to_string())
        } else if let Some(status) = e.status() {
            NoorError::http(status.as_u16(), None)
        } else {
            NoorError::network(e.to_string())
        }
    }
}

impl serde::Serialize for NoorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
