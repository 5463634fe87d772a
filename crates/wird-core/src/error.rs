//! WirdBot error types.

use std::time::Duration;

use thiserror::Error;

/// Result alias used across WirdBot crates.
pub type Result<T> = std::result::Result<T, WirdError>;

/// Top-level error.
#[derive(Debug, Error)]
pub enum WirdError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Prayer time lookup failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failure modes of a prayer-time lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The service does not know this location. Permanent for this input.
    #[error("location not found: {city}, {country}")]
    NotFound { city: String, country: String },

    /// The service answered but the timings were unusable (e.g. a prayer missing).
    #[error("invalid timings: {0}")]
    Invalid(String),

    /// Network failure, timeout, 5xx. Retry on the next tick.
    #[error("transient lookup failure: {0}")]
    Transient(String),
}

impl ResolveError {
    /// Whether the caller should simply try again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolveError::Transient(_))
    }
}

/// Failure modes of the outbound message transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The API asked us to back off.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The API rejected the request (bot kicked, chat not found, bad payload).
    #[error("API error: {0}")]
    Api(String),

    /// The request never completed.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl TransportError {
    /// The back-off the server asked for, if this is a rate-limit.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
