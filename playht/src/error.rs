//! Error types for the PlayHT API client.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for PlayHT operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for PlayHT API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (credentials, URLs, builder input).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Lease token bytes or trailing JSON could not be parsed.
    #[error("malformed lease token: {0}")]
    MalformedLease(String),

    /// Lease was already expired at decode time, or was used after expiry.
    #[error("lease expired at {expires}")]
    ExpiredLease {
        /// Technical expiry instant of the offending lease.
        expires: DateTime<Utc>,
    },

    /// HTTP-level failure while acquiring a lease (non-2xx, timeout,
    /// connection error).
    #[error("lease request failed: {message}")]
    Auth {
        /// Human-readable description of the failure.
        message: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Lease metadata carries no usable inference address.
    #[error("lease metadata has no inference address")]
    RoutingUnavailable,

    /// Transport failure or server-signaled error on the synthesis stream.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// gRPC channel establishment error.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl Error {
    /// Creates an authentication error from a transport-level failure.
    pub(crate) fn auth(source: reqwest::Error) -> Self {
        Error::Auth {
            message: source.to_string(),
            status: source.status().map(|s| s.as_u16()),
            source: Some(source),
        }
    }

    /// Creates an authentication error from a non-success HTTP status.
    pub(crate) fn auth_status(status: u16, body: &[u8]) -> Self {
        let detail = String::from_utf8_lossy(body);
        let detail = detail.trim();
        let message = if detail.is_empty() {
            format!("lease endpoint returned HTTP {status}")
        } else {
            format!("lease endpoint returned HTTP {status}: {detail}")
        };
        Error::Auth {
            message,
            status: Some(status),
            source: None,
        }
    }

    /// Creates a synthesis error from a gRPC status.
    pub(crate) fn synthesis_status(status: tonic::Status) -> Self {
        Error::Synthesis(format!("{:?}: {}", status.code(), status.message()))
    }

    /// Returns true if this is an authentication failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth { .. })
    }

    /// Returns true if a fresh lease refresh may clear this error.
    ///
    /// The core never retries on its own; backoff policy belongs to the
    /// caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. } | Error::MalformedLease(_) | Error::ExpiredLease { .. }
        )
    }
}
