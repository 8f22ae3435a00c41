//! Error type shared by every Drafter operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DrafterError>;

/// Error type for Drafter operations.
///
/// `InvalidArgument` is always raised before a request is built. `Api` and
/// `Authentication` carry the response body verbatim.
#[derive(Debug, Error)]
pub enum DrafterError {
    /// Caller broke an operation's precondition; nothing was sent
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Token endpoint refused the credentials
    #[error("authentication failed (HTTP {status}): {body}")]
    Authentication { status: u16, body: String },

    /// Service answered with a status the operation does not accept
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport failure (connect, TLS, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Success response that could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Server record violates the draftset data model
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// Missing or unusable configuration / credentials
    #[error("configuration error: {0}")]
    Config(String),

    /// Async job did not finish in time
    #[error("timeout: {0}")]
    Timeout(String),
}

impl DrafterError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// HTTP status carried by `Api` / `Authentication` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Authentication { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised client-side before any request was sent.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<reqwest::Error> for DrafterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
