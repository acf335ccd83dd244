//! Error types for the fetch layer

use thiserror::Error;

/// Errors that can occur while fetching data from the upstream provider
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx response from the provider
    #[error("Upstream returned HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The requested record does not exist upstream
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Every attempt failed and no offline copy was available
    #[error("Request failed after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Creates a Transport error from any error type
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Creates a NotFound error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether another attempt could change the outcome
    ///
    /// 4xx and 5xx responses both count toward the attempt budget; only a
    /// legitimately absent record short-circuits.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::UpstreamHttp { .. } | Self::InvalidResponse(_) => true,
            Self::NotFound { .. } | Self::ExhaustedRetries { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Errors raised while persisting the offline cache
#[derive(Debug, Error)]
pub enum OfflineCacheError {
    #[error("Offline cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Offline cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
