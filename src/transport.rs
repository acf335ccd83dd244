//! Transport abstraction for outbound requests to the upstream provider

use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Immutable description of one outbound read request
///
/// Every request to the provider is a `GET`; the descriptor carries the path
/// relative to the base URL, the query string and the per-request timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
}

impl RequestDescriptor {
    /// Creates a `GET` request for `path`
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            timeout,
        }
    }

    /// Appends a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Appends a query parameter when `value` is present
    pub fn param_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Looks up a query parameter by name
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Performs a single outbound call and returns the decoded JSON body
///
/// Implementations map connection, DNS and timeout failures to
/// [`FetchError::Transport`], HTTP 404 to [`FetchError::NotFound`] and any other
/// non-2xx status to [`FetchError::UpstreamHttp`]. They never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &RequestDescriptor) -> Result<Value, FetchError>;

    /// Returns the name of this transport
    fn name(&self) -> &'static str;
}
