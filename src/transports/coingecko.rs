//! CoinGecko transport implementation

use crate::{
    constants::{COINGECKO_API_URL, USER_AGENT},
    error::FetchError,
    transport::{RequestDescriptor, Transport},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Longest response body excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 200;

/// HTTPS transport for the CoinGecko REST API
pub struct CoinGeckoTransport {
    client: Client,
    base_url: String,
}

impl CoinGeckoTransport {
    /// Creates a transport for `base_url` with `timeout` as the client-wide ceiling
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a transport against the public CoinGecko API
    pub fn public(timeout: Duration) -> Result<Self, FetchError> {
        Self::new(COINGECKO_API_URL, timeout)
    }

    /// Builds the absolute URL for a request path
    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for CoinGeckoTransport {
    async fn get(&self, request: &RequestDescriptor) -> Result<Value, FetchError> {
        let url = self.build_url(&request.path);
        tracing::debug!(url = %url, query = ?request.query, "Fetching from CoinGecko");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&request.query)
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(request.path.clone()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::UpstreamHttp {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            FetchError::invalid_response(format!(
                "Failed to parse CoinGecko response: {}. Response: {}",
                e,
                truncate(&text, ERROR_BODY_LIMIT)
            ))
        })
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
