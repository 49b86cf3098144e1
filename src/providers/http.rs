//! JSON-over-HTTP transport for the REST providers

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{DriveGradeError, Result};

/// Fetches a JSON document. Implemented over HTTP in production and by stubs in tests.
#[async_trait::async_trait]
pub trait JsonTransport: Send + Sync {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value>;
}

/// [`JsonTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    provider: String,
}

impl HttpTransport {
    /// Build a client with a per-request timeout. `provider` labels errors.
    pub fn new(provider: impl Into<String>, timeout: Duration) -> Result<Self> {
        let provider = provider.into();
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            DriveGradeError::provider_failed_with_source(
                provider.clone(),
                "could not build HTTP client",
                Box::new(e),
            )
        })?;
        Ok(Self { client, provider })
    }
}

#[async_trait::async_trait]
impl JsonTransport for HttpTransport {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        debug!(provider = %self.provider, url, ?query, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                DriveGradeError::provider_failed_with_source(
                    self.provider.clone(),
                    format!("GET {url} failed"),
                    Box::new(e),
                )
            })?;
        response.json::<Value>().await.map_err(|e| {
            DriveGradeError::provider_failed_with_source(
                self.provider.clone(),
                format!("GET {url} returned invalid JSON"),
                Box::new(e),
            )
        })
    }
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
