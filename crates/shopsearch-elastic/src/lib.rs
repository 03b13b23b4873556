//! Retrieval Backend over the Elasticsearch `_search` HTTP API.
//!
//! One long-lived `reqwest::Client` is built at startup and shared by every
//! call. Each request is bounded by `backend.timeout_ms`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;

use shopsearch_core::config::BackendConfig;
use shopsearch_core::error::{BackendError, Error, Result};
use shopsearch_core::traits::RetrievalBackend;

#[derive(Clone)]
pub struct ElasticBackend {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    basic_auth: Option<(String, Option<String>)>,
}

impl ElasticBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("ApiKey {key}"))
                .map_err(|e| Error::InvalidConfig(format!("backend.api_key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Operation(format!("failed to build HTTP client: {e}")))?;
        let basic_auth = config.username.clone().map(|user| (user, config.password.clone()));
        Ok(Self { http, base_url: config.url.trim_end_matches('/').to_string(), timeout: config.timeout(), basic_auth })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn map_send_error(&self, e: &reqwest::Error) -> BackendError {
        if e.is_timeout() { BackendError::Timeout(self.timeout) } else { BackendError::Transport(e.to_string()) }
    }
}

#[async_trait]
impl RetrievalBackend for ElasticBackend {
    async fn search(&self, index: &str, body: &Value) -> std::result::Result<Value, BackendError> {
        let url = format!("{}/{}/_search", self.base_url, index);
        tracing::debug!(%url, "dispatching search");
        let mut request = self.http.post(&url).json(body);
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, password.as_deref());
        }
        let resp = request.send().await.map_err(|e| self.map_send_error(&e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        let bytes = resp.bytes().await.map_err(|e| self.map_send_error(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Malformed(format!("response is not JSON: {e}")))
    }
}
