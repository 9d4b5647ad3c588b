use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use courtside_core::config::LlmSettings;
use courtside_core::error::ProviderError;

/// Base URL, optional bearer token and a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl HttpClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().context("building http client")?;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key, timeout_ms })
    }

    /// Reads the API key from the env var named in `settings.api_key_env`.
    pub fn from_settings(settings: &LlmSettings, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).ok().filter(|k| !k.is_empty());
        Self::new(&settings.base_url, api_key, timeout)
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    pub async fn post_json<B, R>(&self, provider: &str, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(|e| transport_error(provider, &e, self.timeout_ms))?;
        let status = response.status();
        debug!(provider, url = %url, status = status.as_u16(), "http response");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(provider, status, &text));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::rejected(provider, format!("malformed response body: {e}")))
    }
}

/// 429 is throttling, 5xx and 408 are transient outages, other statuses are
/// rejections that retrying would not fix.
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let message = format!("{status}: {}", body.chars().take(300).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::throttled(provider, message)
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        ProviderError::unavailable(provider, message)
    } else {
        ProviderError::rejected(provider, message)
    }
}

fn transport_error(provider: &str, e: &reqwest::Error, timeout_ms: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout { provider: provider.to_string(), after_ms: timeout_ms }
    } else if e.is_builder() {
        ProviderError::rejected(provider, e.to_string())
    } else {
        ProviderError::unavailable(provider, e.to_string())
    }
}
