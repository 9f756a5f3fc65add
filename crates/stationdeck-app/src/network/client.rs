//! Shared HTTP client wrapper
//!
//! Thin wrapper around `reqwest::blocking::Client` that centralizes
//! USER_AGENT, default headers, timeouts, and JSON error handling.

use std::time::Duration;

use reqwest::blocking::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use stationdeck::config::network::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, USER_AGENT};
use stationdeck::error::DeckError;
use tracing::debug;

use crate::error::{AppError, Result};

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 200;

/// Shared HTTP client with standard configuration
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::with_headers(&[])
    }

    /// Create a client that sends `headers` on every request
    pub fn with_headers(headers: &[(&str, &str)]) -> Result<Self> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Config(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Config(format!("Invalid header value: {}", e)))?;
            map.insert(name, value);
        }

        let inner = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(map)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()?;
        Ok(Self { inner })
    }

    /// GET a URL and deserialize the JSON response
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send_json(self.inner.get(url))
    }

    /// POST form-encoded data and deserialize the JSON response
    pub fn post_form_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.send_json(self.inner.post(url).form(params))
    }

    /// Send a prepared request and deserialize the JSON response.
    ///
    /// Non-success statuses become `DeckError::Remote` carrying the start of
    /// the response body.
    pub fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            debug!(%status, body = body.as_str(), "request failed");
            return Err(AppError::Engine(DeckError::Remote(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            ))));
        }
        Ok(resp.json::<T>()?)
    }

    /// Access the underlying reqwest client
    pub fn inner(&self) -> &reqwest::blocking::Client {
        &self.inner
    }
}
