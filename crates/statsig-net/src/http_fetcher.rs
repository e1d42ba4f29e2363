// statsig-net/src/http_fetcher.rs
// ============================================================================
// Module: HTTP Fetcher
// Description: reqwest-backed Fetcher implementation.
// Purpose: Perform the three network calls the spec store depends on:
//          config specs download, ID list lookup, and ranged ID list fetch.
// Dependencies: statsig-core, reqwest
// ============================================================================

//! ## Overview
//! [`HttpFetcher`] is the default, network-backed [`Fetcher`]. It never
//! retries and never backs off; the spec store's polling loop and init
//! timeout own retry/backoff policy. A fetcher constructed in local mode
//! short-circuits every call with [`FetchError::LocalMode`] without touching
//! the network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use statsig_core::FetchError;
use statsig_core::FetchResponse;
use statsig_core::Fetcher;
use statsig_core::Timestamp;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Server SDK key sent as `STATSIG-API-KEY`.
    pub api_key: String,
    /// Base URL for the config-specs download endpoint (no trailing slash).
    pub config_specs_base_url: String,
    /// Base URL for the ID lists lookup endpoint (no trailing slash).
    pub id_lists_base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// When set, every call returns [`FetchError::LocalMode`] without
    /// touching the network.
    pub local_mode: bool,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            config_specs_base_url: "https://statsigapi.net/v1/download_config_specs".to_string(),
            id_lists_base_url: "https://statsigapi.net/v1/get_id_lists".to_string(),
            request_timeout: Duration::from_secs(10),
            local_mode: false,
        }
    }
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Network-backed [`Fetcher`] built on a shared `reqwest::Client`.
pub struct HttpFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    /// Builds a new fetcher from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the underlying client cannot
    /// be constructed (e.g. the TLS backend fails to initialize).
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn api_key_header(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.config.api_key)
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        headers.insert(
            HeaderName::from_static("statsig-api-key"),
            value,
        );
        Ok(headers)
    }

    async fn get(&self, url: &str, range_start: Option<u64>) -> Result<FetchResponse, FetchError> {
        let url = Url::parse(url).map_err(|err| FetchError::Transport(err.to_string()))?;
        let mut request = self.client.get(url).headers(self.api_key_header()?);
        if let Some(start) = range_start {
            let range_value = HeaderValue::from_str(&format!("bytes={start}-"))
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            request = request.header(reqwest::header::RANGE, range_value);
        }
        let response = request.send().await.map_err(|err| FetchError::Transport(err.to_string()))?;
        translate_response(response).await
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_config_specs(&self, since: Option<Timestamp>) -> Result<FetchResponse, FetchError> {
        if self.config.local_mode {
            return Err(FetchError::LocalMode);
        }
        let url = match since {
            Some(since) => format!(
                "{}/{}.json?sinceTime={}",
                self.config.config_specs_base_url,
                self.config.api_key,
                since.as_millis()
            ),
            None => format!("{}/{}.json", self.config.config_specs_base_url, self.config.api_key),
        };
        self.get(&url, None).await
    }

    async fn fetch_id_list_index(&self) -> Result<FetchResponse, FetchError> {
        if self.config.local_mode {
            return Err(FetchError::LocalMode);
        }
        self.get(&self.config.id_lists_base_url, None).await
    }

    async fn fetch_id_list_range(&self, url: &str, range_start: u64) -> Result<FetchResponse, FetchError> {
        if self.config.local_mode {
            return Err(FetchError::LocalMode);
        }
        self.get(url, Some(range_start)).await
    }

    async fn post_exception(&self, payload: &[u8]) {
        if self.config.local_mode {
            return;
        }
        let url = "https://statsigapi.net/v1/sdk_exception";
        let Ok(mut headers) = self.api_key_header() else {
            return;
        };
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Err(err) =
            self.client.post(url).headers(headers).body(payload.to_vec()).send().await
        {
            tracing::warn!(error = %err, "failed to post sdk exception report");
        }
    }
}

/// Translates an HTTP response into a [`FetchResponse`] or [`FetchError`].
async fn translate_response(response: reqwest::Response) -> Result<FetchResponse, FetchError> {
    let status = response.status();
    if let Some(err) = classify_status(status) {
        return Err(err);
    }
    if status == StatusCode::NOT_MODIFIED {
        return Ok(FetchResponse { body: Vec::new(), content_length: Some(0), not_modified: true });
    }
    let content_length = response.content_length();
    let body = response.bytes().await.map_err(|err| FetchError::Transport(err.to_string()))?;
    Ok(FetchResponse { body: body.to_vec(), content_length, not_modified: false })
}

/// Classifies a response status as a [`FetchError`], or `None` when the
/// status should be treated as success (2xx, 206 partial content, or 304).
fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(FetchError::TooManyRequests);
    }
    if status == StatusCode::NOT_MODIFIED
        || status.is_success()
        || status == StatusCode::PARTIAL_CONTENT
    {
        return None;
    }
    Some(FetchError::Status(status.as_u16()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_classify_as_none() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(classify_status(StatusCode::PARTIAL_CONTENT).is_none());
        assert!(classify_status(StatusCode::NOT_MODIFIED).is_none());
    }

    #[test]
    fn rate_limit_classifies_as_too_many_requests() {
        assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS), Some(FetchError::TooManyRequests)));
    }

    #[test]
    fn server_error_classifies_as_status() {
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(FetchError::Status(500))
        ));
    }

    #[test]
    fn local_mode_config_short_circuits_before_network() {
        let fetcher = HttpFetcher::new(HttpFetcherConfig { local_mode: true, ..HttpFetcherConfig::default() })
            .unwrap();
        let result = tokio_test_block_on(fetcher.fetch_config_specs(None));
        assert!(matches!(result, Err(FetchError::LocalMode)));
    }

    /// Drives a future to completion on a throwaway current-thread runtime.
    fn tokio_test_block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(fut)
    }
}
