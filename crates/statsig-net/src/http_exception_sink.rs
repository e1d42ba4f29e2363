// statsig-net/src/http_exception_sink.rs
// ============================================================================
// Module: HTTP Exception Sink
// Description: Posts already-serialized exception payloads to the
//              sdk_exception endpoint.
// Purpose: Give the error boundary a standalone reporting collaborator that
//          does not require a full Fetcher fake in tests.
// Dependencies: statsig-core, reqwest
// ============================================================================

//! ## Overview
//! [`HttpExceptionSink`] exists separately from
//! [`HttpFetcher`](crate::http_fetcher::HttpFetcher) so the error boundary
//! can be wired to a reporting collaborator without pulling in the rest of
//! the network surface. Both ultimately post to the same `sdk_exception`
//! endpoint; a deployment already holding an `HttpFetcher` can instead wire
//! `ErrorBoundary` directly through it, since `Fetcher::post_exception`
//! covers the same contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use statsig_core::ExceptionSink;

// ============================================================================
// SECTION: Sink
// ============================================================================

/// `reqwest`-backed [`ExceptionSink`] posting to
/// `https://statsigapi.net/v1/sdk_exception`.
pub struct HttpExceptionSink {
    client: Client,
    api_key: String,
    sdk_type: String,
    sdk_version: String,
}

impl HttpExceptionSink {
    /// Creates a new sink reporting SDK metadata `sdk_type`/`sdk_version`.
    ///
    /// # Errors
    ///
    /// Returns an error string when the `reqwest::Client` cannot be built.
    pub fn new(api_key: String, sdk_type: String, sdk_version: String) -> Result<Self, String> {
        let client = Client::builder().build().map_err(|err| err.to_string())?;
        Ok(Self { client, api_key, sdk_type, sdk_version })
    }

    fn headers(&self) -> Option<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("statsig-api-key"), HeaderValue::from_str(&self.api_key).ok()?);
        headers.insert(
            HeaderName::from_static("statsig-sdk-type"),
            HeaderValue::from_str(&self.sdk_type).ok()?,
        );
        headers.insert(
            HeaderName::from_static("statsig-sdk-version"),
            HeaderValue::from_str(&self.sdk_version).ok()?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Some(headers)
    }
}

#[async_trait]
impl ExceptionSink for HttpExceptionSink {
    async fn report_exception(&self, payload: &[u8]) {
        let Some(headers) = self.headers() else {
            return;
        };
        let url = "https://statsigapi.net/v1/sdk_exception";
        if let Err(err) =
            self.client.post(url).headers(headers).body(payload.to_vec()).send().await
        {
            tracing::warn!(error = %err, "failed to post sdk exception report");
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_includes_api_key_and_sdk_metadata() {
        let sink =
            HttpExceptionSink::new("secret-key".to_string(), "server-rust".to_string(), "1.0.0".to_string())
                .unwrap();
        let headers = sink.headers().unwrap();
        assert_eq!(headers.get("statsig-api-key").unwrap(), "secret-key");
        assert_eq!(headers.get("statsig-sdk-type").unwrap(), "server-rust");
        assert_eq!(headers.get("statsig-sdk-version").unwrap(), "1.0.0");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn headers_rejects_api_key_with_invalid_header_bytes() {
        let sink = HttpExceptionSink::new("bad\nkey".to_string(), "server-rust".to_string(), "1.0.0".to_string())
            .unwrap();
        assert!(sink.headers().is_none());
    }
}
