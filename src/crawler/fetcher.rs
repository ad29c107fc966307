//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building the HTTP client with timeouts and compression
//! - GET requests that race a cancellation token
//! - Error classification into statuses and transport failures

use crate::config::HttpConfig;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered with a 2xx status
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Response body
        body: String,
    },

    /// The server answered with a non-2xx status (429 included)
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// No usable response (connection refused, timeout, broken body, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// The cancellation token fired before the request finished
    Cancelled,
}

impl FetchResult {
    /// Status code to feed into the rate governor, if the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Success { status_code, .. } | Self::HttpError { status_code } => {
                StatusCode::from_u16(*status_code).ok()
            }
            _ => None,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Per-request identity headers are added by the caller, so the client
/// itself carries no user agent.
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::HttpConfig;
/// use listing_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .https_only(config.https_only)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, giving up early if `cancel` fires
///
/// # Error Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success |
/// | Any other status | HttpError |
/// | Timeout / connect / body error | NetworkError |
/// | Token cancelled | Cancelled |
pub async fn fetch_url(
    client: &Client,
    url: &Url,
    headers: HeaderMap,
    cancel: &CancellationToken,
) -> FetchResult {
    if cancel.is_cancelled() {
        return FetchResult::Cancelled;
    }

    let request = client.get(url.clone()).headers(headers).send();
    let response = tokio::select! {
        result = request => result,
        _ = cancel.cancelled() => {
            tracing::debug!("Request cancelled: {}", url);
            return FetchResult::Cancelled;
        }
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let body = tokio::select! {
        result = response.text() => result,
        _ = cancel.cancelled() => {
            tracing::debug!("Body read cancelled: {}", url);
            return FetchResult::Cancelled;
        }
    };

    match body {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: format!("Failed to read body: {}", e),
        },
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
