//! Stateless HTTP helper shared by every source adapter.
//!
//! Every request carries the same browser-like identity and is bounded by the
//! configured timeout. Response bodies are decoded as UTF-8 with malformed
//! byte sequences dropped rather than failing the request.
//!
//! There are no retries: a failed request is reported once as a
//! [`FetchError`] and the calling adapter gives up for this run.

use crate::config::HttpConfig;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Why a request did not produce a usable body.
#[derive(Debug)]
pub enum FetchError {
    /// The request exceeded the per-request timeout.
    Timeout { url: String },
    /// The server answered with a non-2xx status.
    Status { url: String, status: StatusCode },
    /// Connection, TLS, header or body-read failure.
    Transport { url: String, source: reqwest::Error },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout { url } => write!(f, "request to {url} timed out"),
            FetchError::Status { url, status } => write!(f, "{url} answered HTTP {status}"),
            FetchError::Transport { url, source } => write!(f, "request to {url} failed: {source}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl FetchError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

/// HTTP client with a fixed identity and timeout.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
}

impl FetchClient {
    /// Build a client from the `http` section of the configuration.
    pub fn new(config: &HttpConfig) -> Result<Self, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(FetchClient { client })
    }

    /// Fetch `url` with a plain GET and return the decoded body.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.send(url, self.client.get(url)).await
    }

    /// POST `fields` as `application/x-www-form-urlencoded` with AJAX headers.
    ///
    /// `extra_headers` are applied after the fixed set, so a source can supply
    /// its own `Origin` and `Referer`.
    #[instrument(level = "debug", skip(self, fields, extra_headers))]
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        self.send(url, self.form_request(url, fields, extra_headers)).await
    }

    fn form_request(&self, url: &str, fields: &[(&str, &str)], extra_headers: &[(&str, &str)]) -> RequestBuilder {
        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header("X-Requested-With", "XMLHttpRequest")
            .form(fields);
        for (name, value) in extra_headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => request = request.header(name, value),
                _ => warn!(%name, "Skipping invalid extra header"),
            }
        }
        request
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(
            %url,
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(decode_lossy(&bytes))
    }
}

/// Decode UTF-8, silently dropping malformed byte sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
