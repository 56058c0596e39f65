//! reqwest-backed transport
//!
//! Resolves paths against a base URL, applies a per-request timeout, and keeps
//! a cookie jar so that a session cookie set by the backend (at sign-in or on
//! renewal) rides along on every later request without the caller seeing it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::cookie::Jar;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::request::{RequestAttempt, TransportResponse};
use crate::{SendFuture, Transport};

/// HTTP transport with base address, timeout and cookie jar.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    jar: Arc<Jar>,
}

impl HttpTransport {
    /// Build a transport for `base_url` (must be http or https).
    ///
    /// The timeout covers the whole exchange, body included. Expiry surfaces
    /// as `TransportError::Timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| TransportError::Config(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
            jar,
        })
    }

    /// Store a `Set-Cookie` style string in the jar, scoped to the base URL.
    pub fn add_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.base_url);
    }

    /// Resolve a request path to a full URL. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| TransportError::Config(format!("invalid base url {raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransportError::Config(format!(
            "base url must use http or https, got: {other}"
        ))),
    }
}

impl Transport for HttpTransport {
    fn id(&self) -> &str {
        "http"
    }

    fn resolve(&self, path: &str) -> String {
        self.url_for(path)
    }

    fn send(&self, attempt: RequestAttempt) -> SendFuture<'_> {
        Box::pin(async move {
            let url = self.url_for(&attempt.path);
            let mut request = self
                .client
                .request(attempt.method.clone(), &url)
                .headers(attempt.headers)
                .timeout(self.timeout);
            if let Some(body) = attempt.body {
                request = request.body(body);
            }

            let response = request.send().await.map_err(TransportError::from_reqwest)?;
            let status = response.status();
            let body = response.bytes().await.map_err(TransportError::from_reqwest)?;

            debug!(
                request_id = %attempt.id,
                method = %attempt.method,
                url = %url,
                status = status.as_u16(),
                bytes = body.len(),
                "response received"
            );

            Ok(TransportResponse::new(status, body))
        })
    }
}
