//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Transport implementations for outbound registry calls."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! JSON-over-HTTP transport used to reach inbox endpoints.
//!
//! A [`JsonClient`] is bound to one inbox base URL plus a path prefix and
//! issues GET/POST/PUT requests against paths below it, returning the raw
//! response body. Every request is bounded by the client timeout so a hung
//! peer cannot stall the caller indefinitely.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Failures raised by [`JsonClient`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{method} {url} failed: {source}")]
    Request {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned status {status}")]
    Status {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to encode request payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    /// True when the request was abandoned because the client timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Request { source, .. } if source.is_timeout())
    }
}

/// HTTP client issuing JSON requests below `inbox + context`.
#[derive(Debug, Clone)]
pub struct JsonClient {
    base: String,
    http: Client,
}

impl JsonClient {
    /// Build a client for `inbox` (scheme and authority, e.g. `http://registry:8080`)
    /// and a `context` path prefix such as `registry/rest/v1`.
    pub fn new(
        inbox: impl AsRef<str>,
        context: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self::with_client(inbox, context, http))
    }

    /// Build a client around an existing [`reqwest::Client`].
    pub fn with_client(inbox: impl AsRef<str>, context: impl AsRef<str>, http: Client) -> Self {
        let inbox = inbox.as_ref().trim_end_matches('/');
        let context = context.as_ref().trim_matches('/');
        let base = if context.is_empty() {
            inbox.to_owned()
        } else {
            format!("{inbox}/{context}")
        };
        Self { base, http }
    }

    /// Base URL every request path is appended to.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve `path` below the client base.
    pub fn request_url(&self, path: &str) -> Result<Url, TransportError> {
        let raw = if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        };
        Url::parse(&raw).map_err(|source| TransportError::InvalidUrl { url: raw, source })
    }

    /// Perform an HTTP GET.
    pub async fn get(&self, path: &str) -> Result<Bytes, TransportError> {
        let url = self.request_url(path)?;
        debug!(method = "GET", %url, "issuing request");
        let response = self.http.get(url.clone()).send().await;
        Self::finish(Method::GET, url, response).await
    }

    /// Perform an HTTP POST with a JSON payload.
    pub async fn post<T>(&self, path: &str, payload: &T) -> Result<Bytes, TransportError>
    where
        T: Serialize + ?Sized,
    {
        self.send_json(Method::POST, path, payload).await
    }

    /// Perform an HTTP PUT with a JSON payload.
    pub async fn put<T>(&self, path: &str, payload: &T) -> Result<Bytes, TransportError>
    where
        T: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, path, payload).await
    }

    async fn send_json<T>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
    ) -> Result<Bytes, TransportError>
    where
        T: Serialize + ?Sized,
    {
        let url = self.request_url(path)?;
        let body = serde_json::to_vec(payload)?;
        debug!(%method, %url, payload = %String::from_utf8_lossy(&body), "issuing request");
        let response = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;
        Self::finish(method, url, response).await
    }

    async fn finish(
        method: Method,
        url: Url,
        response: Result<Response, reqwest::Error>,
    ) -> Result<Bytes, TransportError> {
        let response = match response {
            Ok(response) => response,
            Err(source) => {
                let err = TransportError::Request {
                    method,
                    url: url.to_string(),
                    source,
                };
                if err.is_timeout() {
                    warn!(%url, error = %err, "request timed out");
                } else {
                    warn!(%url, error = %err, "request failed");
                }
                return Err(err);
            }
        };
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                method: method.clone(),
                url: url.to_string(),
                source,
            })?;
        if !status.is_success() {
            warn!(%method, %url, status = status.as_u16(), "request rejected");
            return Err(TransportError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }
}
