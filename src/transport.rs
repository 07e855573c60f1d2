use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{redirect::Policy, Method};
use thiserror::Error;
use tracing::trace;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error")]
    Http(#[from] reqwest::Error),

    #[error("Could not connect to host: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Received HTTP {status}, redirects are not followed (location: {})", .location.as_deref().unwrap_or("none"))]
    Redirect {
        status: u16,
        location: Option<String>,
    },

    #[error("{0}")]
    Other(String),
}

/// A fully encoded SOAP request. Built fresh for every call and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Method,
    pub uri: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

impl WireResponse {
    pub fn new<B: Into<Bytes>>(status: u16, body: B) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Sends requests on behalf of a [`crate::Client`].
///
/// Implementations hand every HTTP status back as a response, error statuses
/// included, and never follow redirects.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// [`Transport`] over an async reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[derive(Debug, Default, Clone)]
pub struct ReqwestTransportBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let mut builder = reqwest::Client::builder().redirect(Policy::none());

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(ReqwestTransport {
            client: builder.build()?,
        })
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Http(err)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        trace!(uri = %request.uri, "sending request");

        let mut builder = self.client.request(request.method, request.uri);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await.map_err(map_error)?;
        let status = response.status().as_u16();

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();

        let body = response.bytes().await.map_err(map_error)?;
        trace!(status, length = body.len(), "received response");

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let response = WireResponse::new(302, "").with_header("Location", "http://example.com/");

        assert_eq!(response.header("location"), Some("http://example.com/"));
        assert!(response.is_redirect());
        assert!(!WireResponse::new(500, "").is_redirect());
    }

    #[test]
    fn redirect_error_mentions_redirects() {
        let err = TransportError::Redirect {
            status: 301,
            location: Some("http://example.com/".to_owned()),
        };

        assert!(err.to_string().contains("redirects"));
    }

    #[test]
    fn builds_without_redirects() {
        assert!(ReqwestTransport::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("suds")
            .build()
            .is_ok());
    }
}
