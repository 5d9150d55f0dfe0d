//! Network boundary for the offline engine
//!
//! All outbound traffic goes through the [`Network`] trait so the strategies,
//! lifecycle, and queue replay can be exercised against a mock without a
//! server.

use async_trait::async_trait;

pub mod http;
#[cfg(test)]
pub mod mock;

#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockNetwork;
pub use http::HttpNetwork;
pub use reqwest::Method;

use crate::error::NetworkError;

/// An outbound HTTP request as the engine sees it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A bare GET request for a URL
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Build a request with a method, body, and content type
    pub fn with_body(
        method: Method,
        url: impl Into<String>,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Self {
        let mut headers = Vec::new();
        if let Some(ct) = content_type {
            headers.push(("content-type".to_string(), ct.to_string()));
        }
        Self {
            method,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }

    /// Add a header, consuming and returning the request
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Look up a header value, case-insensitively
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The path component of the request URL.
    ///
    /// Falls back to treating the whole string as a path when it is not an
    /// absolute URL (the application issues same-origin paths).
    pub fn path(&self) -> String {
        match reqwest::Url::parse(&self.url) {
            Ok(url) => url.path().to_string(),
            Err(_) => {
                let without_query = self.url.split(['?', '#']).next().unwrap_or("");
                without_query.to_string()
            }
        }
    }

    /// Whether this request is an HTML navigation (browser page load)
    pub fn is_navigation(&self) -> bool {
        self.method == Method::GET
            && self
                .header_value("accept")
                .is_some_and(|v| v.contains("text/html"))
    }
}

/// An HTTP response snapshot: status, headers, body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response with a status and body
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Build a JSON response
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "application/json".to_string(),
            )],
            body: value.to_string().into_bytes(),
        }
    }

    /// Add a header, consuming and returning the response
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Look up a header value, case-insensitively
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transport the engine talks through.
///
/// Implementations: [`HttpNetwork`] (reqwest) and, in tests, a scriptable
/// mock.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request and return the response.
    ///
    /// An `Err` means the request never completed (offline, timeout); HTTP
    /// error statuses come back as `Ok` responses.
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, NetworkError>;
}
