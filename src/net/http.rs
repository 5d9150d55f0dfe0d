//! reqwest-backed network implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::{HttpRequest, HttpResponse, Network};
use crate::error::NetworkError;

/// Default request timeout, matching the platform request lifecycle
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Live network transport built on reqwest.
pub struct HttpNetwork {
    http: HttpClient,
}

impl HttpNetwork {
    /// Create a transport with the default timeout
    pub fn new() -> std::result::Result<Self, NetworkError> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, NetworkError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|_| NetworkError::InvalidUrl(request.url.clone()))?;

        let mut builder = self.http.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(NetworkError::from)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(NetworkError::from)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
