//! Mock network for testing
//!
//! Scriptable [`Network`] implementation: register responses or failures per
//! route, flip the whole transport offline, and inspect what was sent.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{HttpRequest, HttpResponse, Network};
use crate::error::NetworkError;

/// Mock network transport.
///
/// Routes are keyed by `"METHOD url"`. Unscripted routes answer 200 with an
/// empty body so precache-style tests need no per-URL setup.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, HttpResponse>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    sent: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
}

fn route_key(method: &reqwest::Method, url: &str) -> String {
    format!("{} {}", method, url)
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a method + URL
    pub fn with_response(self, method: reqwest::Method, url: &str, response: HttpResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(route_key(&method, url), response);
        self
    }

    /// Script a transport failure for a method + URL
    pub fn with_failure(self, method: reqwest::Method, url: &str) -> Self {
        self.failing.lock().unwrap().insert(route_key(&method, url));
        self
    }

    /// Add artificial latency to every send (for concurrency tests)
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    /// Take the transport fully offline (or back online)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every request sent through this transport, in order
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of sends matching a URL (any method)
    pub fn sends_to(&self, url: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, NetworkError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.sent.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Connect("mock transport offline".to_string()));
        }

        let key = route_key(&request.method, &request.url);
        if self.failing.lock().unwrap().contains(&key) {
            return Err(NetworkError::Connect(format!("scripted failure: {key}")));
        }

        let scripted = self.routes.lock().unwrap().get(&key).cloned();
        Ok(scripted.unwrap_or_else(|| HttpResponse::new(200, Vec::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Method;

    #[tokio::test]
    async fn test_unscripted_route_answers_ok() {
        let mock = MockNetwork::new();
        let resp = mock.send(&HttpRequest::get("/index.html")).await.unwrap();
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_scripted_response() {
        let mock = MockNetwork::new().with_response(
            Method::GET,
            "/api/alerts",
            HttpResponse::new(200, b"[]".to_vec()),
        );

        let resp = mock.send(&HttpRequest::get("/api/alerts")).await.unwrap();
        assert_eq!(resp.body, b"[]");
    }

    #[tokio::test]
    async fn test_scripted_failure_only_hits_that_route() {
        let mock = MockNetwork::new().with_failure(Method::GET, "/app.js");

        assert!(mock.send(&HttpRequest::get("/app.js")).await.is_err());
        assert!(mock.send(&HttpRequest::get("/styles.css")).await.is_ok());
    }

    #[tokio::test]
    async fn test_offline_fails_everything_and_records_sends() {
        let mock = MockNetwork::new();
        mock.set_offline(true);

        assert!(mock.send(&HttpRequest::get("/index.html")).await.is_err());
        assert_eq!(mock.sends_to("/index.html"), 1);

        mock.set_offline(false);
        assert!(mock.send(&HttpRequest::get("/index.html")).await.is_ok());
        assert_eq!(mock.sends_to("/index.html"), 2);
    }
}
