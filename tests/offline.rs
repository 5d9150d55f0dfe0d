//! End-to-end tests over a real HTTP transport.
//!
//! These talk to a local mockito server through `HttpNetwork`, so they are
//! gated behind the `http-tests` feature:
//!
//!     cargo test --features http-tests

use std::sync::Arc;

use cartrace_offline::engine::{Engine, Outcome, WorkerEvent};
use cartrace_offline::net::{HttpNetwork, HttpRequest, Method};
use cartrace_offline::notify::{Notification, NotificationSink, WindowClients};
use cartrace_offline::Config;
use tempfile::TempDir;

struct NullSink;
impl NotificationSink for NullSink {
    fn show(&self, _: &Notification) {}
    fn dismiss(&self, _: &Notification) {}
}

struct NullWindows;
impl WindowClients for NullWindows {
    fn focus(&self, _: &str) -> bool {
        false
    }
    fn open(&self, _: &str) {}
}

fn engine_for(origin: &str, version: &str, dir: &TempDir) -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Config {
        origin: origin.to_string(),
        version: version.to_string(),
        precache: vec!["/index.html".to_string(), "/offline.html".to_string()],
        ..Config::default()
    };
    Engine::open_at(
        config,
        Arc::new(HttpNetwork::new().unwrap()),
        Box::new(NullSink),
        Box::new(NullWindows),
        dir.path(),
    )
    .unwrap()
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[tokio::test]
async fn test_install_precaches_and_serves_without_server() {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("GET", "/index.html")
        .with_status(200)
        .with_body("<html>live</html>")
        .expect(1)
        .create_async()
        .await;
    let offline = server
        .mock("GET", "/offline.html")
        .with_status(200)
        .with_body("<h1>Offline</h1>")
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let engine = engine_for(&server.url(), "v1.0.0", &dir);

    let outcome = engine.handle(WorkerEvent::Install).await.unwrap();
    assert!(matches!(outcome, Outcome::Installed));
    index.assert_async().await;
    offline.assert_async().await;

    // Cache-first: the stored copy answers, the server is not consulted
    let resp = engine
        .fetch(&HttpRequest::get(format!("{}/index.html", server.url())))
        .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"<html>live</html>");
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[tokio::test]
async fn test_install_aborts_on_missing_manifest_asset() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/index.html")
        .with_status(200)
        .with_body("<html>")
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/offline.html")
        .with_status(404)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let engine = engine_for(&server.url(), "v1.0.0", &dir);

    assert!(engine.handle(WorkerEvent::Install).await.is_err());
    let (statics, _) = engine.cache_stats().unwrap();
    assert_eq!(statics.entries, 0);
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[tokio::test]
async fn test_version_bump_evicts_previous_generation() {
    let mut server = mockito::Server::new_async().await;
    let _assets = server
        .mock("GET", mockito::Matcher::Any)
        .with_status(200)
        .with_body("asset")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let v1 = engine_for(&server.url(), "v1.0.0", &dir);
    v1.handle(WorkerEvent::Install).await.unwrap();

    let v2 = engine_for(&server.url(), "v2.0.0", &dir);
    v2.handle(WorkerEvent::Install).await.unwrap();

    match v2.handle(WorkerEvent::Activate).await.unwrap() {
        Outcome::Activated { mut evicted } => {
            evicted.sort();
            assert_eq!(evicted, vec!["cartrace-v1.0.0"]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let (v2_statics, _) = v2.cache_stats().unwrap();
    assert_eq!(v2_statics.entries, 2);
    let (v1_statics, _) = v1.cache_stats().unwrap();
    assert_eq!(v1_statics.entries, 0);
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[tokio::test]
async fn test_api_read_cached_through_real_transport() {
    let mut server = mockito::Server::new_async().await;
    let _alerts = server
        .mock("GET", "/api/alerts")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[{\"id\":1}]")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let engine = engine_for(&server.url(), "v1.0.0", &dir);

    let resp = engine
        .fetch(&HttpRequest::get(format!("{}/api/alerts", server.url())))
        .await;
    assert_eq!(resp.status, 200);

    let (_, api) = engine.cache_stats().unwrap();
    assert_eq!(api.entries, 1);
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[tokio::test]
async fn test_unreachable_write_queued_and_retained_by_sync() {
    // Port 9 (discard) is not listening; every send is a transport error
    let dead_origin = "http://127.0.0.1:9";
    let dir = TempDir::new().unwrap();
    let engine = engine_for(dead_origin, "v1.0.0", &dir);

    let req = HttpRequest::with_body(
        Method::POST,
        format!("{}/api/sightings", dead_origin),
        br#"{"plate":"XYZ-123"}"#.to_vec(),
        Some("application/json"),
    );
    let resp = engine.fetch(&req).await;
    assert_eq!(resp.status, 202);

    // Still unreachable: the drain keeps the item for next time
    match engine.handle(WorkerEvent::Sync).await.unwrap() {
        Outcome::Synced(report) => {
            assert_eq!(report.attempted, 1);
            assert_eq!(report.retained, 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        engine.pending_actions().unwrap(),
        vec![("sightings".to_string(), 1)]
    );
}
