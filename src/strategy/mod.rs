//! Fetch strategies
//!
//! Two read algorithms over the cache store: cache-first for static assets
//! (stale-while-revalidate) and network-first for API and everything else,
//! with offline fallbacks and write queuing.

pub mod cache_first;
pub mod network_first;

pub use cache_first::CacheFirst;
pub use network_first::NetworkFirst;

use std::sync::Mutex;

use crate::cache::{CacheStorage, RequestKey};
use crate::net::HttpResponse;

/// Header marking a response served from the offline cache instead of the
/// live network.
pub const OFFLINE_MARKER_HEADER: &str = "x-cartrace-offline-cache";

/// Fixed body for a cache-first miss with no network
const UNAVAILABLE_BODY: &str = "Service unavailable and no cached copy exists";

/// Structured offline error for reads with no cached fallback.
///
/// Shape is part of the application contract: the UI switches to its offline
/// presentation on `cached: false`.
pub fn offline_response(message: &str) -> HttpResponse {
    HttpResponse::json(
        503,
        &serde_json::json!({
            "error": "Offline",
            "message": message,
            "cached": false,
        }),
    )
}

/// Synthetic 503 for a static asset that is neither cached nor reachable
pub fn unavailable_response() -> HttpResponse {
    HttpResponse::new(503, UNAVAILABLE_BODY.as_bytes().to_vec())
        .with_header("content-type", "text/plain")
}

/// Success-shaped acknowledgment for a write parked in the offline queue.
///
/// Deliberately not an error: the UI shows pending state, not failure.
pub fn queued_response(category: &str) -> HttpResponse {
    HttpResponse::json(
        202,
        &serde_json::json!({
            "queued": true,
            "category": category,
            "message": "Saved offline; will be submitted when connectivity returns",
        }),
    )
}

/// Store a response snapshot, logging instead of failing.
///
/// A cache write failure (quota, corrupt store) is fatal only to the write;
/// the fetched response still goes back to the caller.
pub(crate) fn store_entry(
    cache: &Mutex<CacheStorage>,
    namespace: &str,
    key: &RequestKey,
    response: &HttpResponse,
) {
    let Ok(guard) = cache.lock() else {
        log::error!("Cache lock poisoned, dropping entry for {}", key.canonical_url());
        return;
    };
    if let Err(e) = guard.put(namespace, key, response) {
        log::warn!("Failed to cache {} in {}: {}", key.canonical_url(), namespace, e);
    }
}
