//! Cache-first strategy with stale-while-revalidate
//!
//! Static assets answer from the cache without touching the network; a
//! background fetch refreshes the entry for next time. Only a cache miss
//! waits on the network.

use std::sync::{Arc, Mutex};

use super::{store_entry, unavailable_response};
use crate::cache::{CacheStorage, RequestKey};
use crate::net::{HttpRequest, HttpResponse, Network};

/// Cache-first fetch over one namespace.
pub struct CacheFirst {
    cache: Arc<Mutex<CacheStorage>>,
    network: Arc<dyn Network>,
    namespace: String,
}

impl CacheFirst {
    pub fn new(
        cache: Arc<Mutex<CacheStorage>>,
        network: Arc<dyn Network>,
        namespace: String,
    ) -> Self {
        Self {
            cache,
            network,
            namespace,
        }
    }

    /// Serve a request, preferring the cached snapshot.
    ///
    /// A hit returns immediately and spawns a revalidation task that is not
    /// awaited; last writer wins if several revalidations race. A miss goes
    /// to the network and caches the result; with no network either, a
    /// synthetic 503 comes back.
    pub async fn fetch(&self, request: &HttpRequest) -> HttpResponse {
        let key = RequestKey::new(&request.method, &request.url);

        let cached = match self.cache.lock() {
            Ok(guard) => guard.get(&self.namespace, &key).ok().flatten(),
            Err(_) => {
                log::error!("Cache lock poisoned, treating {} as a miss", request.url);
                None
            }
        };

        if let Some(entry) = cached {
            log::debug!("Cache hit: {} {}", request.method, request.url);
            self.spawn_revalidation(request.clone(), key);
            return entry.into_response();
        }

        match self.network.send(request).await {
            Ok(response) => {
                if response.is_success() {
                    store_entry(&self.cache, &self.namespace, &key, &response);
                }
                response
            }
            Err(e) => {
                log::warn!("Static fetch failed for {}: {}", request.url, e);
                unavailable_response()
            }
        }
    }

    fn spawn_revalidation(&self, request: HttpRequest, key: RequestKey) {
        let cache = Arc::clone(&self.cache);
        let network = Arc::clone(&self.network);
        let namespace = self.namespace.clone();

        tokio::spawn(async move {
            match network.send(&request).await {
                Ok(response) if response.is_success() => {
                    store_entry(&cache, &namespace, &key, &response);
                }
                Ok(response) => {
                    log::debug!(
                        "Revalidation of {} returned {}, keeping cached copy",
                        request.url,
                        response.status
                    );
                }
                Err(e) => {
                    log::debug!("Revalidation of {} failed: {}", request.url, e);
                }
            }
        });
    }
}
