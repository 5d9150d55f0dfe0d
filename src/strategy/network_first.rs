//! Network-first strategy with offline fallbacks
//!
//! API and navigation traffic always tries the live network. Failed reads
//! fall back to the cache (marked as offline) or a structured offline error;
//! failed writes are parked in the offline queue behind a success-shaped
//! acknowledgment.

use std::sync::{Arc, Mutex};

use super::{OFFLINE_MARKER_HEADER, offline_response, queued_response, store_entry};
use crate::cache::{CacheStorage, RequestKey};
use crate::classify::{RequestClass, category_for_path};
use crate::net::{HttpRequest, HttpResponse, Method, Network};
use crate::queue::{NewQueueItem, QueueStorage};

/// Network-first fetch over the current cache generation.
pub struct NetworkFirst {
    cache: Arc<Mutex<CacheStorage>>,
    queue: Arc<Mutex<QueueStorage>>,
    network: Arc<dyn Network>,
    static_namespace: String,
    api_namespace: String,
    api_root: String,
    /// Fully resolved URL of the offline placeholder page
    offline_page_url: String,
}

impl NetworkFirst {
    pub fn new(
        cache: Arc<Mutex<CacheStorage>>,
        queue: Arc<Mutex<QueueStorage>>,
        network: Arc<dyn Network>,
        static_namespace: String,
        api_namespace: String,
        api_root: String,
        offline_page_url: String,
    ) -> Self {
        Self {
            cache,
            queue,
            network,
            static_namespace,
            api_namespace,
            api_root,
            offline_page_url,
        }
    }

    /// Serve a request, preferring the live network.
    pub async fn fetch(&self, request: &HttpRequest, class: RequestClass) -> HttpResponse {
        match class {
            RequestClass::Write => self.write(request).await,
            _ => self.read(request, class).await,
        }
    }

    async fn read(&self, request: &HttpRequest, class: RequestClass) -> HttpResponse {
        let namespace = match class {
            RequestClass::ApiRead => &self.api_namespace,
            _ => &self.static_namespace,
        };
        let key = RequestKey::new(&request.method, &request.url);

        match self.network.send(request).await {
            Ok(response) => {
                if response.is_success() {
                    store_entry(&self.cache, namespace, &key, &response);
                }
                response
            }
            Err(e) => {
                log::info!("Network read failed for {}: {}, trying cache", request.url, e);
                self.read_fallback(request, namespace, &key)
            }
        }
    }

    /// Offline read path: cached entry, then the offline page for
    /// navigations, then the structured offline error.
    fn read_fallback(
        &self,
        request: &HttpRequest,
        namespace: &str,
        key: &RequestKey,
    ) -> HttpResponse {
        let Ok(cache) = self.cache.lock() else {
            log::error!("Cache lock poisoned during offline fallback");
            return offline_response("No connection and the local cache is unavailable");
        };

        if let Ok(Some(entry)) = cache.get(namespace, key) {
            log::debug!("Serving {} from offline cache", request.url);
            return entry
                .into_response()
                .with_header(OFFLINE_MARKER_HEADER, "true");
        }

        if request.is_navigation() {
            let offline_key = RequestKey::new(&Method::GET, &self.offline_page_url);
            if let Ok(Some(entry)) = cache.get(&self.static_namespace, &offline_key) {
                return entry
                    .into_response()
                    .with_header(OFFLINE_MARKER_HEADER, "true");
            }
        }

        offline_response("No connection and no cached copy of this resource")
    }

    async fn write(&self, request: &HttpRequest) -> HttpResponse {
        match self.network.send(request).await {
            Ok(response) => response,
            Err(e) => {
                let category = category_for_path(&request.path(), &self.api_root);
                log::info!(
                    "Write {} {} failed ({}), queuing as {}",
                    request.method,
                    request.url,
                    e,
                    category
                );
                self.enqueue_write(request, &category)
            }
        }
    }

    fn enqueue_write(&self, request: &HttpRequest, category: &str) -> HttpResponse {
        let item = NewQueueItem {
            url: request.url.clone(),
            method: request.method.clone(),
            body: request.body.clone(),
            content_type: request.header_value("content-type").map(String::from),
            category: category.to_string(),
        };

        let Ok(queue) = self.queue.lock() else {
            log::error!("Queue lock poisoned, dropping write {}", request.url);
            return offline_response("No connection and the offline queue is unavailable");
        };

        match queue.enqueue(item) {
            Ok(id) => {
                log::debug!("Queued write {} as item {}", request.url, id);
                queued_response(category)
            }
            Err(e) => {
                log::error!("Failed to queue write {}: {}", request.url, e);
                offline_response("No connection and the offline queue is unavailable")
            }
        }
    }
}
