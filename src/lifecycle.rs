//! Install and activate lifecycle
//!
//! Install precaches the static manifest into the new generation's
//! namespace, all-or-nothing. Activate evicts every stale generation this
//! product owns, leaving foreign caches alone.

use std::sync::{Arc, Mutex};

use crate::cache::{CacheStorage, Namespaces, RequestKey};
use crate::config::Config;
use crate::error::InstallError;
use crate::net::{HttpRequest, HttpResponse, Network};

/// Lifecycle manager for one cache generation.
pub struct Lifecycle {
    cache: Arc<Mutex<CacheStorage>>,
    network: Arc<dyn Network>,
    namespaces: Namespaces,
    origin: String,
}

impl Lifecycle {
    pub fn new(cache: Arc<Mutex<CacheStorage>>, network: Arc<dyn Network>, config: &Config) -> Self {
        Self {
            cache,
            network,
            namespaces: config.namespaces(),
            origin: config.origin.clone(),
        }
    }

    /// Precache the manifest into the static namespace, atomically.
    ///
    /// Every URL is fetched first; a single transport failure or non-success
    /// status aborts the whole install before anything is written, so a
    /// failed install leaves the previous generation fully authoritative.
    pub async fn install(&self, manifest: &[String]) -> Result<(), InstallError> {
        let namespace = self.namespaces.statics();
        log::info!("Installing {} assets into {}", manifest.len(), namespace);

        let fetched = self.fetch_all(manifest).await?;

        let guard = self.cache.lock().map_err(|_| InstallError::Populate {
            namespace: namespace.clone(),
            source: crate::error::StoreError::Io("cache lock poisoned".to_string()),
        })?;

        for (url, response) in &fetched {
            let key = RequestKey::new(&crate::net::Method::GET, url);
            if let Err(source) = guard.put(&namespace, &key, response) {
                // Roll back so a half-populated generation never looks installed
                if let Err(e) = guard.delete_namespace(&namespace) {
                    log::error!("Rollback of {} failed: {}", namespace, e);
                }
                return Err(InstallError::Populate {
                    namespace: namespace.clone(),
                    source,
                });
            }
        }

        log::info!("Install complete: {} assets cached", fetched.len());
        Ok(())
    }

    /// Delete every stale namespace this product owns.
    ///
    /// Returns the evicted namespace names. Caches belonging to other
    /// products sharing the store are never touched.
    pub fn activate(&self) -> Vec<String> {
        let Ok(guard) = self.cache.lock() else {
            log::error!("Cache lock poisoned, skipping activation sweep");
            return Vec::new();
        };

        let all = match guard.namespaces() {
            Ok(all) => all,
            Err(e) => {
                log::error!("Failed to enumerate cache namespaces: {}", e);
                return Vec::new();
            }
        };

        let mut evicted = Vec::new();
        for namespace in all {
            if !self.namespaces.is_stale(&namespace) {
                continue;
            }
            match guard.delete_namespace(&namespace) {
                Ok(count) => {
                    log::info!("Evicted stale cache {} ({} entries)", namespace, count);
                    evicted.push(namespace);
                }
                Err(e) => {
                    log::error!("Failed to evict {}: {}", namespace, e);
                }
            }
        }

        evicted
    }

    /// Fetch and cache URLs on demand, best effort.
    ///
    /// Unlike install, each URL stands alone: failures are logged and
    /// skipped. Returns the number of URLs actually cached.
    pub async fn precache(&self, urls: &[String]) -> usize {
        let namespace = self.namespaces.statics();
        let mut cached = 0;

        for url in urls {
            let resolved = self.resolve(url);
            let request = HttpRequest::get(&resolved);
            match self.network.send(&request).await {
                Ok(response) if response.is_success() => {
                    let key = RequestKey::new(&crate::net::Method::GET, &resolved);
                    let Ok(guard) = self.cache.lock() else {
                        log::error!("Cache lock poisoned during precache");
                        return cached;
                    };
                    match guard.put(&namespace, &key, &response) {
                        Ok(()) => cached += 1,
                        Err(e) => log::warn!("Failed to precache {}: {}", resolved, e),
                    }
                }
                Ok(response) => {
                    log::warn!("Precache of {} returned {}, skipping", resolved, response.status);
                }
                Err(e) => {
                    log::warn!("Precache of {} failed: {}", resolved, e);
                }
            }
        }

        cached
    }

    async fn fetch_all(
        &self,
        manifest: &[String],
    ) -> Result<Vec<(String, HttpResponse)>, InstallError> {
        let resolved: Vec<String> = manifest.iter().map(|url| self.resolve(url)).collect();

        let fetches = resolved.iter().map(|url| {
            let request = HttpRequest::get(url);
            let network = Arc::clone(&self.network);
            async move { network.send(&request).await }
        });
        let results = futures::future::join_all(fetches).await;

        let mut fetched = Vec::with_capacity(resolved.len());
        for (url, result) in resolved.into_iter().zip(results) {
            match result {
                Ok(response) if response.is_success() => {
                    fetched.push((url, response));
                }
                Ok(response) => {
                    return Err(InstallError::PrecacheStatus {
                        url,
                        status: response.status,
                    });
                }
                Err(e) => {
                    return Err(InstallError::Precache {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(fetched)
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.origin.trim_end_matches('/'), url)
        } else {
            url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Method;
    use crate::net::mock::MockNetwork;
    use tempfile::TempDir;

    fn test_config(version: &str) -> Config {
        Config {
            version: version.to_string(),
            ..Config::default()
        }
    }

    fn setup(mock: MockNetwork, version: &str) -> (Lifecycle, Arc<Mutex<CacheStorage>>, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(Mutex::new(CacheStorage::open_at(dir.path()).unwrap()));
        let lifecycle = Lifecycle::new(cache.clone(), Arc::new(mock), &test_config(version));
        (lifecycle, cache, dir)
    }

    fn manifest(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_install_caches_whole_manifest() {
        let mock = MockNetwork::new()
            .with_response(
                Method::GET,
                "https://cartrace.app/app.js",
                HttpResponse::new(200, b"js".to_vec()),
            )
            .with_response(
                Method::GET,
                "https://cartrace.app/styles.css",
                HttpResponse::new(200, b"css".to_vec()),
            );
        let (lifecycle, cache, _dir) = setup(mock, "v1.0.0");

        lifecycle
            .install(&manifest(&["/app.js", "/styles.css"]))
            .await
            .unwrap();

        let guard = cache.lock().unwrap();
        let key = RequestKey::new(&Method::GET, "https://cartrace.app/app.js");
        let entry = guard.get("cartrace-v1.0.0", &key).unwrap().unwrap();
        assert_eq!(entry.body, b"js");
        assert_eq!(guard.stats("cartrace-v1.0.0").unwrap().entries, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_aborts_install_without_writes() {
        let mock = MockNetwork::new()
            .with_response(
                Method::GET,
                "https://cartrace.app/app.js",
                HttpResponse::new(200, b"js".to_vec()),
            )
            .with_failure(Method::GET, "https://cartrace.app/styles.css");
        let (lifecycle, cache, _dir) = setup(mock, "v1.0.0");

        let err = lifecycle
            .install(&manifest(&["/app.js", "/styles.css"]))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Precache { .. }));

        // Nothing was written, not even the asset that fetched fine
        let guard = cache.lock().unwrap();
        assert_eq!(guard.stats("cartrace-v1.0.0").unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_error_status_aborts_install() {
        let mock = MockNetwork::new().with_response(
            Method::GET,
            "https://cartrace.app/missing.js",
            HttpResponse::new(404, Vec::new()),
        );
        let (lifecycle, cache, _dir) = setup(mock, "v1.0.0");

        let err = lifecycle.install(&manifest(&["/missing.js"])).await.unwrap_err();
        assert!(matches!(err, InstallError::PrecacheStatus { status: 404, .. }));
        assert_eq!(cache.lock().unwrap().stats("cartrace-v1.0.0").unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_activate_evicts_only_stale_own_namespaces() {
        let (lifecycle, cache, _dir) = setup(MockNetwork::new(), "v2.0.0");
        let body = HttpResponse::new(200, b"x".to_vec());
        let key = RequestKey::new(&Method::GET, "/a");
        {
            let guard = cache.lock().unwrap();
            guard.put("cartrace-v1.0.0", &key, &body).unwrap();
            guard.put("cartrace-api-v1.0.0", &key, &body).unwrap();
            guard.put("cartrace-v2.0.0", &key, &body).unwrap();
            guard.put("cartrace-api-v2.0.0", &key, &body).unwrap();
            guard.put("otherapp-v1.0.0", &key, &body).unwrap();
        }

        let mut evicted = lifecycle.activate();
        evicted.sort();
        assert_eq!(evicted, vec!["cartrace-api-v1.0.0", "cartrace-v1.0.0"]);

        let guard = cache.lock().unwrap();
        let mut remaining = guard.namespaces().unwrap();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["cartrace-api-v2.0.0", "cartrace-v2.0.0", "otherapp-v1.0.0"]
        );
    }

    #[tokio::test]
    async fn test_activate_with_empty_store() {
        let (lifecycle, _cache, _dir) = setup(MockNetwork::new(), "v1.0.0");
        assert!(lifecycle.activate().is_empty());
    }

    #[tokio::test]
    async fn test_precache_is_best_effort() {
        let mock = MockNetwork::new()
            .with_response(
                Method::GET,
                "https://cartrace.app/map-tiles/1.png",
                HttpResponse::new(200, b"tile".to_vec()),
            )
            .with_failure(Method::GET, "https://cartrace.app/map-tiles/2.png");
        let (lifecycle, cache, _dir) = setup(mock, "v1.0.0");

        let cached = lifecycle
            .precache(&manifest(&["/map-tiles/1.png", "/map-tiles/2.png"]))
            .await;
        assert_eq!(cached, 1);

        let guard = cache.lock().unwrap();
        let key = RequestKey::new(&Method::GET, "https://cartrace.app/map-tiles/1.png");
        assert!(guard.get("cartrace-v1.0.0", &key).unwrap().is_some());
    }
}
