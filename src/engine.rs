//! The offline engine: one dispatcher over every worker event
//!
//! Owns the stores and strategies and routes lifecycle, fetch, sync, and
//! push events to them. Fetch handling is total: whatever the state of the
//! network or the stores, a fetch always gets a response back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::{CacheStats, CacheStorage};
use crate::classify::{RequestClass, category_for_path};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lifecycle::Lifecycle;
use crate::net::{HttpRequest, HttpResponse, Network};
use crate::notify::{Notification, NotificationRouter, NotificationSink, WindowClients};
use crate::queue::{self, DrainReport, QueueStorage};
use crate::strategy::{CacheFirst, NetworkFirst};

/// An event delivered to the worker.
#[derive(Debug)]
pub enum WorkerEvent {
    /// A new engine version is being installed
    Install,
    /// The engine version has taken over; stale caches can go
    Activate,
    /// An intercepted application request
    Fetch(HttpRequest),
    /// A control message from an application page
    Message(ControlMessage),
    /// Connectivity is back; drain the offline queue
    Sync,
    /// An incoming push, with its raw payload if any
    Push(Option<Vec<u8>>),
    /// A click on a displayed notification
    NotificationClick {
        action: Option<String>,
        notification: Notification,
    },
}

/// Control messages pages can post to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Take over immediately instead of waiting for old pages to close
    SkipWaiting,
    /// Cache the given URLs on demand, best effort
    Precache(Vec<String>),
    /// Drop one cache namespace
    ClearNamespace(String),
}

/// What handling an event produced.
#[derive(Debug)]
pub enum Outcome {
    /// Install finished; the manifest is cached
    Installed,
    /// Activation swept these stale namespaces
    Activated { evicted: Vec<String> },
    /// The response for a fetch
    Response(HttpResponse),
    /// A drain pass finished
    Synced(DrainReport),
    /// A notification was shown for a push
    Notified(Notification),
    /// The event needed no further action
    Done,
}

/// Central dispatcher over the cache, queue, strategies, and router.
pub struct Engine {
    config: Config,
    cache: Arc<Mutex<CacheStorage>>,
    queue: Arc<Mutex<QueueStorage>>,
    network: Arc<dyn Network>,
    lifecycle: Lifecycle,
    cache_first: CacheFirst,
    network_first: NetworkFirst,
    router: NotificationRouter,
    skip_waiting: AtomicBool,
}

impl Engine {
    /// Build an engine over the configured data directory.
    pub fn new(
        config: Config,
        network: Arc<dyn Network>,
        sink: Box<dyn NotificationSink>,
        windows: Box<dyn WindowClients>,
    ) -> Result<Self> {
        let dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => CacheStorage::default_dir()?,
        };
        Self::open_at(config, network, sink, windows, &dir)
    }

    /// Build an engine with its stores under a specific directory.
    pub fn open_at(
        config: Config,
        network: Arc<dyn Network>,
        sink: Box<dyn NotificationSink>,
        windows: Box<dyn WindowClients>,
        dir: &std::path::Path,
    ) -> Result<Self> {
        let cache = Arc::new(Mutex::new(CacheStorage::open_at(dir)?));
        let queue = Arc::new(Mutex::new(QueueStorage::open_at(dir)?));
        let namespaces = config.namespaces();

        let lifecycle = Lifecycle::new(cache.clone(), network.clone(), &config);
        let cache_first = CacheFirst::new(cache.clone(), network.clone(), namespaces.statics());
        let network_first = NetworkFirst::new(
            cache.clone(),
            queue.clone(),
            network.clone(),
            namespaces.statics(),
            namespaces.api(),
            config.api_root.clone(),
            config.resolve(&config.offline_page),
        );
        let router = NotificationRouter::new(sink, windows, config.default_route.clone());

        Ok(Self {
            config,
            cache,
            queue,
            network,
            lifecycle,
            cache_first,
            network_first,
            router,
            skip_waiting: AtomicBool::new(false),
        })
    }

    /// Dispatch one worker event.
    ///
    /// Only install can fail; a failed install means the new version must
    /// not take over. Everything else degrades internally and reports
    /// through the outcome.
    pub async fn handle(&self, event: WorkerEvent) -> Result<Outcome> {
        match event {
            WorkerEvent::Install => {
                self.lifecycle
                    .install(&self.config.precache)
                    .await
                    .map_err(Error::from)?;
                Ok(Outcome::Installed)
            }
            WorkerEvent::Activate => {
                let evicted = self.lifecycle.activate();
                Ok(Outcome::Activated { evicted })
            }
            WorkerEvent::Fetch(request) => Ok(Outcome::Response(self.fetch(&request).await)),
            WorkerEvent::Message(message) => self.handle_message(message).await,
            WorkerEvent::Sync => {
                let report = queue::drain(&self.queue, &self.network).await;
                log::info!(
                    "Sync drained queue: {} replayed, {} retained",
                    report.replayed,
                    report.retained
                );
                Ok(Outcome::Synced(report))
            }
            WorkerEvent::Push(payload) => {
                let notification = self.router.on_push(payload.as_deref());
                Ok(Outcome::Notified(notification))
            }
            WorkerEvent::NotificationClick {
                action,
                notification,
            } => {
                self.router.on_click(action.as_deref(), &notification);
                Ok(Outcome::Done)
            }
        }
    }

    /// Serve one intercepted request. Always produces a response.
    ///
    /// Same-origin path requests are resolved against the configured origin
    /// first, so `/index.html` and its absolute form share one cache key.
    pub async fn fetch(&self, request: &HttpRequest) -> HttpResponse {
        let request = self.resolve_request(request);
        let class = RequestClass::from_request(
            &request.method,
            &request.path(),
            &self.config.api_root,
        );
        log::debug!("{} {} classified as {:?}", request.method, request.url, class);

        match class {
            RequestClass::StaticRead => self.cache_first.fetch(&request).await,
            _ => self.network_first.fetch(&request, class).await,
        }
    }

    fn resolve_request(&self, request: &HttpRequest) -> HttpRequest {
        let mut resolved = request.clone();
        resolved.url = self.config.resolve(&request.url);
        resolved
    }

    async fn handle_message(&self, message: ControlMessage) -> Result<Outcome> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                log::info!("Skip-waiting requested; activating without delay");
                let evicted = self.lifecycle.activate();
                Ok(Outcome::Activated { evicted })
            }
            ControlMessage::Precache(urls) => {
                let cached = self.lifecycle.precache(&urls).await;
                log::info!("On-demand precache stored {}/{} URLs", cached, urls.len());
                Ok(Outcome::Done)
            }
            ControlMessage::ClearNamespace(namespace) => {
                if !self.config.namespaces().owns(&namespace) {
                    log::warn!("Refusing to clear foreign namespace {}", namespace);
                    return Ok(Outcome::Done);
                }
                let Ok(guard) = self.cache.lock() else {
                    log::error!("Cache lock poisoned, cannot clear {}", namespace);
                    return Ok(Outcome::Done);
                };
                match guard.delete_namespace(&namespace) {
                    Ok(count) => log::info!("Cleared {} ({} entries)", namespace, count),
                    Err(e) => log::error!("Failed to clear {}: {}", namespace, e),
                }
                Ok(Outcome::Done)
            }
        }
    }

    /// Whether a page asked this version to take over immediately
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Stats for the current generation's namespaces: (statics, api)
    pub fn cache_stats(&self) -> Result<(CacheStats, CacheStats)> {
        let namespaces = self.config.namespaces();
        let guard = self
            .cache
            .lock()
            .map_err(|_| crate::error::StoreError::Io("cache lock poisoned".to_string()))?;
        Ok((
            guard.stats(&namespaces.statics())?,
            guard.stats(&namespaces.api())?,
        ))
    }

    /// Pending offline actions, grouped by category
    pub fn pending_actions(&self) -> Result<Vec<(String, usize)>> {
        let guard = self
            .queue
            .lock()
            .map_err(|_| crate::error::StoreError::Io("queue lock poisoned".to_string()))?;
        Ok(guard.pending_by_category()?)
    }

    /// Which category a path would be queued under
    pub fn category_for(&self, path: &str) -> String {
        category_for_path(path, &self.config.api_root)
    }
}
