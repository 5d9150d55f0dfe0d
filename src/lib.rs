//! Offline resilience engine for the CarTrace web application
//!
//! Intercepted requests are served through two strategies over a versioned
//! SQLite cache: cache-first with background revalidation for static assets,
//! network-first with cached fallbacks for API traffic and navigations.
//! Mutations that cannot reach the server are parked in a durable queue and
//! replayed, in order per category, when connectivity returns. Push payloads
//! are routed to a notification surface behind a trait.
//!
//! The [`engine::Engine`] type ties it together: feed it [`engine::WorkerEvent`]s
//! and it dispatches to the stores, strategies, and router.

pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod notify;
pub mod queue;
pub mod strategy;

pub use config::Config;
pub use engine::{ControlMessage, Engine, Outcome, WorkerEvent};
pub use error::{Error, Result};
pub use net::{HttpRequest, HttpResponse, Network};
