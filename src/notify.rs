//! Push notification routing
//!
//! Turns raw push payloads into displayed notifications and turns clicks
//! into window focus or navigation. The platform surfaces (notification UI,
//! window management) sit behind traits so the router stays testable.

use serde::Deserialize;
use serde_json::Value;

/// Title used when a push payload carries none
pub const DEFAULT_TITLE: &str = "CarTrace";

/// Body used when a push payload carries none
pub const DEFAULT_BODY: &str = "New activity on a vehicle you follow";

/// Tag used when a push payload carries none; pushes sharing a tag replace
/// each other instead of stacking
pub const DEFAULT_TAG: &str = "cartrace-alert";

/// A notification ready to display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub data: Value,
}

/// Wire shape of a push payload. Every field is optional; missing fields
/// fall back to defaults rather than dropping the push.
#[derive(Debug, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    tag: Option<String>,
    data: Option<Value>,
}

/// Notification display surface.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);
    fn dismiss(&self, notification: &Notification);
}

/// Open application windows.
pub trait WindowClients: Send + Sync {
    /// Focus an already-open window showing the given URL, if there is one
    fn focus(&self, url: &str) -> bool;
    /// Open a new window at the given URL
    fn open(&self, url: &str);
}

/// Routes pushes to the sink and clicks to the windows.
pub struct NotificationRouter {
    sink: Box<dyn NotificationSink>,
    windows: Box<dyn WindowClients>,
    default_route: String,
}

impl NotificationRouter {
    pub fn new(
        sink: Box<dyn NotificationSink>,
        windows: Box<dyn WindowClients>,
        default_route: String,
    ) -> Self {
        Self {
            sink,
            windows,
            default_route,
        }
    }

    /// Display a notification for an incoming push.
    ///
    /// A missing, empty, or garbled payload still produces a notification
    /// with stock text. A push the user never sees is worse than a vague
    /// one.
    pub fn on_push(&self, payload: Option<&[u8]>) -> Notification {
        let parsed = payload
            .filter(|bytes| !bytes.is_empty())
            .and_then(|bytes| match serde_json::from_slice::<PushPayload>(bytes) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    log::warn!("Unparseable push payload, using defaults: {}", e);
                    None
                }
            });

        let notification = match parsed {
            Some(payload) => Notification {
                title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
                tag: payload.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
                data: payload.data.unwrap_or(Value::Null),
            },
            None => Notification {
                title: DEFAULT_TITLE.to_string(),
                body: DEFAULT_BODY.to_string(),
                tag: DEFAULT_TAG.to_string(),
                data: Value::Null,
            },
        };

        log::debug!("Showing notification: {} ({})", notification.title, notification.tag);
        self.sink.show(&notification);
        notification
    }

    /// Handle a click on a displayed notification.
    ///
    /// The notification is always dismissed. Clicks on the notification
    /// body or the `view` action focus an open window, or open one at the
    /// notification's target URL; any other action is dismiss-only.
    pub fn on_click(&self, action: Option<&str>, notification: &Notification) {
        self.sink.dismiss(notification);

        match action {
            None | Some("view") => {}
            Some(other) => {
                log::debug!("Notification action {} is dismiss-only", other);
                return;
            }
        }

        let url = notification
            .data
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or(&self.default_route);

        if self.windows.focus(url) {
            log::debug!("Focused existing window at {}", url);
            return;
        }
        log::debug!("Opening window at {}", url);
        self.windows.open(url);
    }
}
