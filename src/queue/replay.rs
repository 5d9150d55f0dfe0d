//! Queue drain: replay pending mutations on a reconnect signal

use std::sync::{Arc, Mutex};

use super::storage::QueueStorage;
use crate::net::Network;

/// Outcome of one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Items this pass tried to resubmit
    pub attempted: usize,
    /// Items that reached the server and were deleted
    pub replayed: usize,
    /// Items left in place for the next sync signal
    pub retained: usize,
}

/// Replay every pending item, grouped by category, in enqueue order within
/// each category.
///
/// Per-item failures are isolated: a failed item is released back to the
/// queue and the pass moves on. Items are claimed atomically before
/// resubmission, so a drain racing another drain never double-submits.
/// Items retry indefinitely across drains, with no cap and no backoff;
/// the queue holds them until they succeed or are manually cleared.
pub async fn drain(queue: &Arc<Mutex<QueueStorage>>, network: &Arc<dyn Network>) -> DrainReport {
    let mut report = DrainReport::default();

    let categories = {
        let Ok(guard) = queue.lock() else {
            log::error!("Queue lock poisoned, skipping drain");
            return report;
        };
        match guard.categories() {
            Ok(categories) => categories,
            Err(e) => {
                log::error!("Failed to enumerate queue categories: {}", e);
                return report;
            }
        }
    };

    if categories.is_empty() {
        return report;
    }

    for category in categories {
        let items = {
            let Ok(guard) = queue.lock() else { return report };
            match guard.pending_in(&category) {
                Ok(items) => items,
                Err(e) => {
                    log::error!("Failed to read category {}: {}", category, e);
                    continue;
                }
            }
        };

        for item in items {
            let claimed = {
                let Ok(guard) = queue.lock() else { return report };
                guard.claim(item.id).unwrap_or(false)
            };
            if !claimed {
                // Another drain got there first
                continue;
            }

            report.attempted += 1;

            let request = match item.to_request() {
                Ok(request) => request,
                Err(e) => {
                    log::error!("Cannot rebuild queued item {}: {}", item.id, e);
                    release(queue, item.id);
                    report.retained += 1;
                    continue;
                }
            };

            match network.send(&request).await {
                Ok(response) if response.is_success() => {
                    log::info!(
                        "Replayed queued {} {} ({})",
                        item.method,
                        item.url,
                        item.category
                    );
                    let Ok(guard) = queue.lock() else { return report };
                    if let Err(e) = guard.delete(item.id) {
                        log::error!("Failed to delete replayed item {}: {}", item.id, e);
                    }
                    report.replayed += 1;
                }
                Ok(response) => {
                    log::warn!(
                        "Replay of {} {} rejected with status {}, retaining",
                        item.method,
                        item.url,
                        response.status
                    );
                    release(queue, item.id);
                    report.retained += 1;
                }
                Err(e) => {
                    log::warn!("Replay of {} {} failed: {}, retaining", item.method, item.url, e);
                    release(queue, item.id);
                    report.retained += 1;
                }
            }
        }
    }

    report
}

fn release(queue: &Arc<Mutex<QueueStorage>>, id: i64) {
    if let Ok(guard) = queue.lock() {
        if let Err(e) = guard.release(id) {
            log::error!("Failed to release queued item {}: {}", id, e);
        }
    }
}
