use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use crate::recording::{Recorder, RecorderEvent};

/// A WebSocket client following recorder events
#[derive(Debug)]
pub struct Subscriber {
    pub since: Instant,
    pub forwarded: AtomicU64,
}

/// Shared application state: the single recorder plus its live subscribers
pub struct AppState {
    pub recorder: Arc<Recorder>,
    subscribers: DashMap<String, Subscriber>,
    attached_total: AtomicUsize,
}

impl AppState {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self {
            recorder,
            subscribers: DashMap::new(),
            attached_total: AtomicUsize::new(0),
        }
    }

    /// Register `client_id` and hand back its event feed. A client that
    /// reconnects under the same id replaces its earlier entry.
    pub async fn attach(&self, client_id: &str) -> broadcast::Receiver<RecorderEvent> {
        let rx = self.recorder.subscribe();
        let session_id = self.recorder.status().await.session_id;

        let total = self.attached_total.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            "Subscriber {} attached to {} ({} live, {} since start)",
            client_id,
            session_id.as_deref().unwrap_or("idle recorder"),
            self.subscribers.len() + 1,
            total
        );

        self.subscribers.insert(
            client_id.to_string(),
            Subscriber {
                since: Instant::now(),
                forwarded: AtomicU64::new(0),
            },
        );
        rx
    }

    pub fn mark_forwarded(&self, client_id: &str) {
        if let Some(subscriber) = self.subscribers.get(client_id) {
            subscriber.forwarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn detach(&self, client_id: &str) {
        let Some((_, subscriber)) = self.subscribers.remove(client_id) else {
            return;
        };
        tracing::debug!(
            "Subscriber {} detached after {:?}, {} events forwarded",
            client_id,
            subscriber.since.elapsed(),
            subscriber.forwarded.load(Ordering::Relaxed)
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
