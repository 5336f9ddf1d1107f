//! Fan-out of queue events to registered observers.
//!
//! Observers subscribe and receive events over an mpsc channel. Publishing
//! never blocks the worker: a send to a dropped receiver just prunes that
//! subscriber, and the remaining observers still get the event in order.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::store::QueueCounts;

/// Per-job progress notification
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub job_id: i64,
    pub status: ProgressStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Error,
}

/// Event delivered to observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    QueueCounts(QueueCounts),
    ProgressUpdate(ProgressUpdate),
}

/// Observer registry and publisher
#[derive(Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; the receiver gets every event published after
    /// this call, in publication order
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish_counts(&self, counts: QueueCounts) {
        self.publish(Event::QueueCounts(counts));
    }

    pub fn publish_progress(&self, update: ProgressUpdate) {
        self.publish(Event::ProgressUpdate(update));
    }

    fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
