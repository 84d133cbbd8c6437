//! Feedback side-effect seam.
//!
//! Repository mutations report user-facing feedback (celebration sound +
//! toast on create, a distinct one on completion, error toasts on
//! failure) through a `Notifier`. The default implementation fans events
//! out over a broadcast channel for whatever front end is attached;
//! sends are fire-and-forget, so feedback never fails a mutation.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A user-facing feedback event. Tagged for the wire so a UI can map
/// each variant to its toast/sound pairing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// A task was created; celebratory feedback.
    TaskCreated { id: String, title: String },
    /// A task transitioned to done; distinct completion feedback.
    TaskCompleted { id: String, title: String },
    /// A mutation failed; reported once, never retried.
    Error { message: String },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Broadcasts events to any number of subscribers. Dropped receivers and
/// full buffers are ignored.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Event>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// Discards everything. For callers that want no feedback wiring.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// Records every event, for asserting on side-effect counts in tests.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_completed(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::TaskCompleted { .. }))
            .count()
    }

    pub fn count_created(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::TaskCreated { .. }))
            .count()
    }

    pub fn count_errors(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::Error { .. }))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
