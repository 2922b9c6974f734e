/// Live subscriber registry
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the telemetry core may do with the set of live connections
pub trait SubscriberSet {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn send_to_all(&mut self, text: &str);

    fn send_to_one(&mut self, id: SubscriberId, text: &str);
}

/// Subscribers backed by bounded per-connection outbox channels
///
/// A subscriber whose outbox is closed or full is dropped on the next send;
/// dropping the sender closes the outbox so its connection task winds down.
#[derive(Debug, Default)]
pub struct Subscribers {
    outboxes: HashMap<SubscriberId, mpsc::Sender<String>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SubscriberId, outbox: mpsc::Sender<String>) {
        self.outboxes.insert(id, outbox);
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.outboxes.remove(&id).is_some()
    }
}

impl SubscriberSet for Subscribers {
    fn len(&self) -> usize {
        self.outboxes.len()
    }

    fn send_to_all(&mut self, text: &str) {
        self.outboxes
            .retain(|id, outbox| deliver(*id, outbox, text));
    }

    fn send_to_one(&mut self, id: SubscriberId, text: &str) {
        let Some(outbox) = self.outboxes.get(&id) else {
            debug!("Subscriber {} is gone, not sending", id);
            return;
        };
        if !deliver(id, outbox, text) {
            self.outboxes.remove(&id);
        }
    }
}

/// Queue `text` without waiting; false means the subscriber should be dropped
fn deliver(id: SubscriberId, outbox: &mpsc::Sender<String>, text: &str) -> bool {
    match outbox.try_send(text.to_string()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("Subscriber {} is not keeping up, dropping", id);
            false
        }
        Err(TrySendError::Closed(_)) => {
            warn!("Subscriber {} outbox closed, dropping", id);
            false
        }
    }
}
