// src/watch/queue.rs

//! The shared event queue between notifier subscriptions and the controller.
//!
//! Change events travel on a bounded channel and are dropped when it is full;
//! the filesystem callback never blocks. Subscription failures travel on a
//! separate unbounded channel and are never dropped.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

use crate::errors::RunwatchError;

/// Default number of pending change events before new ones are dropped.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 100;

/// A path reported under a watch root, relative to that root and
/// slash-separated. `root` indexes into the session's `WatchPlan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub root: usize,
    pub path: String,
}

/// Write side, cloned into every subscription callback.
#[derive(Debug, Clone)]
pub struct EventSink {
    events: mpsc::Sender<ChangeEvent>,
    faults: mpsc::UnboundedSender<RunwatchError>,
}

/// Read side, owned by the controller.
#[derive(Debug)]
pub struct EventSource {
    pub(crate) events: mpsc::Receiver<ChangeEvent>,
    pub(crate) faults: mpsc::UnboundedReceiver<RunwatchError>,
}

/// Create a connected sink/source pair with room for `capacity` events.
pub fn event_queue(capacity: usize) -> (EventSink, EventSource) {
    let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
    let (faults_tx, faults_rx) = mpsc::unbounded_channel();
    (
        EventSink {
            events: events_tx,
            faults: faults_tx,
        },
        EventSource {
            events: events_rx,
            faults: faults_rx,
        },
    )
}

impl EventSink {
    /// Enqueue without blocking. Returns false if the event was dropped.
    pub fn publish(&self, event: ChangeEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                trace!(path = %event.path, "event queue full; dropping change");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Report a failure that ends the session.
    pub fn fault(&self, err: RunwatchError) {
        let _ = self.faults.send(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (sink, mut source) = event_queue(2);
        let ev = |p: &str| ChangeEvent {
            root: 0,
            path: p.to_string(),
        };

        assert!(sink.publish(ev("a")));
        assert!(sink.publish(ev("b")));
        assert!(!sink.publish(ev("c")));

        assert_eq!(source.events.recv().await.unwrap().path, "a");
        assert_eq!(source.events.recv().await.unwrap().path, "b");
        assert!(source.events.try_recv().is_err());
    }
}
