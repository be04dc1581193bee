//! Domain events and their fan-out to subscribers.

use crate::registry::{Connection, Device};
use crate::snapshot::Snapshot;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    DeviceDiscovered(Device),
    DeviceUpdated(Device),
    ConnectionEstablished(Connection),
    SnapshotReady(Arc<Snapshot>),
}

impl NetworkEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkEvent::DeviceDiscovered(_) => "device_discovered",
            NetworkEvent::DeviceUpdated(_) => "device_updated",
            NetworkEvent::ConnectionEstablished(_) => "connection_established",
            NetworkEvent::SnapshotReady(_) => "snapshot_ready",
        }
    }
}

/// Publish never blocks: a subscriber whose queue is full misses the event,
/// and one whose receiver is gone is dropped.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<NetworkEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, capacity: usize) -> Receiver<NetworkEvent> {
        let (tx, rx) = bounded(capacity.max(1));
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: NetworkEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!(event = event.kind(), "subscriber queue full, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
