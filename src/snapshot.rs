//! Immutable network snapshots and the thread that publishes them.
//!
//! A snapshot is always published on schedule, including before the first
//! device has been seen.

use crate::events::{EventBus, NetworkEvent};
use crate::model::Packet;
use crate::registry::{Connection, ConnectionRegistry, Device, DeviceRegistry};
use crate::stats::{StatsSummary, Statistics};
use crate::window::PacketWindow;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Wall-clock seconds since the epoch.
    pub timestamp: f64,
    pub devices: Vec<Device>,
    pub connections: Vec<Connection>,
    pub recent_packets: Vec<Packet>,
    pub stats: StatsSummary,
}

impl Snapshot {
    pub fn empty(timestamp: f64) -> Self {
        Snapshot {
            timestamp,
            devices: Vec::new(),
            connections: Vec::new(),
            recent_packets: Vec::new(),
            stats: StatsSummary::default(),
        }
    }
}

pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Everything a snapshot is composed from.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    pub devices: Arc<DeviceRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    pub packets: Arc<PacketWindow>,
    pub stats: Arc<Statistics>,
}

impl SnapshotSource {
    /// Copy the current state. Reads only.
    pub fn compose(&self) -> Snapshot {
        let devices = self.devices.devices();
        let connections = self.connections.connections();
        let stats = self.stats.summary(devices.len(), connections.len());
        Snapshot {
            timestamp: unix_now(),
            devices,
            connections,
            recent_packets: self.packets.recent(),
            stats,
        }
    }
}

pub fn write_snapshot_json(path: &Path, snapshot: &Snapshot) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), snapshot)?;
    Ok(())
}

/// File name for a snapshot written into an export directory.
pub fn snapshot_file_name(snapshot: &Snapshot) -> String {
    format!("snapshot-{}.json", (snapshot.timestamp * 1000.0) as u64)
}

enum Control {
    TakeNow,
    Stop(Sender<Arc<Snapshot>>),
}

/// Publishes a snapshot every `interval`, on request, and once more on stop.
pub struct SnapshotScheduler {
    control: Sender<Control>,
    latest: Arc<Mutex<Option<Arc<Snapshot>>>>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotScheduler {
    pub fn spawn(
        source: SnapshotSource,
        events: Arc<EventBus>,
        interval: Duration,
        export_dir: Option<PathBuf>,
    ) -> std::io::Result<Self> {
        let (control, rx) = bounded(16);
        let latest = Arc::new(Mutex::new(None));
        let publisher = Publisher {
            source,
            events,
            export_dir,
            latest: Arc::clone(&latest),
        };
        let handle = std::thread::Builder::new()
            .name("netsight-snapshot".into())
            .spawn(move || run(rx, publisher, interval))?;
        Ok(SnapshotScheduler {
            control,
            latest,
            handle: Some(handle),
        })
    }

    /// Ask for a snapshot outside the schedule. False if the queue is full
    /// or the scheduler has stopped.
    pub fn request_now(&self) -> bool {
        self.control.try_send(Control::TakeNow).is_ok()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.lock().clone()
    }

    /// Stop the loop after publishing a final snapshot, and return it.
    pub fn stop(mut self) -> Option<Arc<Snapshot>> {
        let (reply_tx, reply_rx) = bounded(1);
        let final_snapshot = if self.control.send(Control::Stop(reply_tx)).is_ok() {
            reply_rx.recv().ok()
        } else {
            None
        };
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("snapshot thread panicked");
            }
        }
        final_snapshot.or_else(|| self.latest())
    }
}

impl Drop for SnapshotScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let (reply_tx, _reply_rx) = bounded(1);
            let _ = self.control.send(Control::Stop(reply_tx));
            let _ = handle.join();
        }
    }
}

struct Publisher {
    source: SnapshotSource,
    events: Arc<EventBus>,
    export_dir: Option<PathBuf>,
    latest: Arc<Mutex<Option<Arc<Snapshot>>>>,
}

impl Publisher {
    fn publish(&self) -> Arc<Snapshot> {
        let snapshot = Arc::new(self.source.compose());
        if let Some(dir) = &self.export_dir {
            let path = dir.join(snapshot_file_name(&snapshot));
            if let Err(e) = write_snapshot_json(&path, &snapshot) {
                tracing::warn!(path = %path.display(), error = %e, "snapshot export failed");
            }
        }
        *self.latest.lock() = Some(Arc::clone(&snapshot));
        self.events.publish(NetworkEvent::SnapshotReady(Arc::clone(&snapshot)));
        tracing::trace!(
            devices = snapshot.devices.len(),
            connections = snapshot.connections.len(),
            "snapshot published"
        );
        snapshot
    }
}

fn run(rx: Receiver<Control>, publisher: Publisher, interval: Duration) {
    let mut next = Instant::now() + interval;
    loop {
        let wait = next.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(Control::TakeNow) => {
                publisher.publish();
            }
            Ok(Control::Stop(reply)) => {
                let _ = reply.send(publisher.publish());
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                publisher.publish();
                next = Instant::now() + interval;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("snapshot scheduler stopped");
}
