//! Capture-wide counters and the protocol histogram.

use crate::model::Protocol;
use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct Statistics {
    /// First and last capture timestamps seen.
    span: Mutex<Option<(f64, f64)>>,
    packets: AtomicU64,
    bytes: AtomicU64,
    decode_failures: AtomicU64,
    filtered: AtomicU64,
    alerts: AtomicU64,
    protocols: Mutex<AHashMap<Protocol, u64>>,
}

/// Point-in-time statistics carried in a snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub decode_failures: u64,
    pub filtered_frames: u64,
    pub alerts: u64,
    /// Capture time between the first and last recorded packet.
    pub elapsed_secs: f64,
    /// Cumulative averages since capture start.
    pub packets_per_sec: f64,
    pub bytes_per_sec: f64,
    pub device_count: usize,
    pub connection_count: usize,
    /// All-time packet count per service protocol, sorted by protocol.
    pub protocol_distribution: Vec<(Protocol, u64)>,
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics {
            span: Mutex::new(None),
            packets: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            protocols: Mutex::new(AHashMap::new()),
        }
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_packet(&self, protocol: Protocol, bytes: u64, ts: f64) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        *self.protocols.lock().entry(protocol).or_insert(0) += 1;
        let mut span = self.span.lock();
        *span = Some(match *span {
            Some((first, last)) => (first.min(ts), last.max(ts)),
            None => (ts, ts),
        });
    }

    #[inline]
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alerts(&self, count: usize) {
        self.alerts.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn total_packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn summary(&self, device_count: usize, connection_count: usize) -> StatsSummary {
        let elapsed = self
            .span
            .lock()
            .map(|(first, last)| last - first)
            .unwrap_or(0.0);
        self.summary_at(elapsed, device_count, connection_count)
    }

    /// Summary with rates taken over `elapsed_secs`.
    pub fn summary_at(&self, elapsed_secs: f64, device_count: usize, connection_count: usize) -> StatsSummary {
        let total_packets = self.packets.load(Ordering::Relaxed);
        let total_bytes = self.bytes.load(Ordering::Relaxed);
        let (packets_per_sec, bytes_per_sec) = if elapsed_secs > 0.0 {
            (
                total_packets as f64 / elapsed_secs,
                total_bytes as f64 / elapsed_secs,
            )
        } else {
            (0.0, 0.0)
        };
        let mut protocol_distribution: Vec<(Protocol, u64)> =
            self.protocols.lock().iter().map(|(p, n)| (*p, *n)).collect();
        protocol_distribution.sort_unstable();

        StatsSummary {
            total_packets,
            total_bytes,
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            filtered_frames: self.filtered.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            elapsed_secs,
            packets_per_sec,
            bytes_per_sec,
            device_count,
            connection_count,
            protocol_distribution,
        }
    }
}
