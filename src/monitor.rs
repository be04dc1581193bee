//! The monitor: owns the registries and the capture thread, and turns each
//! captured frame into registry updates and events.

use crate::capture::{CaptureError, Frame, FramePoll, PacketSource, PcapSource};
use crate::classify::Classifier;
use crate::config::Config;
use crate::decode::{decode_frame, Decoded};
use crate::events::{EventBus, NetworkEvent};
use crate::inspect::{InspectError, PayloadInspector};
use crate::layout::{LayoutEngine, LayoutStrategy};
use crate::model::{Packet, Position, Protocol};
use crate::protocol::MacAddr;
use crate::registry::{ConnectionRegistry, Device, DeviceKey, DeviceRegistry, Endpoint};
use crate::resolver::{DnsResolver, HostnameResolver, ResolverPool};
use crate::snapshot::{Snapshot, SnapshotScheduler, SnapshotSource};
use crate::stats::Statistics;
use crate::window::PacketWindow;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("capture is already running")]
    AlreadyRunning,
    #[error("capture is not running")]
    NotRunning,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to spawn worker thread: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Inspect(#[from] InspectError),
}

/// Everything the per-frame path touches. Shared with the capture thread.
struct Pipeline {
    devices: Arc<DeviceRegistry>,
    connections: Arc<ConnectionRegistry>,
    packets: Arc<PacketWindow>,
    stats: Arc<Statistics>,
    events: Arc<EventBus>,
    inspector: Option<PayloadInspector>,
    resolver: Option<ResolverPool>,
    allowed: Vec<Protocol>,
    track_broadcast: bool,
}

impl Pipeline {
    fn process(&self, frame: &Frame<'_>) -> Option<Packet> {
        let Some(Decoded {
            mut packet,
            tcp_payload,
        }) = decode_frame(frame.timestamp, frame.link, frame.data)
        else {
            self.stats.record_decode_failure();
            return None;
        };

        if !self.allows(&packet) {
            self.stats.record_filtered();
            return None;
        }

        let bytes = packet.size as u64;
        let ts = packet.timestamp;
        self.stats.record_packet(packet.protocol, bytes, ts);

        let source = self.observe_device(packet.src_ip, packet.src_mac, bytes, ts, true);
        self.observe_device(packet.dst_ip, packet.dst_mac, bytes, ts, false);

        let src_port = packet.src_port.unwrap_or(0);
        let dst_port = packet.dst_port.unwrap_or(0);
        let observed = self.connections.observe(
            Endpoint::new(packet.src_ip, src_port),
            Endpoint::new(packet.dst_ip, dst_port),
            packet.protocol,
            bytes,
            ts,
            packet.tcp_flags,
        );
        let connection_key = observed.connection.key;
        if observed.established {
            self.events
                .publish(NetworkEvent::ConnectionEstablished(observed.connection));
        }

        if let (Some(inspector), Some(payload)) = (&self.inspector, tcp_payload) {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                inspector.inspect(payload, src_port, dst_port, ts)
            }));
            match outcome {
                Ok(Some(inspection)) => {
                    packet.http = Some(inspection.summary());
                    let alerts = inspection.alerts;
                    if !alerts.is_empty() {
                        let alerts: Vec<_> = alerts
                            .into_iter()
                            .map(|a| a.between(packet.src_ip, packet.dst_ip))
                            .collect();
                        self.connections.attach_alerts(&connection_key, &alerts);
                        if let Some(key) = source {
                            let mut flagged = None;
                            for alert in &alerts {
                                flagged = self.devices.flag_activity(&key, alert.severity, &alert.title);
                            }
                            if let Some(device) = flagged {
                                self.events.publish(NetworkEvent::DeviceUpdated(device));
                            }
                        }
                        self.stats.record_alerts(alerts.len());
                        tracing::debug!(
                            connection = %connection_key,
                            alerts = alerts.len(),
                            "payload raised alerts"
                        );
                        packet.alerts = alerts;
                    }
                }
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(connection = %connection_key, "payload inspection panicked, no alerts recorded");
                }
            }
        }

        self.packets.push(packet.clone());
        Some(packet)
    }

    /// An empty allow-list keeps everything; otherwise either the service or
    /// the transport protocol must be listed.
    fn allows(&self, packet: &Packet) -> bool {
        self.allowed.is_empty()
            || self.allowed.contains(&packet.protocol)
            || self.allowed.contains(&packet.transport)
    }

    fn observe_device(&self, ip: IpAddr, mac: MacAddr, bytes: u64, ts: f64, is_source: bool) -> Option<DeviceKey> {
        // all-zero is the unset target of an ARP request
        if mac == MacAddr::default() {
            return None;
        }
        if !self.track_broadcast && (mac.is_broadcast() || mac.is_multicast()) {
            return None;
        }
        let observed = self.devices.observe(ip, mac, bytes, ts, is_source);
        let key = observed.device.key();
        if observed.discovered {
            if let Some(resolver) = &self.resolver {
                resolver.request(key);
            }
            self.events.publish(NetworkEvent::DeviceDiscovered(observed.device));
        } else {
            self.events.publish(NetworkEvent::DeviceUpdated(observed.device));
        }
        Some(key)
    }
}

struct Running {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    capture: JoinHandle<Result<u64, CaptureError>>,
    scheduler: SnapshotScheduler,
}

/// Sets the flag when the capture thread exits, including by panic.
struct FinishGuard(Arc<AtomicBool>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct NetworkMonitor {
    config: Config,
    pipeline: Arc<Pipeline>,
    layout: Arc<LayoutEngine>,
    running: Mutex<Option<Running>>,
}

impl NetworkMonitor {
    /// Build a monitor. Reverse lookups use the system resolver when enabled
    /// in the configuration.
    pub fn new(config: &Config) -> Result<Self, MonitorError> {
        let resolver: Option<Arc<dyn HostnameResolver>> = if config.resolver.enabled {
            Some(Arc::new(DnsResolver))
        } else {
            None
        };
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(
        config: &Config,
        resolver: Option<Arc<dyn HostnameResolver>>,
    ) -> Result<Self, MonitorError> {
        let layout = Arc::new(LayoutEngine::new(&config.layout));
        let devices = Arc::new(DeviceRegistry::new(
            Classifier::new(&config.classifier),
            Arc::clone(&layout),
            config.monitor.max_flagged_activities,
        ));
        let connections = Arc::new(ConnectionRegistry::new(config.monitor.max_alerts_per_connection));
        let events = Arc::new(EventBus::new());

        let inspector = if config.monitor.deep_inspection {
            Some(PayloadInspector::new()?)
        } else {
            None
        };
        let resolver = match resolver {
            Some(resolver) => Some(ResolverPool::spawn(
                resolver,
                Arc::clone(&devices),
                Arc::clone(&events),
                config.resolver.workers,
                config.resolver.queue_capacity,
            )?),
            None => None,
        };

        let pipeline = Pipeline {
            devices,
            connections,
            packets: Arc::new(PacketWindow::new(config.monitor.max_packets)),
            stats: Arc::new(Statistics::new()),
            events,
            inspector,
            resolver,
            allowed: config.monitor.protocols.clone(),
            track_broadcast: config.monitor.track_broadcast,
        };

        Ok(NetworkMonitor {
            config: config.clone(),
            pipeline: Arc::new(pipeline),
            layout,
            running: Mutex::new(None),
        })
    }

    /// Subscribe with the configured queue depth.
    pub fn subscribe(&self) -> Receiver<NetworkEvent> {
        self.pipeline.events.subscribe(self.config.monitor.event_capacity)
    }

    /// Run one frame through decode, registries and inspection. Returns the
    /// recorded packet, or `None` when the frame was undecodable or filtered.
    pub fn process_frame(&self, frame: &Frame<'_>) -> Option<Packet> {
        self.pipeline.process(frame)
    }

    /// Open the configured live interface, or the configured savefile, and
    /// start capturing from it.
    pub fn start_configured(&self) -> Result<(), MonitorError> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        let capture = &self.config.capture;
        let source = match &capture.read_file {
            Some(path) => PcapSource::open_file(path, capture.filter.as_deref())?,
            None => PcapSource::open_live(capture)?,
        };
        self.start(Box::new(source))
    }

    /// Spawn the capture thread over `source` and the snapshot scheduler.
    /// The thread owns the source and drops it on every exit path.
    pub fn start(&self, source: Box<dyn PacketSource>) -> Result<(), MonitorError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let scheduler = SnapshotScheduler::spawn(
            self.snapshot_source(),
            Arc::clone(&self.pipeline.events),
            Duration::from_millis(self.config.monitor.snapshot_interval_ms),
            self.config.output.export_dir.clone(),
        )?;

        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let description = source.describe();
        let limit = self.config.monitor.count;

        let capture = {
            let pipeline = Arc::clone(&self.pipeline);
            let stop = Arc::clone(&stop);
            let guard = FinishGuard(Arc::clone(&finished));
            std::thread::Builder::new()
                .name("netsight-capture".into())
                .spawn(move || {
                    let _guard = guard;
                    capture_loop(source, &pipeline, &stop, limit)
                })?
        };

        tracing::info!(source = %description, "capture started");
        *running = Some(Running {
            stop,
            finished,
            capture,
            scheduler,
        });
        Ok(())
    }

    /// Stop capturing, release the source and return the final snapshot.
    pub fn stop(&self) -> Result<Arc<Snapshot>, MonitorError> {
        let mut running = self.running.lock();
        let state = running.take().ok_or(MonitorError::NotRunning)?;

        state.stop.store(true, Ordering::SeqCst);
        match state.capture.join() {
            Ok(Ok(frames)) => tracing::info!(frames, "capture stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "capture ended with an error"),
            Err(_) => tracing::error!("capture thread panicked"),
        }

        let snapshot = match state.scheduler.stop() {
            Some(snapshot) => snapshot,
            None => Arc::new(self.snapshot()),
        };
        Ok(snapshot)
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// True once the capture thread has exited on its own (source exhausted,
    /// frame limit reached or a capture error) while still marked running.
    pub fn capture_finished(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| r.finished.load(Ordering::SeqCst))
    }

    /// Ask the scheduler for an immediate snapshot. False when idle.
    pub fn request_snapshot(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| r.scheduler.request_now())
    }

    /// Compose a snapshot now, outside the schedule.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_source().compose()
    }

    /// Recompute every device position with a batch strategy. Returns the
    /// number of devices moved.
    pub fn relayout(&self, strategy: LayoutStrategy, seed: u64) -> usize {
        let devices = self.pipeline.devices.devices();
        if devices.is_empty() {
            return 0;
        }
        let positions: Vec<Position> = match strategy {
            LayoutStrategy::ForceDirected => {
                let edges = link_edges(&devices, &self.pipeline.connections.links());
                self.layout.force_directed(devices.len(), &edges, seed)
            }
            LayoutStrategy::Hierarchical => {
                let kinds: Vec<_> = devices.iter().map(|d| d.device_type).collect();
                self.layout.hierarchical(&kinds)
            }
        };
        let batch: Vec<(DeviceKey, Position)> = devices.iter().map(|d| d.key()).zip(positions).collect();
        let applied = self.pipeline.devices.apply_positions(&batch);
        tracing::info!(%strategy, devices = applied, "layout recomputed");
        self.request_snapshot();
        applied
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.pipeline.devices
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.pipeline.connections
    }

    pub fn stats(&self) -> &Statistics {
        &self.pipeline.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn snapshot_source(&self) -> SnapshotSource {
        SnapshotSource {
            devices: Arc::clone(&self.pipeline.devices),
            connections: Arc::clone(&self.pipeline.connections),
            packets: Arc::clone(&self.pipeline.packets),
            stats: Arc::clone(&self.pipeline.stats),
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// Spring edges between device indices. Connections are keyed by address, so
/// every device sharing an address takes part in that address's links.
fn link_edges(devices: &[Device], links: &[(IpAddr, IpAddr)]) -> Vec<(usize, usize)> {
    let mut index: HashMap<IpAddr, Vec<usize>> = HashMap::with_capacity(devices.len());
    for (i, device) in devices.iter().enumerate() {
        index.entry(device.ip).or_default().push(i);
    }
    let mut edges = Vec::with_capacity(links.len());
    for (a, b) in links {
        if a == b {
            continue;
        }
        let (Some(from), Some(to)) = (index.get(a), index.get(b)) else {
            continue;
        };
        for &i in from {
            edges.extend(to.iter().map(|&j| (i.min(j), i.max(j))));
        }
    }
    edges.sort_unstable();
    edges.dedup();
    edges
}

fn capture_loop(
    mut source: Box<dyn PacketSource>,
    pipeline: &Pipeline,
    stop: &AtomicBool,
    limit: u64,
) -> Result<u64, CaptureError> {
    let mut frames: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        if limit > 0 && frames >= limit {
            tracing::info!(limit, "frame limit reached");
            break;
        }
        match source.next_frame()? {
            FramePoll::Frame(frame) => {
                frames += 1;
                if catch_unwind(AssertUnwindSafe(|| pipeline.process(&frame))).is_err() {
                    tracing::warn!(frame = frames, "frame processing panicked, skipped");
                }
            }
            FramePoll::Idle => {}
            FramePoll::Exhausted => {
                tracing::info!(frames, "source exhausted");
                break;
            }
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ReplaySource;
    use crate::decode::testutil::*;
    use crate::decode::LinkType;
    use crate::model::{AlertType, ThreatLevel};
    use crate::registry::ConnectionState;
    use std::net::Ipv4Addr;
    use std::time::Instant;

    const CLIENT: [u8; 4] = [10, 0, 0, 5];
    const SERVER: [u8; 4] = [10, 0, 0, 9];

    fn test_config() -> Config {
        let mut config = Config::default();
        config.resolver.enabled = false;
        config.layout.seed = Some(11);
        config.monitor.snapshot_interval_ms = 3_600_000;
        config
    }

    fn frame(data: &[u8]) -> Frame<'_> {
        Frame {
            timestamp: 100.0,
            link: LinkType::Ethernet,
            data,
            wire_len: data.len() as u32,
        }
    }

    fn http_session() -> Vec<(f64, Vec<u8>)> {
        vec![
            (1.0, tcp_frame(CLIENT, SERVER, 40000, 80, 0x02, &[])),
            (1.1, tcp_frame_macs(MAC_B, MAC_A, SERVER, CLIENT, 80, 40000, 0x12, &[])),
            (1.2, tcp_frame(CLIENT, SERVER, 40000, 80, 0x10, &[])),
            (
                1.3,
                tcp_frame(
                    CLIENT,
                    SERVER,
                    40000,
                    80,
                    0x18,
                    b"GET /login?user=admin' OR '1'='1 HTTP/1.1\r\nHost: shop.lan\r\n\r\n",
                ),
            ),
            (1.4, udp_frame(CLIENT, SERVER, 5353, 53, &[0; 12])),
        ]
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn stop_without_start_fails() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        assert!(matches!(monitor.stop(), Err(MonitorError::NotRunning)));
        assert!(!monitor.is_running());
    }

    #[test]
    fn second_start_fails_and_keeps_the_first_capture() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let first = ReplaySource::new(Vec::new()).keep_open();
        let first_closed = first.closed_flag();
        monitor.start(Box::new(first)).unwrap();

        let second = ReplaySource::new(Vec::new());
        let second_closed = second.closed_flag();
        assert!(matches!(
            monitor.start(Box::new(second)),
            Err(MonitorError::AlreadyRunning)
        ));
        // the rejected source was dropped, the running one was not
        assert!(second_closed.load(Ordering::SeqCst));
        assert!(!first_closed.load(Ordering::SeqCst));
        assert!(monitor.is_running());

        monitor.stop().unwrap();
        assert!(first_closed.load(Ordering::SeqCst));
        assert!(matches!(monitor.stop(), Err(MonitorError::NotRunning)));
    }

    #[test]
    fn replayed_session_builds_devices_connections_and_alerts() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let source = ReplaySource::new(http_session());
        let closed = source.closed_flag();
        monitor.start(Box::new(source)).unwrap();
        wait_until(|| monitor.capture_finished());
        let snapshot = monitor.stop().unwrap();
        assert!(closed.load(Ordering::SeqCst));

        assert_eq!(snapshot.devices.len(), 2);
        assert_eq!(snapshot.connections.len(), 2);
        assert_eq!(snapshot.recent_packets.len(), 5);
        assert_eq!(snapshot.stats.total_packets, 5);

        let http = snapshot
            .connections
            .iter()
            .find(|c| c.protocol == Protocol::Http)
            .unwrap();
        assert!(http.is_two_way);
        assert_eq!(http.packet_count, 4);
        assert_eq!(http.state, ConnectionState::Established);
        assert_eq!(http.source.ip, IpAddr::V4(Ipv4Addr::from(CLIENT)));
        assert!(http.alerts.iter().any(|a| a.alert_type == AlertType::SqlInjection));

        let client = snapshot
            .devices
            .iter()
            .find(|d| d.ip == IpAddr::V4(Ipv4Addr::from(CLIENT)))
            .unwrap();
        assert_eq!(client.packets_sent, 4);
        assert_eq!(client.packets_received, 1);
        assert_eq!(client.security.threat_level, ThreatLevel::Critical);

        let request = &snapshot.recent_packets[3];
        assert_eq!(request.http.as_ref().unwrap().host.as_deref(), Some("shop.lan"));
        assert!(snapshot.stats.alerts >= 1);
    }

    #[test]
    fn events_announce_discovery_once_per_device() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let rx = monitor.subscribe();
        for (_, data) in http_session() {
            monitor.process_frame(&frame(&data));
        }
        let events: Vec<NetworkEvent> = rx.try_iter().collect();
        let discovered = events
            .iter()
            .filter(|e| matches!(e, NetworkEvent::DeviceDiscovered(_)))
            .count();
        let established = events
            .iter()
            .filter(|e| matches!(e, NetworkEvent::ConnectionEstablished(_)))
            .count();
        assert_eq!(discovered, 2);
        assert_eq!(established, 2);
        assert!(events.iter().any(|e| matches!(e, NetworkEvent::DeviceUpdated(_))));
    }

    #[test]
    fn malformed_frames_are_counted_and_skipped() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let good = udp_frame(CLIENT, SERVER, 5353, 53, &[0; 4]);
        assert!(monitor.process_frame(&frame(&good[..10])).is_none());
        assert!(monitor.process_frame(&frame(&[])).is_none());
        assert!(monitor.process_frame(&frame(&good)).is_some());
        let summary = monitor.snapshot().stats;
        assert_eq!(summary.decode_failures, 2);
        assert_eq!(summary.total_packets, 1);
        assert_eq!(monitor.devices().len(), 2);
    }

    #[test]
    fn allow_list_filters_frames() {
        let mut config = test_config();
        config.monitor.protocols = vec![Protocol::Dns];
        let monitor = NetworkMonitor::new(&config).unwrap();
        for (_, data) in http_session() {
            monitor.process_frame(&frame(&data));
        }
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.connections.len(), 1);
        assert_eq!(snapshot.connections[0].protocol, Protocol::Dns);
        assert_eq!(snapshot.stats.filtered_frames, 4);
    }

    #[test]
    fn broadcast_and_unset_macs_create_no_devices() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let arp = arp_request(CLIENT, [10, 0, 0, 1]);
        let packet = monitor.process_frame(&frame(&arp)).unwrap();
        assert_eq!(packet.protocol, Protocol::Arp);
        assert_eq!(monitor.devices().len(), 1);
        assert_eq!(monitor.connections().len(), 1);
    }

    #[test]
    fn disabled_inspection_records_no_alerts() {
        let mut config = test_config();
        config.monitor.deep_inspection = false;
        let monitor = NetworkMonitor::new(&config).unwrap();
        for (_, data) in http_session() {
            monitor.process_frame(&frame(&data));
        }
        let snapshot = monitor.snapshot();
        assert!(snapshot.connections.iter().all(|c| c.alerts.is_empty()));
        assert!(snapshot.recent_packets.iter().all(|p| p.http.is_none()));
    }

    #[test]
    fn frame_limit_ends_the_capture() {
        let mut config = test_config();
        config.monitor.count = 2;
        let monitor = NetworkMonitor::new(&config).unwrap();
        monitor.start(Box::new(ReplaySource::new(http_session()).keep_open())).unwrap();
        wait_until(|| monitor.capture_finished());
        let snapshot = monitor.stop().unwrap();
        assert_eq!(snapshot.stats.total_packets, 2);
    }

    struct PanickingSource {
        closed: Arc<AtomicBool>,
    }

    impl PacketSource for PanickingSource {
        fn next_frame(&mut self) -> Result<FramePoll<'_>, CaptureError> {
            panic!("device vanished");
        }

        fn describe(&self) -> String {
            "panicking".into()
        }
    }

    impl Drop for PanickingSource {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn a_dying_capture_thread_still_stops_cleanly() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        monitor
            .start(Box::new(PanickingSource {
                closed: Arc::clone(&closed),
            }))
            .unwrap();
        wait_until(|| monitor.capture_finished());
        assert!(closed.load(Ordering::SeqCst));
        let snapshot = monitor.stop().unwrap();
        assert!(snapshot.devices.is_empty());
        // restartable after the failure
        monitor.start(Box::new(ReplaySource::new(Vec::new()))).unwrap();
        monitor.stop().unwrap();
    }

    #[test]
    fn relayout_moves_every_device() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        for (_, data) in http_session() {
            monitor.process_frame(&frame(&data));
        }
        assert_eq!(monitor.relayout(LayoutStrategy::ForceDirected, 3), 2);
        let first: Vec<Position> = monitor.devices().devices().iter().map(|d| d.position).collect();
        assert_eq!(monitor.relayout(LayoutStrategy::ForceDirected, 3), 2);
        let second: Vec<Position> = monitor.devices().devices().iter().map(|d| d.position).collect();
        assert_eq!(first, second);
        assert_eq!(monitor.relayout(LayoutStrategy::Hierarchical, 0), 2);
    }

    #[test]
    fn devices_sharing_an_address_all_get_springs() {
        let monitor = NetworkMonitor::new(&test_config()).unwrap();
        let shared = IpAddr::V4(Ipv4Addr::from(CLIENT));
        let peer = IpAddr::V4(Ipv4Addr::from(SERVER));
        let registry = monitor.devices();
        registry.observe(shared, MacAddr([2, 0, 0, 0, 0, 1]), 60, 1.0, true);
        registry.observe(shared, MacAddr([2, 0, 0, 0, 0, 2]), 60, 1.0, true);
        registry.observe(peer, MacAddr([2, 0, 0, 0, 0, 3]), 60, 1.0, false);

        let devices = registry.devices();
        let at = |mac: u8| {
            devices
                .iter()
                .position(|d| d.mac == MacAddr([2, 0, 0, 0, 0, mac]))
                .unwrap()
        };
        let sorted = |a: usize, b: usize| (a.min(b), a.max(b));
        let mut expected = vec![sorted(at(1), at(3)), sorted(at(2), at(3))];
        expected.sort_unstable();

        assert_eq!(link_edges(&devices, &[(shared, peer)]), expected);
        // the two devices behind one address are not linked to each other
        assert!(link_edges(&devices, &[(shared, shared)]).is_empty());
    }
}
