use crate::classify::Classifier;
use crate::layout::LayoutEngine;
use crate::model::{DeviceType, Position, Severity, ThreatLevel};
use crate::protocol::MacAddr;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Session-stable identity of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceKey {
    pub ip: IpAddr,
    pub mac: MacAddr,
}

impl DeviceKey {
    pub fn new(ip: IpAddr, mac: MacAddr) -> Self {
        DeviceKey { ip, mac }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ip, self.mac)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecuritySummary {
    pub threat_level: ThreatLevel,
    /// Most recent flagged activities, oldest first.
    pub flagged_activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub ip: IpAddr,
    pub mac: MacAddr,
    pub hostname: String,
    pub device_type: DeviceType,
    pub vendor: Option<String>,
    pub first_seen: f64,
    pub last_seen: f64,
    pub traffic_bytes: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub position: Position,
    pub open_ports: Vec<u16>,
    pub security: SecuritySummary,
}

impl Device {
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.ip, self.mac)
    }

    /// Whether the hostname is still the address placeholder.
    pub fn hostname_is_placeholder(&self) -> bool {
        self.hostname == self.ip.to_string()
    }

    fn touch(&mut self, bytes: u64, ts: f64, is_source: bool) {
        if ts > self.last_seen {
            self.last_seen = ts;
        }
        self.traffic_bytes = self.traffic_bytes.saturating_add(bytes);
        if is_source {
            self.packets_sent += 1;
        } else {
            self.packets_received += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceObservation {
    pub device: Device,
    /// True only for the call that created the record.
    pub discovered: bool,
}

/// Concurrent device map. Records are only mutated through these methods
/// and reads hand out copies.
pub struct DeviceRegistry {
    devices: DashMap<DeviceKey, Device>,
    classifier: Classifier,
    layout: Arc<LayoutEngine>,
    max_flagged: usize,
}

impl DeviceRegistry {
    pub fn new(classifier: Classifier, layout: Arc<LayoutEngine>, max_flagged: usize) -> Self {
        DeviceRegistry {
            devices: DashMap::new(),
            classifier,
            layout,
            max_flagged,
        }
    }

    /// Record one packet naming `(ip, mac)` as source or destination.
    pub fn observe(
        &self,
        ip: IpAddr,
        mac: MacAddr,
        bytes: u64,
        ts: f64,
        is_source: bool,
    ) -> DeviceObservation {
        let key = DeviceKey::new(ip, mac);

        if let Some(mut device) = self.devices.get_mut(&key) {
            device.touch(bytes, ts, is_source);
            return DeviceObservation {
                device: device.clone(),
                discovered: false,
            };
        }

        // No shard lock may be held here: collecting positions walks every shard.
        let fresh = self.build(key, ts);

        match self.devices.entry(key) {
            Entry::Occupied(mut entry) => {
                let device = entry.get_mut();
                device.touch(bytes, ts, is_source);
                DeviceObservation {
                    device: device.clone(),
                    discovered: false,
                }
            }
            Entry::Vacant(entry) => {
                let mut device = fresh;
                device.touch(bytes, ts, is_source);
                let device = entry.insert(device).clone();
                tracing::debug!(
                    ip = %device.ip,
                    mac = %device.mac,
                    kind = %device.device_type,
                    "device discovered"
                );
                DeviceObservation {
                    device,
                    discovered: true,
                }
            }
        }
    }

    fn build(&self, key: DeviceKey, ts: f64) -> Device {
        let existing = self.positions();
        let placement = self.layout.place(&key.ip, &existing);
        if !placement.resolved {
            tracing::trace!(ip = %key.ip, "placement attempts exhausted");
        }
        Device {
            ip: key.ip,
            mac: key.mac,
            hostname: key.ip.to_string(),
            device_type: self.classifier.classify(&key.mac, &key.ip, None, None),
            vendor: self.classifier.vendor(&key.mac).map(str::to_string),
            first_seen: ts,
            last_seen: ts,
            traffic_bytes: 0,
            packets_sent: 0,
            packets_received: 0,
            position: placement.position,
            open_ports: Vec::new(),
            security: SecuritySummary::default(),
        }
    }

    /// Store a resolved hostname. An Unknown device is re-classified with it.
    pub fn set_hostname(&self, key: &DeviceKey, hostname: &str) -> Option<Device> {
        let mut device = self.devices.get_mut(key)?;
        device.hostname = hostname.to_string();
        self.refine(&mut device);
        Some(device.clone())
    }

    /// Record the result of an external port scan.
    pub fn set_open_ports(&self, key: &DeviceKey, ports: &[u16]) -> Option<Device> {
        let mut device = self.devices.get_mut(key)?;
        let mut ports = ports.to_vec();
        ports.sort_unstable();
        ports.dedup();
        device.open_ports = ports;
        self.refine(&mut device);
        Some(device.clone())
    }

    fn refine(&self, device: &mut Device) {
        if device.device_type != DeviceType::Unknown {
            return;
        }
        let hostname = (!device.hostname_is_placeholder()).then_some(device.hostname.as_str());
        let ports = (!device.open_ports.is_empty()).then_some(device.open_ports.as_slice());
        device.device_type = self
            .classifier
            .classify(&device.mac, &device.ip, hostname, ports);
    }

    /// Note suspicious behaviour. The threat level only ever rises.
    pub fn flag_activity(&self, key: &DeviceKey, severity: Severity, activity: &str) -> Option<Device> {
        let mut device = self.devices.get_mut(key)?;
        let level = ThreatLevel::from(severity);
        let security = &mut device.security;
        if level > security.threat_level {
            security.threat_level = level;
        }
        security.flagged_activities.push(activity.to_string());
        let excess = security.flagged_activities.len().saturating_sub(self.max_flagged);
        if excess > 0 {
            security.flagged_activities.drain(..excess);
        }
        Some(device.clone())
    }

    /// Overwrite positions from a batch layout. Unknown keys are ignored.
    pub fn apply_positions(&self, positions: &[(DeviceKey, Position)]) -> usize {
        let mut applied = 0;
        for (key, position) in positions {
            if let Some(mut device) = self.devices.get_mut(key) {
                device.position = *position;
                applied += 1;
            }
        }
        applied
    }

    pub fn get(&self, key: &DeviceKey) -> Option<Device> {
        self.devices.get(key).map(|d| d.clone())
    }

    /// Copies of every device, sorted by identity.
    pub fn devices(&self) -> Vec<Device> {
        let mut out: Vec<Device> = self.devices.iter().map(|d| d.value().clone()).collect();
        out.sort_by_key(Device::key);
        out
    }

    pub fn positions(&self) -> Vec<Position> {
        self.devices.iter().map(|d| d.position).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierConfig, LayoutConfig};
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    fn registry() -> DeviceRegistry {
        let layout = LayoutConfig {
            seed: Some(3),
            ..LayoutConfig::default()
        };
        DeviceRegistry::new(
            Classifier::new(&ClassifierConfig::default()),
            Arc::new(LayoutEngine::new(&layout)),
            4,
        )
    }

    fn host(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    const MAC: MacAddr = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

    #[test]
    fn first_observation_discovers_once() {
        let reg = registry();
        let first = reg.observe(host(20), MAC, 100, 1.0, true);
        assert!(first.discovered);
        assert_eq!(first.device.hostname, "192.168.1.20");
        assert_eq!(first.device.packets_sent, 1);
        let second = reg.observe(host(20), MAC, 50, 2.0, false);
        assert!(!second.discovered);
        assert_eq!(second.device.traffic_bytes, 150);
        assert_eq!(second.device.packets_received, 1);
        assert_eq!(second.device.position, first.device.position);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn identity_includes_mac() {
        let reg = registry();
        reg.observe(host(20), MAC, 1, 1.0, true);
        let other = reg.observe(host(20), MacAddr([0x02, 0, 0, 0, 0, 9]), 1, 1.0, true);
        assert!(other.discovered);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn last_seen_never_moves_backwards() {
        let reg = registry();
        reg.observe(host(5), MAC, 1, 10.0, true);
        let d = reg.observe(host(5), MAC, 1, 4.0, true).device;
        assert_eq!(d.last_seen, 10.0);
        assert!(d.last_seen >= d.first_seen);
    }

    #[test]
    fn hostname_refines_unknown_devices_only() {
        let reg = registry();
        let key = DeviceKey::new(host(60), MAC);
        reg.observe(key.ip, key.mac, 1, 1.0, true);
        let d = reg.set_hostname(&key, "lobby-printer").unwrap();
        assert_eq!(d.device_type, DeviceType::Printer);
        // classified devices keep their type
        let d = reg.set_hostname(&key, "core-router").unwrap();
        assert_eq!(d.device_type, DeviceType::Printer);
        assert_eq!(d.hostname, "core-router");

        let gw = DeviceKey::new(host(1), MAC);
        reg.observe(gw.ip, gw.mac, 1, 1.0, true);
        assert_eq!(reg.set_open_ports(&gw, &[9100]).unwrap().device_type, DeviceType::Router);
        assert!(reg.set_hostname(&DeviceKey::new(host(99), MAC), "x").is_none());
    }

    #[test]
    fn open_ports_are_sorted_and_refine() {
        let reg = registry();
        let key = DeviceKey::new(host(70), MAC);
        reg.observe(key.ip, key.mac, 1, 1.0, true);
        let d = reg.set_open_ports(&key, &[631, 22, 631]).unwrap();
        assert_eq!(d.open_ports, vec![22, 631]);
        assert_eq!(d.device_type, DeviceType::Printer);
    }

    #[test]
    fn flagged_activity_is_bounded_and_level_only_rises() {
        let reg = registry();
        let key = DeviceKey::new(host(80), MAC);
        reg.observe(key.ip, key.mac, 1, 1.0, true);
        reg.flag_activity(&key, Severity::High, "a");
        for i in 0..6 {
            reg.flag_activity(&key, Severity::Low, &format!("low-{}", i));
        }
        let d = reg.get(&key).unwrap();
        assert_eq!(d.security.threat_level, ThreatLevel::High);
        assert_eq!(d.security.flagged_activities.len(), 4);
        assert_eq!(d.security.flagged_activities[3], "low-5");
    }

    #[test]
    fn batch_positions_apply_to_known_devices() {
        let reg = registry();
        let key = DeviceKey::new(host(90), MAC);
        reg.observe(key.ip, key.mac, 1, 1.0, true);
        let target = Position::new(1.0, 2.0, 3.0);
        let ghost = DeviceKey::new(host(91), MAC);
        assert_eq!(reg.apply_positions(&[(key, target), (ghost, target)]), 1);
        assert_eq!(reg.get(&key).unwrap().position, target);
    }

    #[test]
    fn concurrent_first_sightings_converge() {
        let reg = registry();
        let discovered = std::sync::atomic::AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..200 {
                        if reg.observe(host(33), MAC, 10, 1.0, true).discovered {
                            discovered.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(discovered.into_inner(), 1);
        let d = reg.get(&DeviceKey::new(host(33), MAC)).unwrap();
        assert_eq!(d.packets_sent, 1600);
        assert_eq!(d.traffic_bytes, 16_000);
    }

    #[test]
    fn devices_come_back_sorted() {
        let reg = registry();
        for last in [9u8, 3, 7, 1] {
            reg.observe(host(last), MAC, 1, 1.0, true);
        }
        let ips: Vec<IpAddr> = reg.devices().iter().map(|d| d.ip).collect();
        assert_eq!(ips, vec![host(1), host(3), host(7), host(9)]);
    }

    proptest! {
        #[test]
        fn counters_match_observation_roles(
            calls in proptest::collection::vec((any::<bool>(), 0u64..2000, 0.0f64..1e6), 1..60)
        ) {
            let reg = registry();
            let mut prev_last_seen = f64::MIN;
            for (is_source, bytes, ts) in &calls {
                let d = reg.observe(host(44), MAC, *bytes, *ts, *is_source).device;
                prop_assert!(d.last_seen >= prev_last_seen);
                prop_assert!(d.last_seen >= d.first_seen);
                prev_last_seen = d.last_seen;
            }
            let d = reg.get(&DeviceKey::new(host(44), MAC)).unwrap();
            let sent = calls.iter().filter(|(s, ..)| *s).count() as u64;
            prop_assert_eq!(d.packets_sent, sent);
            prop_assert_eq!(d.packets_received, calls.len() as u64 - sent);
            prop_assert_eq!(d.traffic_bytes, calls.iter().map(|(_, b, _)| *b).sum::<u64>());
        }
    }
}
