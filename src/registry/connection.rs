use crate::model::{Protocol, SecurityAlert};
use crate::protocol::transport::TcpFlags;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

/// One side of a connection. Port is 0 for protocols without ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Endpoint { ip, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V6(_) => write!(f, "[{}]:{}", self.ip, self.port),
            IpAddr::V4(_) => write!(f, "{}:{}", self.ip, self.port),
        }
    }
}

impl PartialOrd for Endpoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Endpoint {
    fn cmp(&self, other: &Self) -> Ordering {
        endpoint_key(self).cmp(&endpoint_key(other))
    }
}

fn endpoint_key(endpoint: &Endpoint) -> (u8, [u8; 16], u16) {
    let (version, addr) = ip_key(endpoint.ip);
    (version, addr, endpoint.port)
}

fn ip_key(ip: IpAddr) -> (u8, [u8; 16]) {
    match ip {
        IpAddr::V4(addr) => {
            let mut bytes = [0u8; 16];
            bytes[12..].copy_from_slice(&addr.octets());
            (4, bytes)
        }
        IpAddr::V6(addr) => (6, addr.octets()),
    }
}

/// Which way a packet travelled relative to the canonical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AtoB,
    BtoA,
}

/// Direction-free identity: the endpoints in canonical order plus protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub protocol: Protocol,
    pub a: Endpoint,
    pub b: Endpoint,
}

impl ConnectionKey {
    pub fn new(protocol: Protocol, src: Endpoint, dst: Endpoint) -> (Self, Direction) {
        if src <= dst {
            (
                ConnectionKey {
                    protocol,
                    a: src,
                    b: dst,
                },
                Direction::AtoB,
            )
        } else {
            (
                ConnectionKey {
                    protocol,
                    a: dst,
                    b: src,
                },
                Direction::BtoA,
            )
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <-> {}", self.protocol, self.a, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    SynSent,
    SynAck,
    Established,
    FinWait,
    Closed,
    Reset,
    Unknown,
    /// Connectionless traffic.
    Active,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::SynSent => "syn_sent",
            ConnectionState::SynAck => "syn_ack",
            ConnectionState::Established => "established",
            ConnectionState::FinWait => "fin_wait",
            ConnectionState::Closed => "closed",
            ConnectionState::Reset => "reset",
            ConnectionState::Unknown => "unknown",
            ConnectionState::Active => "active",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub key: ConnectionKey,
    pub protocol: Protocol,
    /// Endpoints in the direction of the first observed packet.
    pub source: Endpoint,
    pub destination: Endpoint,
    pub is_two_way: bool,
    pub state: ConnectionState,
    pub start_time: f64,
    pub last_activity: f64,
    pub total_bytes: u64,
    pub packet_count: u64,
    pub packets_forward: u64,
    pub packets_reverse: u64,
    pub bytes_forward: u64,
    pub bytes_reverse: u64,
    pub alerts: Vec<SecurityAlert>,
    #[serde(skip, default = "default_direction")]
    forward: Direction,
}

fn default_direction() -> Direction {
    Direction::AtoB
}

impl Connection {
    fn new(key: ConnectionKey, src: Endpoint, dst: Endpoint, forward: Direction, ts: f64, tcp: bool) -> Self {
        Connection {
            key,
            protocol: key.protocol,
            source: src,
            destination: dst,
            is_two_way: false,
            state: if tcp {
                ConnectionState::Unknown
            } else {
                ConnectionState::Active
            },
            start_time: ts,
            last_activity: ts,
            total_bytes: 0,
            packet_count: 0,
            packets_forward: 0,
            packets_reverse: 0,
            bytes_forward: 0,
            bytes_reverse: 0,
            alerts: Vec::new(),
            forward,
        }
    }

    fn record(&mut self, direction: Direction, bytes: u64, ts: f64, flags: Option<TcpFlags>) {
        if ts > self.last_activity {
            self.last_activity = ts;
        }
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        self.packet_count += 1;
        if direction == self.forward {
            self.packets_forward += 1;
            self.bytes_forward = self.bytes_forward.saturating_add(bytes);
        } else {
            self.packets_reverse += 1;
            self.bytes_reverse = self.bytes_reverse.saturating_add(bytes);
            self.is_two_way = true;
        }
        if let Some(flags) = flags {
            self.update_tcp_state(flags);
        }
    }

    fn update_tcp_state(&mut self, flags: TcpFlags) {
        if flags.rst {
            self.state = ConnectionState::Reset;
            return;
        }
        if flags.syn && !flags.ack {
            self.state = ConnectionState::SynSent;
            return;
        }
        if flags.syn && flags.ack {
            self.state = ConnectionState::SynAck;
            return;
        }
        if flags.fin {
            self.state = match self.state {
                // FIN from each side
                ConnectionState::FinWait => ConnectionState::Closed,
                ConnectionState::Closed => ConnectionState::Closed,
                _ => ConnectionState::FinWait,
            };
            return;
        }
        if flags.ack
            && !matches!(
                self.state,
                ConnectionState::Reset | ConnectionState::Closed | ConnectionState::FinWait
            )
        {
            self.state = ConnectionState::Established;
        }
    }

    pub fn duration(&self) -> f64 {
        (self.last_activity - self.start_time).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionObservation {
    pub connection: Connection,
    /// True only for the call that created the record.
    pub established: bool,
}

pub struct ConnectionRegistry {
    connections: DashMap<ConnectionKey, Connection>,
    max_alerts: usize,
}

impl ConnectionRegistry {
    pub fn new(max_alerts: usize) -> Self {
        ConnectionRegistry {
            connections: DashMap::new(),
            max_alerts,
        }
    }

    /// Record one packet from `src` to `dst`. A reply lands on the record
    /// created by the request and marks it two-way.
    pub fn observe(
        &self,
        src: Endpoint,
        dst: Endpoint,
        protocol: Protocol,
        bytes: u64,
        ts: f64,
        tcp_flags: Option<TcpFlags>,
    ) -> ConnectionObservation {
        let (key, direction) = ConnectionKey::new(protocol, src, dst);
        match self.connections.entry(key) {
            Entry::Occupied(mut entry) => {
                let conn = entry.get_mut();
                conn.record(direction, bytes, ts, tcp_flags);
                ConnectionObservation {
                    connection: conn.clone(),
                    established: false,
                }
            }
            Entry::Vacant(entry) => {
                let mut conn = Connection::new(key, src, dst, direction, ts, tcp_flags.is_some());
                conn.record(direction, bytes, ts, tcp_flags);
                let connection = entry.insert(conn).clone();
                tracing::debug!(connection = %key, "connection established");
                ConnectionObservation {
                    connection,
                    established: true,
                }
            }
        }
    }

    /// Attach inspector alerts, keeping only the newest `max_alerts`.
    pub fn attach_alerts(&self, key: &ConnectionKey, alerts: &[SecurityAlert]) -> bool {
        let Some(mut conn) = self.connections.get_mut(key) else {
            return false;
        };
        conn.alerts.extend_from_slice(alerts);
        let excess = conn.alerts.len().saturating_sub(self.max_alerts);
        if excess > 0 {
            conn.alerts.drain(..excess);
        }
        true
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<Connection> {
        self.connections.get(key).map(|c| c.clone())
    }

    /// Copies of every connection, sorted by canonical key.
    pub fn connections(&self) -> Vec<Connection> {
        let mut out: Vec<Connection> = self.connections.iter().map(|c| c.value().clone()).collect();
        out.sort_by_key(|c| c.key);
        out
    }

    /// Canonical endpoint pairs.
    pub fn links(&self) -> Vec<(IpAddr, IpAddr)> {
        self.connections.iter().map(|c| (c.key.a.ip, c.key.b.ip)).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertType, Severity};
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    fn ep(last: u8, port: u16) -> Endpoint {
        Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)), port)
    }

    fn flags(bits: u8) -> Option<TcpFlags> {
        Some(TcpFlags::from_bits(bits))
    }

    const SYN: u8 = 0x02;
    const ACK: u8 = 0x10;
    const FIN: u8 = 0x01;
    const RST: u8 = 0x04;

    #[test]
    fn key_is_direction_free() {
        let (k1, d1) = ConnectionKey::new(Protocol::Tcp, ep(2, 80), ep(1, 5000));
        let (k2, d2) = ConnectionKey::new(Protocol::Tcp, ep(1, 5000), ep(2, 80));
        assert_eq!(k1, k2);
        assert_ne!(d1, d2);
        let (k3, _) = ConnectionKey::new(Protocol::Udp, ep(1, 5000), ep(2, 80));
        assert_ne!(k1, k3);
    }

    #[test]
    fn reply_marks_the_request_record_two_way() {
        let reg = ConnectionRegistry::new(10);
        let client = ep(9, 51000);
        let server = ep(1, 53);
        let first = reg.observe(client, server, Protocol::Dns, 70, 1.0, None);
        assert!(first.established);
        assert!(!first.connection.is_two_way);
        assert_eq!(first.connection.state, ConnectionState::Active);

        let reply = reg.observe(server, client, Protocol::Dns, 130, 1.1, None);
        assert!(!reply.established);
        let c = reply.connection;
        assert!(c.is_two_way);
        assert_eq!(c.source, client);
        assert_eq!(c.destination, server);
        assert_eq!(c.total_bytes, 200);
        assert_eq!((c.bytes_forward, c.bytes_reverse), (70, 130));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn tcp_handshake_and_teardown() {
        let reg = ConnectionRegistry::new(10);
        let (c, s) = (ep(5, 40000), ep(6, 22));
        let step = |src, dst, bits| reg.observe(src, dst, Protocol::Ssh, 60, 0.0, flags(bits)).connection.state;
        assert_eq!(step(c, s, SYN), ConnectionState::SynSent);
        assert_eq!(step(s, c, SYN | ACK), ConnectionState::SynAck);
        assert_eq!(step(c, s, ACK), ConnectionState::Established);
        assert_eq!(step(c, s, FIN | ACK), ConnectionState::FinWait);
        assert_eq!(step(s, c, ACK), ConnectionState::FinWait);
        assert_eq!(step(s, c, FIN | ACK), ConnectionState::Closed);
        assert_eq!(step(c, s, ACK), ConnectionState::Closed);
    }

    #[test]
    fn reset_wins() {
        let reg = ConnectionRegistry::new(10);
        reg.observe(ep(1, 1), ep(2, 2), Protocol::Tcp, 1, 0.0, flags(SYN));
        let c = reg.observe(ep(2, 2), ep(1, 1), Protocol::Tcp, 1, 0.0, flags(RST | ACK));
        assert_eq!(c.connection.state, ConnectionState::Reset);
    }

    #[test]
    fn alerts_are_bounded() {
        let reg = ConnectionRegistry::new(3);
        let obs = reg.observe(ep(1, 1), ep(2, 80), Protocol::Http, 1, 0.0, flags(ACK));
        let alert = |n: u32| {
            crate::model::SecurityAlert::new(n as f64, AlertType::SqlInjection, Severity::Critical, "t", "d", "e")
        };
        let batch: Vec<_> = (0..5).map(alert).collect();
        assert!(reg.attach_alerts(&obs.connection.key, &batch));
        let c = reg.get(&obs.connection.key).unwrap();
        assert_eq!(c.alerts.len(), 3);
        assert_eq!(c.alerts[0].timestamp, 2.0);
        let (missing, _) = ConnectionKey::new(Protocol::Http, ep(7, 7), ep(8, 8));
        assert!(!reg.attach_alerts(&missing, &batch));
    }

    #[test]
    fn concurrent_creators_share_one_record() {
        let reg = ConnectionRegistry::new(10);
        let created = std::sync::atomic::AtomicUsize::new(0);
        std::thread::scope(|s| {
            for t in 0..8u8 {
                let reg = &reg;
                let created = &created;
                s.spawn(move || {
                    for _ in 0..250 {
                        let (src, dst) = if t % 2 == 0 {
                            (ep(1, 1000), ep(2, 2000))
                        } else {
                            (ep(2, 2000), ep(1, 1000))
                        };
                        if reg.observe(src, dst, Protocol::Udp, 4, 0.0, None).established {
                            created.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(created.into_inner(), 1);
        assert_eq!(reg.len(), 1);
        let c = &reg.connections()[0];
        assert_eq!(c.packet_count, 2000);
        assert_eq!(c.total_bytes, 8000);
        assert!(c.is_two_way);
    }

    proptest! {
        #[test]
        fn one_record_and_byte_sum_for_any_direction_mix(
            packets in proptest::collection::vec((any::<bool>(), 1u64..1500), 1..80)
        ) {
            let reg = ConnectionRegistry::new(10);
            let (a, b) = (ep(3, 443), ep(4, 61000));
            for (forward, size) in &packets {
                let (src, dst) = if *forward { (a, b) } else { (b, a) };
                reg.observe(src, dst, Protocol::Https, *size, 0.0, None);
            }
            prop_assert_eq!(reg.len(), 1);
            let c = &reg.connections()[0];
            prop_assert_eq!(c.total_bytes, packets.iter().map(|(_, s)| *s).sum::<u64>());
            prop_assert_eq!(c.packet_count, packets.len() as u64);
            let both = packets.iter().any(|(f, _)| *f) && packets.iter().any(|(f, _)| !*f);
            prop_assert_eq!(c.is_two_way, both);
        }
    }
}
