//! Value types shared across the engine: protocols, packets, alerts,
//! device roles and layout positions.

use crate::protocol::transport::TcpFlags;
use crate::protocol::MacAddr;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    Arp,
    Http,
    Https,
    Dns,
    Ssh,
    Ftp,
    Smtp,
    Dhcp,
    Ntp,
    Snmp,
    Other,
}

impl Protocol {
    /// Refine a transport protocol into a service protocol by well-known
    /// port. The lower port is tried first so both directions of a flow
    /// resolve to the same service.
    pub fn from_ports(transport: Protocol, src_port: u16, dst_port: u16) -> Protocol {
        let (lo, hi) = if src_port <= dst_port {
            (src_port, dst_port)
        } else {
            (dst_port, src_port)
        };
        for port in [lo, hi] {
            let service = match (transport, port) {
                (Protocol::Tcp, 80 | 8080 | 8000 | 3000) => Protocol::Http,
                (Protocol::Tcp | Protocol::Udp, 443) | (Protocol::Tcp, 8443) => Protocol::Https,
                (Protocol::Tcp | Protocol::Udp, 53) => Protocol::Dns,
                (Protocol::Tcp, 22) => Protocol::Ssh,
                (Protocol::Tcp, 20 | 21) => Protocol::Ftp,
                (Protocol::Tcp, 25 | 465 | 587) => Protocol::Smtp,
                (Protocol::Udp, 67 | 68) => Protocol::Dhcp,
                (Protocol::Udp, 123) => Protocol::Ntp,
                (Protocol::Udp, 161 | 162) => Protocol::Snmp,
                _ => continue,
            };
            return service;
        }
        transport
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::Icmpv6 => "ICMPV6",
            Protocol::Arp => "ARP",
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Dns => "DNS",
            Protocol::Ssh => "SSH",
            Protocol::Ftp => "FTP",
            Protocol::Smtp => "SMTP",
            Protocol::Dhcp => "DHCP",
            Protocol::Ntp => "NTP",
            Protocol::Snmp => "SNMP",
            Protocol::Other => "OTHER",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let p = match s.to_ascii_uppercase().as_str() {
            "TCP" => Protocol::Tcp,
            "UDP" => Protocol::Udp,
            "ICMP" => Protocol::Icmp,
            "ICMPV6" => Protocol::Icmpv6,
            "ARP" => Protocol::Arp,
            "HTTP" => Protocol::Http,
            "HTTPS" => Protocol::Https,
            "DNS" => Protocol::Dns,
            "SSH" => Protocol::Ssh,
            "FTP" => Protocol::Ftp,
            "SMTP" => Protocol::Smtp,
            "DHCP" => Protocol::Dhcp,
            "NTP" => Protocol::Ntp,
            "SNMP" => Protocol::Snmp,
            "OTHER" => Protocol::Other,
            other => return Err(format!("unknown protocol '{}'", other)),
        };
        Ok(p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceType {
    Unknown,
    Computer,
    Server,
    Router,
    Switch,
    AccessPoint,
    Firewall,
    Printer,
    MobilePhone,
    Tablet,
    IoTDevice,
    Camera,
    SmartTV,
    GameConsole,
    NetworkStorage,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    SuspiciousTraffic,
    SqlInjection,
    CrossSiteScripting,
    UnencryptedSensitiveData,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Longest evidence excerpt kept on an alert, in characters.
pub const MAX_EVIDENCE_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: Uuid,
    pub timestamp: f64,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub evidence: String,
    pub source: Option<IpAddr>,
    pub destination: Option<IpAddr>,
    pub resolved: bool,
}

impl SecurityAlert {
    pub fn new(
        timestamp: f64,
        alert_type: AlertType,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        evidence: &str,
    ) -> Self {
        SecurityAlert {
            id: Uuid::new_v4(),
            timestamp,
            alert_type,
            severity,
            title: title.into(),
            description: description.into(),
            evidence: truncate_chars(evidence, MAX_EVIDENCE_CHARS),
            source: None,
            destination: None,
            resolved: false,
        }
    }

    pub fn between(mut self, source: IpAddr, destination: IpAddr) -> Self {
        self.source = Some(source);
        self.destination = Some(destination);
        self
    }
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl From<Severity> for ThreatLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => ThreatLevel::Low,
            Severity::Medium => ThreatLevel::Medium,
            Severity::High => ThreatLevel::High,
            Severity::Critical => ThreatLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Position { x, y, z }
    }

    #[inline]
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn clamped(&self, extent: f32) -> Position {
        Position {
            x: self.x.clamp(-extent, extent),
            y: self.y.clamp(-extent, extent),
            z: self.z.clamp(-extent, extent),
        }
    }
}

/// HTTP fields lifted onto a packet record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HttpSummary {
    pub method: Option<String>,
    pub url: Option<String>,
    pub host: Option<String>,
    pub user_agent: Option<String>,
    pub status_code: Option<u16>,
}

/// Owned record of one decoded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub timestamp: f64,
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// Layer-4 (or ARP) protocol as decoded.
    pub transport: Protocol,
    /// Service protocol after well-known port refinement.
    pub protocol: Protocol,
    /// Captured frame length in bytes.
    pub size: usize,
    pub tcp_flags: Option<TcpFlags>,
    pub vlan_id: Option<u16>,
    pub http: Option<HttpSummary>,
    pub alerts: Vec<SecurityAlert>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_refinement_is_direction_free() {
        assert_eq!(Protocol::from_ports(Protocol::Tcp, 51515, 80), Protocol::Http);
        assert_eq!(Protocol::from_ports(Protocol::Tcp, 80, 51515), Protocol::Http);
        assert_eq!(Protocol::from_ports(Protocol::Udp, 53, 40000), Protocol::Dns);
        assert_eq!(Protocol::from_ports(Protocol::Udp, 40000, 40001), Protocol::Udp);
        // 22 wins over 8080 because it is the lower port
        assert_eq!(Protocol::from_ports(Protocol::Tcp, 8080, 22), Protocol::Ssh);
    }

    #[test]
    fn protocol_names_parse_case_insensitively() {
        assert_eq!("https".parse::<Protocol>().unwrap(), Protocol::Https);
        assert_eq!("IcmpV6".parse::<Protocol>().unwrap(), Protocol::Icmpv6);
        assert!("quic".parse::<Protocol>().is_err());
    }

    #[test]
    fn evidence_is_truncated_on_char_boundary() {
        let long = "é".repeat(400);
        let alert = SecurityAlert::new(
            0.0,
            AlertType::SuspiciousTraffic,
            Severity::Medium,
            "t",
            "d",
            &long,
        );
        assert_eq!(alert.evidence.chars().count(), MAX_EVIDENCE_CHARS);
        assert!(!alert.resolved);
    }

    #[test]
    fn severity_maps_to_threat_level_ordering() {
        assert!(ThreatLevel::from(Severity::Critical) > ThreatLevel::from(Severity::Low));
        assert!(ThreatLevel::None < ThreatLevel::Low);
    }
}
