//! Frame → `Packet` decoding.
//!
//! Anything that is not Ethernet carrying IPv4, IPv6 or IPv4-ARP is "not
//! decodable" and yields `None`; the caller counts it and moves on.

use crate::model::{Packet, Protocol};
use crate::protocol::{self, NetworkLayer, TransportLayer};

/// Link-layer framing of a captured buffer (pcap DLT values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    Other(i32),
}

impl From<i32> for LinkType {
    fn from(dlt: i32) -> Self {
        match dlt {
            1 => LinkType::Ethernet,
            other => LinkType::Other(other),
        }
    }
}

/// A decoded packet plus the TCP payload it was carrying, borrowed from the
/// capture buffer for inspection.
#[derive(Debug)]
pub struct Decoded<'a> {
    pub packet: Packet,
    pub tcp_payload: Option<&'a [u8]>,
}

/// Decode one captured frame.
pub fn decode_frame(timestamp: f64, link: LinkType, data: &[u8]) -> Option<Decoded<'_>> {
    if link != LinkType::Ethernet {
        tracing::trace!(?link, "unsupported link type");
        return None;
    }

    let parsed = match protocol::parse_frame(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, len = data.len(), "undecodable frame");
            return None;
        }
    };

    let network = parsed.network.as_ref()?;
    let src_ip = network.src_ip();
    let dst_ip = network.dst_ip();

    let mut src_port = None;
    let mut dst_port = None;
    let mut tcp_flags = None;
    let mut tcp_payload = None;

    // First match wins: TCP, UDP, ICMP, ICMPv6, then ARP.
    let transport = match (&parsed.transport, network) {
        (Some(TransportLayer::Tcp(hdr)), _) => {
            src_port = Some(hdr.src_port());
            dst_port = Some(hdr.dst_port());
            tcp_flags = Some(hdr.flags());
            tcp_payload = Some(parsed.payload);
            Protocol::Tcp
        }
        (Some(TransportLayer::Udp(hdr)), _) => {
            src_port = Some(hdr.src_port());
            dst_port = Some(hdr.dst_port());
            Protocol::Udp
        }
        (Some(TransportLayer::Icmp(_)), _) => Protocol::Icmp,
        (Some(TransportLayer::Icmpv6(_)), _) => Protocol::Icmpv6,
        (None, NetworkLayer::Arp(_)) => Protocol::Arp,
        (None, _) => Protocol::Other,
    };

    let protocol = match (src_port, dst_port) {
        (Some(s), Some(d)) => Protocol::from_ports(transport, s, d),
        _ => transport,
    };

    // ARP names hosts by its own hardware fields; the Ethernet destination
    // of a request is broadcast.
    let (src_mac, dst_mac) = match network {
        NetworkLayer::Arp(arp) => (arp.sender_mac(), arp.target_mac()),
        _ => (parsed.ethernet.src_mac(), parsed.ethernet.dst_mac()),
    };

    Some(Decoded {
        packet: Packet {
            timestamp,
            src_mac,
            dst_mac,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            transport,
            protocol,
            size: data.len(),
            tcp_flags,
            vlan_id: parsed.ethernet.vlan_id(),
            http: None,
            alerts: Vec::new(),
        },
        tcp_payload,
    })
}
