//! Zero-copy header parsers for the layers the engine understands:
//! Ethernet (+802.1Q), ARP, IPv4, IPv6 fixed header, TCP, UDP, ICMP/ICMPv6.

pub mod arp;
pub mod ip;
pub mod link;
pub mod transport;

use std::fmt;
use std::net::IpAddr;

pub use link::MacAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    Ipv4,
    Ipv6,
    Arp,
    VlanTagged,
    Unknown(u16),
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            0x0800 => EtherType::Ipv4,
            0x86DD => EtherType::Ipv6,
            0x0806 => EtherType::Arp,
            0x8100 => EtherType::VlanTagged,
            other => EtherType::Unknown(other),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::Ipv4 => write!(f, "IPv4"),
            EtherType::Ipv6 => write!(f, "IPv6"),
            EtherType::Arp => write!(f, "ARP"),
            EtherType::VlanTagged => write!(f, "802.1Q"),
            EtherType::Unknown(v) => write!(f, "0x{:04x}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Icmp,
    Tcp,
    Udp,
    Icmpv6,
    Unknown(u8),
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        match value {
            1 => IpProtocol::Icmp,
            6 => IpProtocol::Tcp,
            17 => IpProtocol::Udp,
            58 => IpProtocol::Icmpv6,
            other => IpProtocol::Unknown(other),
        }
    }
}

/// Errors from header parsing.
#[derive(Debug)]
pub enum ParseError {
    /// Not enough bytes for the header.
    TooShort { expected: usize, actual: usize },
    /// Header present but its contents are not usable.
    InvalidHeader(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TooShort { expected, actual } => {
                write!(f, "need {} bytes, got {}", expected, actual)
            }
            ParseError::InvalidHeader(msg) => write!(f, "invalid header: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Network layer of a frame. ARP is carried here because it is the only
/// non-IP payload that still names IPv4 hosts.
#[derive(Debug)]
pub enum NetworkLayer<'a> {
    Ipv4(ip::Ipv4Header<'a>),
    Ipv6(ip::Ipv6Header<'a>),
    Arp(arp::ArpPacket<'a>),
}

impl<'a> NetworkLayer<'a> {
    pub fn src_ip(&self) -> IpAddr {
        match self {
            NetworkLayer::Ipv4(h) => IpAddr::V4(h.src_addr()),
            NetworkLayer::Ipv6(h) => IpAddr::V6(h.src_addr()),
            NetworkLayer::Arp(a) => IpAddr::V4(a.sender_ip()),
        }
    }

    pub fn dst_ip(&self) -> IpAddr {
        match self {
            NetworkLayer::Ipv4(h) => IpAddr::V4(h.dst_addr()),
            NetworkLayer::Ipv6(h) => IpAddr::V6(h.dst_addr()),
            NetworkLayer::Arp(a) => IpAddr::V4(a.target_ip()),
        }
    }
}

#[derive(Debug)]
pub enum TransportLayer<'a> {
    Tcp(transport::TcpHeader<'a>),
    Udp(transport::UdpHeader<'a>),
    Icmp(transport::IcmpHeader<'a>),
    Icmpv6(transport::IcmpHeader<'a>),
}

/// A frame parsed down as far as the known layers go.
#[derive(Debug)]
pub struct ParsedFrame<'a> {
    pub ethernet: link::EthernetFrame<'a>,
    pub network: Option<NetworkLayer<'a>>,
    pub transport: Option<TransportLayer<'a>>,
    /// Bytes after the deepest parsed header.
    pub payload: &'a [u8],
}

/// Parse an Ethernet frame through every layer we recognise.
///
/// Only a malformed Ethernet or network header is an error; an unknown
/// EtherType or an unparseable transport header just stops the descent.
pub fn parse_frame(data: &[u8]) -> Result<ParsedFrame<'_>, ParseError> {
    let ethernet = link::EthernetFrame::parse(data)?;
    let l3 = ethernet.payload();

    let (network, l4, proto) = match ethernet.ether_type() {
        EtherType::Ipv4 => {
            let hdr = ip::Ipv4Header::parse(l3)?;
            // Later fragments have no transport header of their own.
            let proto = if hdr.fragment_offset() == 0 {
                Some(hdr.protocol())
            } else {
                None
            };
            let payload = hdr.payload();
            (Some(NetworkLayer::Ipv4(hdr)), payload, proto)
        }
        EtherType::Ipv6 => {
            let hdr = ip::Ipv6Header::parse(l3)?;
            let proto = Some(hdr.next_header());
            let payload = hdr.payload();
            (Some(NetworkLayer::Ipv6(hdr)), payload, proto)
        }
        EtherType::Arp => {
            let pkt = arp::ArpPacket::parse(l3)?;
            (Some(NetworkLayer::Arp(pkt)), &l3[arp::ARP_IPV4_LEN..], None)
        }
        _ => (None, l3, None),
    };

    let (transport, payload) = match proto {
        Some(IpProtocol::Tcp) => match transport::TcpHeader::parse(l4) {
            Ok(hdr) => {
                let payload = hdr.payload();
                (Some(TransportLayer::Tcp(hdr)), payload)
            }
            Err(_) => (None, l4),
        },
        Some(IpProtocol::Udp) => match transport::UdpHeader::parse(l4) {
            Ok(hdr) => {
                let payload = hdr.payload();
                (Some(TransportLayer::Udp(hdr)), payload)
            }
            Err(_) => (None, l4),
        },
        Some(IpProtocol::Icmp) => match transport::IcmpHeader::parse(l4) {
            Ok(hdr) => (Some(TransportLayer::Icmp(hdr)), &l4[transport::ICMP_HEADER_LEN..]),
            Err(_) => (None, l4),
        },
        Some(IpProtocol::Icmpv6) => match transport::IcmpHeader::parse(l4) {
            Ok(hdr) => (Some(TransportLayer::Icmpv6(hdr)), &l4[transport::ICMP_HEADER_LEN..]),
            Err(_) => (None, l4),
        },
        _ => (None, l4),
    };

    Ok(ParsedFrame {
        ethernet,
        network,
        transport,
        payload,
    })
}
