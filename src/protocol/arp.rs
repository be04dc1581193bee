//! ARP over Ethernet/IPv4 (RFC 826).
//!
//!   HTYPE(2) PTYPE(2) HLEN(1) PLEN(1) OPER(2)
//!   SHA(6) SPA(4) THA(6) TPA(4)
//!
//! Only the Ethernet/IPv4 form (HLEN=6, PLEN=4) is accepted.

use super::link::MacAddr;
use super::ParseError;
use std::net::Ipv4Addr;

pub const ARP_IPV4_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    Request,
    Reply,
    Other(u16),
}

#[derive(Debug)]
pub struct ArpPacket<'a> {
    data: &'a [u8],
}

impl<'a> ArpPacket<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < ARP_IPV4_LEN {
            return Err(ParseError::TooShort {
                expected: ARP_IPV4_LEN,
                actual: data.len(),
            });
        }
        let ptype = u16::from_be_bytes([data[2], data[3]]);
        if ptype != 0x0800 || data[4] != 6 || data[5] != 4 {
            return Err(ParseError::InvalidHeader(format!(
                "unsupported ARP ptype=0x{:04x} hlen={} plen={}",
                ptype, data[4], data[5]
            )));
        }
        Ok(ArpPacket { data })
    }

    #[inline]
    pub fn operation(&self) -> ArpOperation {
        match u16::from_be_bytes([self.data[6], self.data[7]]) {
            1 => ArpOperation::Request,
            2 => ArpOperation::Reply,
            other => ArpOperation::Other(other),
        }
    }

    #[inline]
    pub fn sender_mac(&self) -> MacAddr {
        MacAddr::from_slice(&self.data[8..14]).unwrap_or_default()
    }

    #[inline]
    pub fn sender_ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.data[14], self.data[15], self.data[16], self.data[17])
    }

    #[inline]
    pub fn target_mac(&self) -> MacAddr {
        MacAddr::from_slice(&self.data[18..24]).unwrap_or_default()
    }

    #[inline]
    pub fn target_ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.data[24], self.data[25], self.data[26], self.data[27])
    }
}
