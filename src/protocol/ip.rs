//! Zero-copy IPv4 and IPv6 (fixed header only) parsers.
//!
//! IPv4 (20-60 bytes):
//!  +-------+-------+---------------+-------------------------------+
//!  |Version|  IHL  |    DSCP/ECN   |          Total Length         |
//!  +-------+-------+---------------+-----+-------------------------+
//!  |         Identification        |Flags|      Fragment Offset    |
//!  +---------------+---------------+-----+-------------------------+
//!  |      TTL      |    Protocol   |         Header Checksum       |
//!  +---------------+---------------+-------------------------------+
//!  |                 Source Address / Destination Address          |
//!  +---------------------------------------------------------------+
//!
//! IPv6 (40 bytes): version/class/label(4) payload len(2) next header(1)
//! hop limit(1) source(16) destination(16). Extension headers are not
//! walked; they show up as the transport payload.

use super::{IpProtocol, ParseError};
use std::net::{Ipv4Addr, Ipv6Addr};

pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;

#[derive(Debug)]
pub struct Ipv4Header<'a> {
    data: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(ParseError::TooShort {
                expected: IPV4_MIN_HEADER_LEN,
                actual: data.len(),
            });
        }
        let version = data[0] >> 4;
        if version != 4 {
            return Err(ParseError::InvalidHeader(format!(
                "IPv4 header carries version {}",
                version
            )));
        }
        let header_len = (data[0] & 0x0F) as usize * 4;
        if header_len < IPV4_MIN_HEADER_LEN {
            return Err(ParseError::InvalidHeader(format!(
                "IPv4 header length {} below minimum",
                header_len
            )));
        }
        if data.len() < header_len {
            return Err(ParseError::TooShort {
                expected: header_len,
                actual: data.len(),
            });
        }
        Ok(Ipv4Header { data, header_len })
    }

    #[inline]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    #[inline]
    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    /// Fragment offset in 8-byte units; non-zero means a trailing fragment
    /// with no transport header.
    #[inline]
    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([self.data[6] & 0x1F, self.data[7]])
    }

    #[inline]
    pub fn ttl(&self) -> u8 {
        self.data[8]
    }

    #[inline]
    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.data[9])
    }

    #[inline]
    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.data[12], self.data[13], self.data[14], self.data[15])
    }

    #[inline]
    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.data[16], self.data[17], self.data[18], self.data[19])
    }

    /// Bytes after the header, clamped to the declared total length so
    /// Ethernet padding is not handed to the transport parser.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let declared = (self.total_length() as usize).saturating_sub(self.header_len);
        let available = self.data.len() - self.header_len;
        &self.data[self.header_len..self.header_len + declared.min(available)]
    }
}

#[derive(Debug)]
pub struct Ipv6Header<'a> {
    data: &'a [u8],
}

impl<'a> Ipv6Header<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < IPV6_HEADER_LEN {
            return Err(ParseError::TooShort {
                expected: IPV6_HEADER_LEN,
                actual: data.len(),
            });
        }
        let version = data[0] >> 4;
        if version != 6 {
            return Err(ParseError::InvalidHeader(format!(
                "IPv6 header carries version {}",
                version
            )));
        }
        Ok(Ipv6Header { data })
    }

    #[inline]
    pub fn payload_length(&self) -> u16 {
        u16::from_be_bytes([self.data[4], self.data[5]])
    }

    #[inline]
    pub fn next_header(&self) -> IpProtocol {
        IpProtocol::from(self.data[6])
    }

    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.data[7]
    }

    #[inline]
    pub fn src_addr(&self) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.data[8..24]);
        Ipv6Addr::from(octets)
    }

    #[inline]
    pub fn dst_addr(&self) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.data[24..40]);
        Ipv6Addr::from(octets)
    }

    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let declared = self.payload_length() as usize;
        let available = self.data.len() - IPV6_HEADER_LEN;
        &self.data[IPV6_HEADER_LEN..IPV6_HEADER_LEN + declared.min(available)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4(total_len: u16, proto: u8, trailer: usize) -> Vec<u8> {
        let mut pkt = vec![0u8; 20];
        pkt[0] = 0x45;
        pkt[2..4].copy_from_slice(&total_len.to_be_bytes());
        pkt[8] = 128;
        pkt[9] = proto;
        pkt[12..16].copy_from_slice(&[172, 16, 4, 9]);
        pkt[16..20].copy_from_slice(&[8, 8, 4, 4]);
        pkt.extend(std::iter::repeat(0xee).take(trailer));
        pkt
    }

    #[test]
    fn ipv4_fields_and_padding_clamp() {
        // 8 payload bytes declared, 14 present (6 bytes of Ethernet padding)
        let pkt = ipv4(28, 17, 14);
        let hdr = Ipv4Header::parse(&pkt).unwrap();
        assert_eq!(hdr.protocol(), IpProtocol::Udp);
        assert_eq!(hdr.ttl(), 128);
        assert_eq!(hdr.src_addr(), Ipv4Addr::new(172, 16, 4, 9));
        assert_eq!(hdr.dst_addr(), Ipv4Addr::new(8, 8, 4, 4));
        assert_eq!(hdr.payload().len(), 8);
    }

    #[test]
    fn ipv4_rejects_bad_version_and_ihl() {
        let mut pkt = ipv4(20, 6, 0);
        pkt[0] = 0x65;
        assert!(Ipv4Header::parse(&pkt).is_err());
        pkt[0] = 0x43;
        assert!(Ipv4Header::parse(&pkt).is_err());
        pkt[0] = 0x46; // claims 24 bytes, only 20 present
        assert!(Ipv4Header::parse(&pkt).is_err());
    }

    #[test]
    fn ipv6_fixed_header() {
        let mut pkt = vec![0u8; 40];
        pkt[0] = 0x60;
        pkt[5] = 8;
        pkt[6] = 58;
        pkt[7] = 255;
        pkt[8] = 0xfe;
        pkt[9] = 0x80;
        pkt[23] = 1;
        pkt[39] = 2;
        pkt.extend_from_slice(&[0u8; 8]);
        let hdr = Ipv6Header::parse(&pkt).unwrap();
        assert_eq!(hdr.next_header(), IpProtocol::Icmpv6);
        assert_eq!(hdr.hop_limit(), 255);
        assert!(hdr.src_addr().to_string().starts_with("fe80"));
        assert_eq!(hdr.dst_addr(), "::2".parse::<Ipv6Addr>().unwrap());
        assert_eq!(hdr.payload().len(), 8);
        assert!(Ipv6Header::parse(&pkt[..39]).is_err());
    }
}
