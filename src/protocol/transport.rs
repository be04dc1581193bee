//! Zero-copy TCP, UDP and ICMP header views.
//!
//! TCP (20-60 bytes): ports(4) seq(4) ack(4) offset/flags(2) window(2)
//! checksum(2) urgent(2) options.
//! UDP (8 bytes): ports(4) length(2) checksum(2).
//! ICMP / ICMPv6 (8 bytes): type(1) code(1) checksum(2) rest(4).

use super::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
pub const ICMP_HEADER_LEN: usize = 8;

/// TCP control bits, copied out of the header so they outlive the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
}

impl TcpFlags {
    pub fn from_bits(bits: u8) -> Self {
        TcpFlags {
            fin: bits & 0x01 != 0,
            syn: bits & 0x02 != 0,
            rst: bits & 0x04 != 0,
            psh: bits & 0x08 != 0,
            ack: bits & 0x10 != 0,
            urg: bits & 0x20 != 0,
        }
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.syn, "SYN"),
            (self.ack, "ACK"),
            (self.fin, "FIN"),
            (self.rst, "RST"),
            (self.psh, "PSH"),
            (self.urg, "URG"),
        ];
        let set: Vec<&str> = names.iter().filter(|(on, _)| *on).map(|(_, n)| *n).collect();
        write!(f, "[{}]", set.join(", "))
    }
}

#[derive(Debug)]
pub struct TcpHeader<'a> {
    data: &'a [u8],
    header_len: usize,
}

impl<'a> TcpHeader<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < TCP_MIN_HEADER_LEN {
            return Err(ParseError::TooShort {
                expected: TCP_MIN_HEADER_LEN,
                actual: data.len(),
            });
        }
        let header_len = (data[12] >> 4) as usize * 4;
        if header_len < TCP_MIN_HEADER_LEN {
            return Err(ParseError::InvalidHeader(format!(
                "TCP data offset {} below minimum",
                header_len / 4
            )));
        }
        if data.len() < header_len {
            return Err(ParseError::TooShort {
                expected: header_len,
                actual: data.len(),
            });
        }
        Ok(TcpHeader { data, header_len })
    }

    #[inline]
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.data[0], self.data[1]])
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    #[inline]
    pub fn sequence_number(&self) -> u32 {
        u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]])
    }

    #[inline]
    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_bits(self.data[13])
    }

    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.header_len..]
    }
}

#[derive(Debug)]
pub struct UdpHeader<'a> {
    data: &'a [u8],
}

impl<'a> UdpHeader<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < UDP_HEADER_LEN {
            return Err(ParseError::TooShort {
                expected: UDP_HEADER_LEN,
                actual: data.len(),
            });
        }
        Ok(UdpHeader { data })
    }

    #[inline]
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.data[0], self.data[1]])
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let declared = (u16::from_be_bytes([self.data[4], self.data[5]]) as usize)
            .saturating_sub(UDP_HEADER_LEN);
        let available = self.data.len() - UDP_HEADER_LEN;
        &self.data[UDP_HEADER_LEN..UDP_HEADER_LEN + declared.min(available)]
    }
}

#[derive(Debug)]
pub struct IcmpHeader<'a> {
    data: &'a [u8],
}

impl<'a> IcmpHeader<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(ParseError::TooShort {
                expected: ICMP_HEADER_LEN,
                actual: data.len(),
            });
        }
        Ok(IcmpHeader { data })
    }

    #[inline]
    pub fn icmp_type(&self) -> u8 {
        self.data[0]
    }

    #[inline]
    pub fn code(&self) -> u8 {
        self.data[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_ports_flags_and_payload() {
        let mut seg = vec![0u8; 24];
        seg[0..2].copy_from_slice(&51000u16.to_be_bytes());
        seg[2..4].copy_from_slice(&443u16.to_be_bytes());
        seg[4..8].copy_from_slice(&7u32.to_be_bytes());
        seg[12] = 0x60; // 24-byte header with options
        seg[13] = 0x12; // SYN+ACK
        seg.extend_from_slice(b"hi");
        let tcp = TcpHeader::parse(&seg).unwrap();
        assert_eq!(tcp.src_port(), 51000);
        assert_eq!(tcp.dst_port(), 443);
        assert_eq!(tcp.sequence_number(), 7);
        assert_eq!(tcp.flags().to_string(), "[SYN, ACK]");
        assert_eq!(tcp.payload(), b"hi");
    }

    #[test]
    fn tcp_offset_beyond_data_is_rejected() {
        let mut seg = vec![0u8; 20];
        seg[12] = 0xF0;
        assert!(TcpHeader::parse(&seg).is_err());
        seg[12] = 0x10;
        assert!(TcpHeader::parse(&seg).is_err());
    }

    #[test]
    fn udp_payload_respects_length_field() {
        let mut dgram = vec![0x00, 0x35, 0xd4, 0x31, 0x00, 0x0c, 0x00, 0x00];
        dgram.extend_from_slice(&[1, 2, 3, 4, 9, 9]);
        let udp = UdpHeader::parse(&dgram).unwrap();
        assert_eq!(udp.src_port(), 53);
        assert_eq!(udp.payload(), &[1, 2, 3, 4]);
        assert!(UdpHeader::parse(&dgram[..7]).is_err());
    }

    #[test]
    fn icmp_type_and_code() {
        let icmp = [3u8, 1, 0, 0, 0, 0, 0, 0];
        let hdr = IcmpHeader::parse(&icmp).unwrap();
        assert_eq!(hdr.icmp_type(), 3);
        assert_eq!(hdr.code(), 1);
    }
}
