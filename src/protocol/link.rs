//! Link-layer parsing: Ethernet II frames with an optional 802.1Q tag.
//!
//! Ethernet II layout:
//!   - Destination MAC: 6 bytes
//!   - Source MAC:      6 bytes
//!   - EtherType:       2 bytes (0x8100 means a 4-byte VLAN tag follows)
//!   - Payload

use super::{EtherType, ParseError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 6]>::try_from(bytes).ok().map(MacAddr)
    }

    /// The vendor-identifying first three octets.
    #[inline]
    pub fn oui(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    #[inline]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit set (multicast or broadcast).
    #[inline]
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = ParseError;

    /// Accepts `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for slot in out.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| ParseError::InvalidHeader(format!("short MAC address '{}'", s)))?;
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidHeader(format!("bad MAC octet '{}'", part)))?;
        }
        if parts.next().is_some() {
            return Err(ParseError::InvalidHeader(format!("long MAC address '{}'", s)));
        }
        Ok(MacAddr(out))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Zero-copy view over an Ethernet frame, VLAN tag already skipped.
#[derive(Debug)]
pub struct EthernetFrame<'a> {
    data: &'a [u8],
    ether_type: EtherType,
    vlan_id: Option<u16>,
    payload_offset: usize,
}

impl<'a> EthernetFrame<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < ETH_HEADER_LEN {
            return Err(ParseError::TooShort {
                expected: ETH_HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut ether_type = EtherType::from(u16::from_be_bytes([data[12], data[13]]));
        let mut payload_offset = ETH_HEADER_LEN;
        let mut vlan_id = None;

        if ether_type == EtherType::VlanTagged {
            let needed = ETH_HEADER_LEN + VLAN_TAG_LEN;
            if data.len() < needed {
                return Err(ParseError::TooShort {
                    expected: needed,
                    actual: data.len(),
                });
            }
            let tci = u16::from_be_bytes([data[14], data[15]]);
            vlan_id = Some(tci & 0x0FFF);
            ether_type = EtherType::from(u16::from_be_bytes([data[16], data[17]]));
            payload_offset = needed;
        }

        Ok(EthernetFrame {
            data,
            ether_type,
            vlan_id,
            payload_offset,
        })
    }

    #[inline]
    pub fn dst_mac(&self) -> MacAddr {
        MacAddr([
            self.data[0],
            self.data[1],
            self.data[2],
            self.data[3],
            self.data[4],
            self.data[5],
        ])
    }

    #[inline]
    pub fn src_mac(&self) -> MacAddr {
        MacAddr([
            self.data[6],
            self.data[7],
            self.data[8],
            self.data[9],
            self.data[10],
            self.data[11],
        ])
    }

    /// EtherType of the encapsulated payload (inner type when VLAN-tagged).
    #[inline]
    pub fn ether_type(&self) -> EtherType {
        self.ether_type
    }

    #[inline]
    pub fn vlan_id(&self) -> Option<u16> {
        self.vlan_id
    }

    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.payload_offset..]
    }
}
