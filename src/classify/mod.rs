//! Heuristic device-role inference.
//!
//! Rules run in a fixed order and the first hit wins:
//! 1. OUI entries that carry a type of their own
//! 2. vendor-name keywords
//! 3. address heuristics (`.1`/`.254` gateways, configured host ranges)
//! 4. hostname keywords
//! 5. open ports
//!
//! Everything here is a pure function of its inputs.

mod oui;

use crate::config::ClassifierConfig;
use crate::model::DeviceType;
use crate::protocol::MacAddr;
use std::net::IpAddr;

static HOSTNAME_KEYWORDS: &[(&str, DeviceType)] = &[
    ("router", DeviceType::Router),
    ("gateway", DeviceType::Router),
    ("firewall", DeviceType::Firewall),
    ("switch", DeviceType::Switch),
    ("-ap", DeviceType::AccessPoint),
    ("printer", DeviceType::Printer),
    ("nas", DeviceType::NetworkStorage),
    ("camera", DeviceType::Camera),
    ("cam-", DeviceType::Camera),
    ("iphone", DeviceType::MobilePhone),
    ("android", DeviceType::MobilePhone),
    ("pixel", DeviceType::MobilePhone),
    ("ipad", DeviceType::Tablet),
    ("tablet", DeviceType::Tablet),
    ("tv", DeviceType::SmartTV),
    ("roku", DeviceType::SmartTV),
    ("xbox", DeviceType::GameConsole),
    ("playstation", DeviceType::GameConsole),
    ("server", DeviceType::Server),
    ("srv", DeviceType::Server),
    ("macbook", DeviceType::Computer),
    ("desktop", DeviceType::Computer),
    ("laptop", DeviceType::Computer),
];

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    server_hosts: Option<[u8; 2]>,
    printer_hosts: Option<[u8; 2]>,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Classifier {
            server_hosts: config.server_hosts,
            printer_hosts: config.printer_hosts,
        }
    }

    /// OUI vendor name for `mac`, if the prefix is in the table.
    pub fn vendor(&self, mac: &MacAddr) -> Option<&'static str> {
        oui::lookup(mac.oui()).map(|(vendor, _)| vendor)
    }

    pub fn classify(
        &self,
        mac: &MacAddr,
        ip: &IpAddr,
        hostname: Option<&str>,
        open_ports: Option<&[u16]>,
    ) -> DeviceType {
        let vendor = oui::lookup(mac.oui());

        if let Some((_, Some(kind))) = vendor {
            return kind;
        }
        if let Some((name, None)) = vendor {
            if let Some(kind) = by_vendor_keyword(name) {
                return kind;
            }
        }
        if let Some(kind) = self.by_address(ip) {
            return kind;
        }
        if let Some(kind) = hostname.and_then(|h| by_hostname(h, ip)) {
            return kind;
        }
        if let Some(kind) = open_ports.and_then(by_ports) {
            return kind;
        }
        DeviceType::Unknown
    }

    fn by_address(&self, ip: &IpAddr) -> Option<DeviceType> {
        let IpAddr::V4(v4) = ip else {
            return None;
        };
        let host = v4.octets()[3];
        if host == 1 || host == 254 {
            return Some(DeviceType::Router);
        }
        if !v4.is_private() {
            return None;
        }
        let in_range = |range: Option<[u8; 2]>| range.is_some_and(|[lo, hi]| (lo..=hi).contains(&host));
        if in_range(self.server_hosts) {
            return Some(DeviceType::Server);
        }
        if in_range(self.printer_hosts) {
            return Some(DeviceType::Printer);
        }
        None
    }
}

fn by_vendor_keyword(vendor: &str) -> Option<DeviceType> {
    let vendor = vendor.to_ascii_lowercase();
    oui::VENDOR_KEYWORDS
        .iter()
        .find(|(keyword, _)| vendor.contains(keyword))
        .map(|(_, kind)| *kind)
}

fn by_hostname(hostname: &str, ip: &IpAddr) -> Option<DeviceType> {
    // The placeholder hostname is the address itself and carries no signal.
    if hostname.is_empty() || hostname == ip.to_string() {
        return None;
    }
    let hostname = hostname.to_ascii_lowercase();
    HOSTNAME_KEYWORDS
        .iter()
        .find(|(keyword, _)| hostname.contains(keyword))
        .map(|(_, kind)| *kind)
}

fn by_ports(ports: &[u16]) -> Option<DeviceType> {
    let has = |port: u16| ports.contains(&port);
    if has(9100) || has(631) || has(515) {
        return Some(DeviceType::Printer);
    }
    // 8080 beside 80/443 is left to the server rule
    if has(554) || (has(8080) && !has(80) && !has(443)) {
        return Some(DeviceType::Camera);
    }
    if has(5000) || has(5001) || has(2049) {
        return Some(DeviceType::NetworkStorage);
    }
    if has(445) || has(139) || has(3389) {
        return Some(DeviceType::Computer);
    }
    if has(22) || has(80) || has(443) || has(3306) || has(5432) {
        return Some(DeviceType::Server);
    }
    None
}
