//! Small built-in OUI table. Coverage is intentionally partial; unknown
//! prefixes simply fall through to the other heuristics.

use crate::model::DeviceType;

/// `(prefix, vendor, type implied by the prefix alone)`
pub(crate) static OUI_TABLE: &[([u8; 3], &str, Option<DeviceType>)] = &[
    ([0x00, 0x00, 0x0c], "Cisco Systems", Some(DeviceType::Router)),
    ([0x00, 0x1b, 0x63], "Apple", None),
    ([0x3c, 0x22, 0xfb], "Apple", None),
    ([0xf0, 0x18, 0x98], "Apple", None),
    ([0x00, 0x0c, 0x29], "VMware", Some(DeviceType::Server)),
    ([0x00, 0x50, 0x56], "VMware", Some(DeviceType::Server)),
    ([0x08, 0x00, 0x27], "Oracle VirtualBox", Some(DeviceType::Computer)),
    ([0x52, 0x54, 0x00], "QEMU", Some(DeviceType::Server)),
    ([0x00, 0x11, 0x32], "Synology", Some(DeviceType::NetworkStorage)),
    ([0x24, 0x5e, 0xbe], "QNAP", Some(DeviceType::NetworkStorage)),
    ([0x00, 0x1e, 0x0b], "Hewlett Packard", None),
    ([0x3c, 0xd9, 0x2b], "Hewlett Packard", None),
    ([0x00, 0x00, 0x48], "Epson", Some(DeviceType::Printer)),
    ([0x00, 0x80, 0x77], "Brother", Some(DeviceType::Printer)),
    ([0x00, 0x00, 0x85], "Canon", Some(DeviceType::Printer)),
    ([0x44, 0x19, 0xb6], "Hikvision", Some(DeviceType::Camera)),
    ([0x00, 0x40, 0x8c], "Axis Communications", Some(DeviceType::Camera)),
    ([0x00, 0x18, 0x0a], "Cisco Meraki", Some(DeviceType::AccessPoint)),
    ([0x04, 0x18, 0xd6], "Ubiquiti", Some(DeviceType::AccessPoint)),
    ([0x24, 0xa4, 0x3c], "Ubiquiti", Some(DeviceType::AccessPoint)),
    ([0x00, 0x09, 0x0f], "Fortinet", Some(DeviceType::Firewall)),
    ([0x00, 0x1b, 0x17], "Palo Alto Networks", Some(DeviceType::Firewall)),
    ([0x00, 0x14, 0x6c], "Netgear", None),
    ([0x50, 0xc7, 0xbf], "TP-Link", None),
    ([0x00, 0x1d, 0xd8], "Microsoft", None),
    ([0x7c, 0xed, 0x8d], "Microsoft Xbox", Some(DeviceType::GameConsole)),
    ([0x00, 0x04, 0x1f], "Sony PlayStation", Some(DeviceType::GameConsole)),
    ([0x98, 0xb6, 0xe9], "Nintendo", Some(DeviceType::GameConsole)),
    ([0x8c, 0x77, 0x12], "Samsung", None),
    ([0x00, 0x09, 0xdf], "Vestel", Some(DeviceType::SmartTV)),
    ([0xa4, 0x77, 0x33], "Google", None),
    ([0x18, 0xb4, 0x30], "Nest Labs", Some(DeviceType::IoTDevice)),
    ([0x44, 0x65, 0x0d], "Amazon", None),
    ([0xb8, 0x27, 0xeb], "Raspberry Pi", Some(DeviceType::IoTDevice)),
    ([0xdc, 0xa6, 0x32], "Raspberry Pi", Some(DeviceType::IoTDevice)),
    ([0x24, 0x0a, 0xc4], "Espressif", Some(DeviceType::IoTDevice)),
    ([0x00, 0x17, 0x88], "Philips Hue", Some(DeviceType::IoTDevice)),
    ([0x00, 0x1a, 0x11], "Google", None),
    ([0x00, 0x26, 0xbb], "Apple", None),
    ([0x00, 0x1c, 0xb3], "Apple", None),
    ([0x3c, 0x5a, 0xb4], "Google", None),
    ([0x00, 0x15, 0x5d], "Microsoft Hyper-V", Some(DeviceType::Server)),
    ([0x00, 0x1c, 0x42], "Parallels", Some(DeviceType::Computer)),
    ([0x00, 0x90, 0x0b], "Lanner", Some(DeviceType::Firewall)),
    ([0x00, 0x1f, 0x9f], "Thomson", Some(DeviceType::Router)),
];

/// Vendor-name keywords, checked in order against the lowercased vendor.
pub(crate) static VENDOR_KEYWORDS: &[(&str, DeviceType)] = &[
    ("cisco", DeviceType::Router),
    ("juniper", DeviceType::Router),
    ("mikrotik", DeviceType::Router),
    ("netgear", DeviceType::Router),
    ("tp-link", DeviceType::Router),
    ("aruba", DeviceType::AccessPoint),
    ("ubiquiti", DeviceType::AccessPoint),
    ("fortinet", DeviceType::Firewall),
    ("palo alto", DeviceType::Firewall),
    ("hewlett packard", DeviceType::Printer),
    ("epson", DeviceType::Printer),
    ("brother", DeviceType::Printer),
    ("canon", DeviceType::Printer),
    ("synology", DeviceType::NetworkStorage),
    ("qnap", DeviceType::NetworkStorage),
    ("hikvision", DeviceType::Camera),
    ("axis", DeviceType::Camera),
    ("xbox", DeviceType::GameConsole),
    ("playstation", DeviceType::GameConsole),
    ("nintendo", DeviceType::GameConsole),
    ("samsung", DeviceType::MobilePhone),
    ("apple", DeviceType::Computer),
    ("microsoft", DeviceType::Computer),
    ("vmware", DeviceType::Server),
    ("raspberry", DeviceType::IoTDevice),
    ("espressif", DeviceType::IoTDevice),
    ("nest", DeviceType::IoTDevice),
    ("amazon", DeviceType::IoTDevice),
    ("google", DeviceType::IoTDevice),
];

pub(crate) fn lookup(prefix: [u8; 3]) -> Option<(&'static str, Option<DeviceType>)> {
    OUI_TABLE
        .iter()
        .find(|(p, _, _)| *p == prefix)
        .map(|(_, vendor, kind)| (*vendor, *kind))
}
