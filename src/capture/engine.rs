//! libpcap-backed frame source.

use super::{CaptureError, Frame, FramePoll, PacketSource};
use crate::config::CaptureConfig;
use crate::decode::LinkType;
use pcap::{Activated, Capture, Device};
use std::path::Path;

/// List all available network interfaces.
pub fn list_interfaces() -> Result<Vec<Device>, CaptureError> {
    Ok(Device::list()?)
}

pub struct PcapSource {
    cap: Capture<dyn Activated>,
    link: LinkType,
    name: String,
}

impl PcapSource {
    /// Open a live capture with the given configuration.
    pub fn open_live(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let device = match &config.interface {
            Some(name) => Device::list()?
                .into_iter()
                .find(|d| d.name == *name)
                .ok_or_else(|| CaptureError::NoDevice(format!("interface '{}' not found", name)))?,
            None => Device::lookup()?
                .ok_or_else(|| CaptureError::NoDevice("no default device found".into()))?,
        };
        let device_name = device.name.clone();

        let mut inactive = Capture::from_device(device)?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms);
        if let Some(size) = config.buffer_size {
            inactive = inactive.buffer_size(size);
        }
        let mut cap = inactive.open()?;

        if let Some(filter) = &config.filter {
            cap.filter(filter, true)?;
        }

        tracing::info!(
            interface = %device_name,
            promiscuous = config.promiscuous,
            snaplen = config.snaplen,
            filter = config.filter.as_deref().unwrap_or("none"),
            "capture opened"
        );

        let link = LinkType::from(cap.get_datalink().0);
        Ok(PcapSource {
            cap: cap.into(),
            link,
            name: device_name,
        })
    }

    /// Open a pcap savefile for offline replay.
    pub fn open_file(path: &Path, filter: Option<&str>) -> Result<Self, CaptureError> {
        let mut cap = Capture::from_file(path)?;
        if let Some(filter) = filter {
            cap.filter(filter, true)?;
        }
        let link = LinkType::from(cap.get_datalink().0);
        tracing::info!(file = %path.display(), ?link, "savefile opened");
        Ok(PcapSource {
            cap: cap.into(),
            link,
            name: path.display().to_string(),
        })
    }
}

impl PacketSource for PcapSource {
    fn next_frame(&mut self) -> Result<FramePoll<'_>, CaptureError> {
        match self.cap.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                Ok(FramePoll::Frame(Frame {
                    timestamp: ts.tv_sec as f64 + ts.tv_usec as f64 / 1_000_000.0,
                    link: self.link,
                    data: packet.data,
                    wire_len: packet.header.len,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(FramePoll::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(FramePoll::Exhausted),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Drop for PcapSource {
    fn drop(&mut self) {
        tracing::debug!(source = %self.name, "capture handle released");
    }
}
