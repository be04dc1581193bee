//! Frame sources: a live or offline libpcap handle, or an in-memory replay.

pub mod engine;
pub mod replay;

pub use engine::{list_interfaces, PcapSource};
pub use replay::ReplaySource;

use crate::decode::LinkType;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no capture device: {0}")]
    NoDevice(String),
    #[error("pcap error: {0}")]
    Pcap(#[from] pcap::Error),
}

/// One captured frame, borrowed from the source's buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Capture time, seconds since the epoch.
    pub timestamp: f64,
    pub link: LinkType,
    pub data: &'a [u8],
    /// Length on the wire; larger than `data.len()` when truncated by snaplen.
    pub wire_len: u32,
}

#[derive(Debug)]
pub enum FramePoll<'a> {
    Frame(Frame<'a>),
    /// Nothing arrived before the read timeout.
    Idle,
    /// The source will produce no more frames.
    Exhausted,
}

/// A producer of link-layer frames. Dropping the source releases the
/// underlying handle.
pub trait PacketSource: Send {
    fn next_frame(&mut self) -> Result<FramePoll<'_>, CaptureError>;

    fn describe(&self) -> String;
}
