//! In-memory frame source for tests, benches and deterministic replays.

use super::{CaptureError, Frame, FramePoll, PacketSource};
use crate::decode::LinkType;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct ReplaySource {
    frames: Vec<(f64, Vec<u8>)>,
    pos: usize,
    keep_open: bool,
    closed: Arc<AtomicBool>,
}

impl ReplaySource {
    pub fn new(frames: Vec<(f64, Vec<u8>)>) -> Self {
        ReplaySource {
            frames,
            pos: 0,
            keep_open: false,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report `Idle` instead of `Exhausted` once the frames run out, like a
    /// quiet live interface.
    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }

    /// Set once the source has been dropped.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl PacketSource for ReplaySource {
    fn next_frame(&mut self) -> Result<FramePoll<'_>, CaptureError> {
        let Some((ts, data)) = self.frames.get(self.pos) else {
            if self.keep_open {
                std::thread::sleep(Duration::from_millis(5));
                return Ok(FramePoll::Idle);
            }
            return Ok(FramePoll::Exhausted);
        };
        self.pos += 1;
        Ok(FramePoll::Frame(Frame {
            timestamp: *ts,
            link: LinkType::Ethernet,
            data,
            wire_len: data.len() as u32,
        }))
    }

    fn describe(&self) -> String {
        format!("replay ({} frames)", self.frames.len())
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
