//! Bounded FIFO of recently decoded packets.

use crate::model::Packet;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// When capacity is reached the oldest packet is evicted.
#[derive(Debug)]
pub struct PacketWindow {
    buf: Mutex<VecDeque<Packet>>,
    capacity: usize,
}

impl PacketWindow {
    pub fn new(capacity: usize) -> Self {
        PacketWindow {
            buf: Mutex::new(VecDeque::with_capacity(capacity.min(8192))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, packet: Packet) {
        let mut buf = self.buf.lock();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(packet);
    }

    /// Copy of the window, oldest first.
    pub fn recent(&self) -> Vec<Packet> {
        self.buf.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
