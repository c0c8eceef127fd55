//! Outbound packet queue
//!
//! Intents append here; a flush takes a snapshot, writes it and then consumes
//! exactly the snapshot, so packets appended while the flush was writing
//! stay queued for the next one.

use std::collections::VecDeque;

use govee_transport::LogicalPacket;

/// How many times each packet is queued. BLE writes without response get
/// lost now and then; the firmware treats duplicates as the same command.
pub const DEFAULT_REPEAT: usize = 3;

#[derive(Debug, Default)]
pub struct CommandBuffer {
    packets: VecDeque<LogicalPacket>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `packet` `repeat` times
    pub fn append(&mut self, packet: LogicalPacket, repeat: usize) {
        self.packets.extend(std::iter::repeat(packet).take(repeat));
    }

    /// Queue `packet` [`DEFAULT_REPEAT`] times
    pub fn push(&mut self, packet: LogicalPacket) {
        self.append(packet, DEFAULT_REPEAT);
    }

    pub fn snapshot(&self) -> Vec<LogicalPacket> {
        self.packets.iter().cloned().collect()
    }

    /// Drop the first `n` packets (the part a flush wrote)
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.packets.len());
        self.packets.drain(..n);
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogicalPacket> {
        self.packets.iter()
    }
}
