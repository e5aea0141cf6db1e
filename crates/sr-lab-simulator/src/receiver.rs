use crate::error::SimError;
use sr_lab_abstract::Packet;
use std::collections::HashSet;

/// Packets the receiver accepted, in acknowledgment order.
#[derive(Debug, Clone, Default)]
pub struct ReceiverBuffer {
    received: Vec<u32>,
    delivered: HashSet<u32>,
}

impl ReceiverBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `packet`. Seeing the same id twice means the sender's
    /// bookkeeping is broken.
    pub fn receive(&mut self, packet: &Packet) -> Result<(), SimError> {
        if !self.delivered.insert(packet.id) {
            return Err(SimError::DuplicateDelivery(packet.id));
        }
        self.received.push(packet.id);
        Ok(())
    }

    pub fn contains(&self, id: u32) -> bool {
        self.delivered.contains(&id)
    }

    pub fn snapshot(&self) -> &[u32] {
        &self.received
    }

    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }
}
