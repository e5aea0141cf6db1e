use serde::Serialize;
use sr_lab_abstract::{Packet, SimConfig};

use crate::engine::Round;
use crate::event::RoundEvent;

/// Running totals of channel and timer events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub transmissions: u32,
    pub data_losses: u32,
    pub ack_losses: u32,
    pub acks: u32,
    pub timeouts: u32,
}

impl SimStats {
    pub fn record(&mut self, event: &RoundEvent) {
        match event {
            RoundEvent::Transmitted { .. } => self.transmissions += 1,
            RoundEvent::DataLost { .. } => self.data_losses += 1,
            RoundEvent::AckLost { .. } => self.ack_losses += 1,
            RoundEvent::Acked { .. } => self.acks += 1,
            RoundEvent::Timeout { .. } => self.timeouts += 1,
            RoundEvent::Rescheduled { .. } | RoundEvent::WindowAdvanced { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub window_size: u32,
    pub rounds: u64,
    pub completed: bool,
    /// Ids in the order the receiver accepted them.
    pub receiver_order: Vec<u32>,
    /// Ids in the order the sender queued them.
    pub sender_order: Vec<u32>,
    /// Final estimated times.
    pub packets: Vec<Packet>,
    pub stats: SimStats,
    pub history: Vec<Round>,
}
