use serde::{Deserialize, Serialize};

/// A numbered packet queued at the sender.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Packet id, contiguous from 1.
    pub id: u32,
    /// Heuristic transit estimate used to order ACK/timeout resolution.
    /// This is not a simulated clock.
    pub estimated_time: f64,
}

impl Packet {
    pub fn new(id: u32, estimated_time: f64) -> Self {
        Self { id, estimated_time }
    }
}
