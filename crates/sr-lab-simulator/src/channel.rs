//! Lossy channel between sender and receiver.
//!
//! Data and ACK loss are independent Bernoulli draws against the configured
//! rates. Deterministic one-shot drops can be registered per packet id; a
//! forced drop is consumed on use and does not touch the random source.

use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Channel {
    data_loss_rate: f64,
    ack_loss_rate: f64,
    // Deterministic fault injection: drop the next data transmission of these ids
    forced_data_drops: Vec<u32>,
    // Deterministic fault injection: drop the next ACK of these ids
    forced_ack_drops: Vec<u32>,
}

impl Channel {
    pub fn new(data_loss_rate: f64, ack_loss_rate: f64) -> Self {
        Self {
            data_loss_rate,
            ack_loss_rate,
            forced_data_drops: Vec::new(),
            forced_ack_drops: Vec::new(),
        }
    }

    /// A channel that never loses anything on its own.
    pub fn lossless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Register a deterministic fault: drop the next data transmission of `id`.
    pub fn force_data_drop(&mut self, id: u32) {
        self.forced_data_drops.push(id);
    }

    /// Register a deterministic fault: drop the next ACK for `id`.
    pub fn force_ack_drop(&mut self, id: u32) {
        self.forced_ack_drops.push(id);
    }

    pub fn should_drop_data<R: Rng>(&mut self, id: u32, rng: &mut R) -> bool {
        if take_once(&mut self.forced_data_drops, id) {
            debug!("Deterministically dropping data packet {}", id);
            return true;
        }
        rng.random::<f64>() < self.data_loss_rate
    }

    pub fn should_drop_ack<R: Rng>(&mut self, id: u32, rng: &mut R) -> bool {
        if take_once(&mut self.forced_ack_drops, id) {
            debug!("Deterministically dropping ACK for packet {}", id);
            return true;
        }
        rng.random::<f64>() < self.ack_loss_rate
    }
}

fn take_once(pending: &mut Vec<u32>, id: u32) -> bool {
    match pending.iter().position(|&p| p == id) {
        Some(pos) => {
            pending.remove(pos);
            true
        }
        None => false,
    }
}
