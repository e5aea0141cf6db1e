//! Selective-repeat sender window.
//!
//! Each round runs two phases. The transmit phase pushes every idle packet in
//! the window through the channel. The resolution phase orders the
//! unacknowledged packets by estimated time and settles the fate of exactly
//! one of them: an ACK or a timeout. Lost ACKs fall through to the next
//! candidate without consuming the round's decision.

use crate::channel::Channel;
use crate::error::SimError;
use crate::event::RoundEvent;
use crate::ledger::PacketLedger;
use crate::receiver::ReceiverBuffer;
use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketState {
    /// Not sent yet, or sent and then timed out.
    Idle,
    /// Sent, waiting for an ACK.
    InFlight,
    Acked,
}

/// What the resolution phase decided for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Packet was acknowledged and delivered.
    Acked(u32),
    /// Packet timed out (or was never sent) and got a new estimate.
    Rescheduled(u32),
    /// Every candidate's ACK was lost; nothing changed.
    Stalled,
    /// No unacknowledged packet was left in the window.
    WindowCleared,
}

#[derive(Debug, Clone)]
pub struct SenderWindow {
    window_size: u32,
    packet_count: u32,
    time_to_wait: f64,
    window_start: u32,
    states: Vec<PacketState>,
}

impl SenderWindow {
    pub fn new(packet_count: u32, window_size: u32, time_to_wait: f64) -> Self {
        Self {
            window_size: window_size.max(1),
            packet_count,
            time_to_wait,
            window_start: 1,
            states: vec![PacketState::Idle; packet_count as usize],
        }
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    pub fn window_start(&self) -> u32 {
        self.window_start
    }

    pub fn window_end(&self) -> u32 {
        self.window_start
            .saturating_add(self.window_size - 1)
            .min(self.packet_count)
    }

    /// Ids currently inside the window. Empty once everything is acked.
    pub fn range(&self) -> RangeInclusive<u32> {
        self.window_start..=self.window_end()
    }

    pub fn is_complete(&self) -> bool {
        self.window_start > self.packet_count
    }

    pub fn state(&self, id: u32) -> Option<PacketState> {
        id.checked_sub(1)
            .and_then(|idx| self.states.get(idx as usize))
            .copied()
    }

    fn slot(&self, id: u32) -> Result<usize, SimError> {
        match id.checked_sub(1) {
            Some(idx) if idx < self.packet_count => Ok(idx as usize),
            _ => Err(SimError::UnknownPacket {
                id,
                len: self.packet_count,
            }),
        }
    }

    /// Send every idle packet in the window, in id order.
    pub fn transmit<R: Rng>(
        &mut self,
        ledger: &PacketLedger,
        channel: &mut Channel,
        rng: &mut R,
        events: &mut Vec<RoundEvent>,
    ) -> Result<(), SimError> {
        for id in self.range() {
            let slot = self.slot(id)?;
            if self.states[slot] != PacketState::Idle {
                continue;
            }
            let packet = ledger.get(id)?;
            if channel.should_drop_data(id, rng) {
                events.push(RoundEvent::DataLost { id });
                continue;
            }
            self.states[slot] = PacketState::InFlight;
            events.push(RoundEvent::Transmitted {
                id,
                estimated_time: packet.estimated_time,
            });
        }
        Ok(())
    }

    /// Settle at most one packet's fate for this round.
    pub fn resolve<R: Rng>(
        &mut self,
        ledger: &mut PacketLedger,
        channel: &mut Channel,
        receiver: &mut ReceiverBuffer,
        rng: &mut R,
        events: &mut Vec<RoundEvent>,
    ) -> Result<Resolution, SimError> {
        let mut candidates = Vec::new();
        for id in self.range() {
            if self.states[self.slot(id)?] != PacketState::Acked {
                candidates.push((id, ledger.get(id)?.estimated_time));
            }
        }

        if candidates.is_empty() {
            let from = self.window_start;
            self.window_start = self.window_end() + 1;
            events.push(RoundEvent::WindowAdvanced {
                from,
                to: self.window_start,
            });
            return Ok(Resolution::WindowCleared);
        }

        // sort_by is stable, so equal estimates keep the lower id first
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (id, estimated_time) in candidates {
            let slot = self.slot(id)?;
            let in_flight = self.states[slot] == PacketState::InFlight;

            if in_flight && estimated_time < self.time_to_wait {
                if channel.should_drop_ack(id, rng) {
                    events.push(RoundEvent::AckLost { id });
                    continue;
                }
                self.states[slot] = PacketState::Acked;
                receiver.receive(ledger.get(id)?)?;
                events.push(RoundEvent::Acked { id });
                self.advance(events);
                return Ok(Resolution::Acked(id));
            }

            if in_flight {
                events.push(RoundEvent::Timeout { id });
            }
            let estimated_time = ledger.retime(id, rng)?;
            self.states[slot] = PacketState::Idle;
            events.push(RoundEvent::Rescheduled { id, estimated_time });
            return Ok(Resolution::Rescheduled(id));
        }

        Ok(Resolution::Stalled)
    }

    /// Slide `window_start` past the run of acked ids it currently points at.
    fn advance(&mut self, events: &mut Vec<RoundEvent>) {
        let from = self.window_start;
        while self.state(self.window_start) == Some(PacketState::Acked) {
            self.window_start += 1;
        }
        if self.window_start != from {
            events.push(RoundEvent::WindowAdvanced {
                from,
                to: self.window_start,
            });
        }
    }
}
