//! The sender's packet store.
//!
//! Packet ids double as indices (`id - 1`), so lookups never search.

use crate::error::SimError;
use rand::Rng;
use sr_lab_abstract::Packet;
use std::ops::RangeInclusive;

/// Range for the first transit estimate of every packet.
pub const INITIAL_TIME_RANGE: RangeInclusive<f64> = 0.1..=5.0;
/// Range used when a packet is rescheduled. Deliberately narrower than the
/// initial range.
pub const RETIME_RANGE: RangeInclusive<f64> = 0.1..=4.0;

#[derive(Debug, Clone, Default)]
pub struct PacketLedger {
    packets: Vec<Packet>,
}

impl PacketLedger {
    /// Create `n` packets with ids `1..=n` and random initial estimates.
    pub fn generate<R: Rng>(n: u32, rng: &mut R) -> Self {
        let packets = (1..=n)
            .map(|id| Packet::new(id, rng.random_range(INITIAL_TIME_RANGE)))
            .collect();
        Self { packets }
    }

    /// Build a ledger with fixed estimates; packet `i + 1` gets `times[i]`.
    pub fn from_times(times: &[f64]) -> Self {
        let packets = times
            .iter()
            .zip(1..)
            .map(|(&time, id)| Packet::new(id, time))
            .collect();
        Self { packets }
    }

    pub fn len(&self) -> u32 {
        self.packets.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn get(&self, id: u32) -> Result<&Packet, SimError> {
        let len = self.len();
        id.checked_sub(1)
            .and_then(|idx| self.packets.get(idx as usize))
            .ok_or(SimError::UnknownPacket { id, len })
    }

    /// Draw a fresh estimate for `id` and return it.
    pub fn retime<R: Rng>(&mut self, id: u32, rng: &mut R) -> Result<f64, SimError> {
        let len = self.len();
        let packet = id
            .checked_sub(1)
            .and_then(|idx| self.packets.get_mut(idx as usize))
            .ok_or(SimError::UnknownPacket { id, len })?;
        packet.estimated_time = rng.random_range(RETIME_RANGE);
        Ok(packet.estimated_time)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter()
    }

    /// Ids in original send order.
    pub fn ids(&self) -> Vec<u32> {
        self.packets.iter().map(|p| p.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generate_assigns_contiguous_ids_and_initial_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let ledger = PacketLedger::generate(50, &mut rng);

        assert_eq!(ledger.len(), 50);
        assert_eq!(ledger.ids(), (1..=50).collect::<Vec<_>>());
        assert!(
            ledger
                .iter()
                .all(|p| INITIAL_TIME_RANGE.contains(&p.estimated_time))
        );
    }

    #[test]
    fn get_is_direct_index() {
        let ledger = PacketLedger::from_times(&[1.5, 2.5, 3.5]);
        assert_eq!(ledger.get(2).unwrap().estimated_time, 2.5);
        assert_eq!(ledger.get(3).unwrap().id, 3);
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let mut ledger = PacketLedger::from_times(&[1.0, 2.0]);
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            ledger.get(0).unwrap_err(),
            SimError::UnknownPacket { id: 0, len: 2 }
        );
        assert_eq!(
            ledger.get(3).unwrap_err(),
            SimError::UnknownPacket { id: 3, len: 2 }
        );
        assert!(ledger.retime(9, &mut rng).is_err());
    }

    #[test]
    fn retime_stays_within_retransmission_range() {
        let mut ledger = PacketLedger::from_times(&[4.9]);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let time = ledger.retime(1, &mut rng).unwrap();
            assert!(RETIME_RANGE.contains(&time));
            assert_eq!(ledger.get(1).unwrap().estimated_time, time);
        }
    }
}
