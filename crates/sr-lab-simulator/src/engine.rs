use crate::channel::Channel;
use crate::error::SimError;
use crate::event::RoundEvent;
use crate::ledger::{PacketLedger, RETIME_RANGE};
use crate::receiver::ReceiverBuffer;
use crate::trace::{SimStats, SimulationReport};
use crate::window::SenderWindow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sr_lab_abstract::SimConfig;
use tracing::{debug, info, warn};

pub const MIN_WINDOW_SIZE: u32 = 2;
pub const MAX_WINDOW_SIZE: u32 = 5;

/// Outcome of a single simulation round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub number: u64,
    pub window_start: u32,
    pub window_end: u32,
    pub events: Vec<RoundEvent>,
}

/// Pick a window size in `[2, min(5, n / 2)]`.
///
/// With fewer than four packets that range is empty; the window is clamped to
/// a single packet instead.
pub fn derive_window_size<R: Rng>(packet_count: u32, rng: &mut R) -> Result<u32, SimError> {
    if packet_count == 0 {
        return Err(SimError::InvalidConfiguration(
            "packet count must be at least 1".to_string(),
        ));
    }
    let upper = (packet_count / 2).min(MAX_WINDOW_SIZE);
    if upper < MIN_WINDOW_SIZE {
        warn!(
            "{} packets are too few for a window of at least {}, using 1",
            packet_count, MIN_WINDOW_SIZE
        );
        return Ok(1);
    }
    Ok(rng.random_range(MIN_WINDOW_SIZE..=upper))
}

fn validate(config: &SimConfig) -> Result<(), SimError> {
    let invalid =
        |msg: String| -> Result<(), SimError> { Err(SimError::InvalidConfiguration(msg)) };

    if config.packet_count == 0 {
        return invalid("packet count must be at least 1".to_string());
    }
    for (name, rate) in [
        ("data_loss_rate", config.data_loss_rate),
        ("ack_loss_rate", config.ack_loss_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return invalid(format!("{name} must be within [0, 1], got {rate}"));
        }
    }
    // A threshold at or below the smallest retimed estimate times out forever.
    let min_estimate = *RETIME_RANGE.start();
    if !config.time_to_wait.is_finite() || config.time_to_wait <= min_estimate {
        return invalid(format!(
            "time_to_wait must be greater than {min_estimate}, got {}",
            config.time_to_wait
        ));
    }
    if let Some(size) = config.window_size
        && (size == 0 || size > config.packet_count)
    {
        return invalid(format!(
            "window size must be within 1..={}, got {}",
            config.packet_count, size
        ));
    }
    if config.max_rounds == Some(0) {
        return invalid("max_rounds must be at least 1".to_string());
    }
    Ok(())
}

/// Owns every piece of simulation state and the shared random source.
pub struct Simulator {
    config: SimConfig,
    rng: StdRng,

    ledger: PacketLedger,
    channel: Channel,
    window: SenderWindow,
    receiver: ReceiverBuffer,

    rounds: u64,
    stats: SimStats,
    history: Vec<Round>,
}

impl Simulator {
    /// Validate `config`, derive the window size and generate the packets.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::build(config, None)
    }

    /// Like [`Simulator::new`] but with fixed packets. The packet count is
    /// taken from the ledger.
    pub fn with_ledger(mut config: SimConfig, ledger: PacketLedger) -> Result<Self, SimError> {
        config.packet_count = ledger.len();
        if let Some(packet) = ledger.iter().find(|p| !p.estimated_time.is_finite()) {
            return Err(SimError::InvalidConfiguration(format!(
                "packet {} has a non-finite estimated time",
                packet.id
            )));
        }
        Self::build(config, Some(ledger))
    }

    fn build(config: SimConfig, ledger: Option<PacketLedger>) -> Result<Self, SimError> {
        validate(&config)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let window_size = match config.window_size {
            Some(size) => size,
            None => derive_window_size(config.packet_count, &mut rng)?,
        };
        let ledger = match ledger {
            Some(ledger) => ledger,
            None => PacketLedger::generate(config.packet_count, &mut rng),
        };

        info!(
            "Simulating {} packets with window size {} (seed {})",
            config.packet_count, window_size, config.seed
        );
        for packet in ledger.iter() {
            debug!("packet {} time {:.2}", packet.id, packet.estimated_time);
        }

        Ok(Self {
            channel: Channel::new(config.data_loss_rate, config.ack_loss_rate),
            window: SenderWindow::new(config.packet_count, window_size, config.time_to_wait),
            receiver: ReceiverBuffer::new(),
            rounds: 0,
            stats: SimStats::default(),
            history: Vec::new(),
            config,
            rng,
            ledger,
        })
    }

    /// Register a deterministic fault: drop the next data transmission of `id`.
    pub fn add_drop_data_once(&mut self, id: u32) {
        self.channel.force_data_drop(id);
    }

    /// Register a deterministic fault: drop the next ACK for `id`.
    pub fn add_drop_ack_once(&mut self, id: u32) {
        self.channel.force_ack_drop(id);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn window_size(&self) -> u32 {
        self.window.window_size()
    }

    pub fn window(&self) -> &SenderWindow {
        &self.window
    }

    pub fn ledger(&self) -> &PacketLedger {
        &self.ledger
    }

    pub fn receiver(&self) -> &ReceiverBuffer {
        &self.receiver
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn history(&self) -> &[Round] {
        &self.history
    }

    pub fn is_complete(&self) -> bool {
        self.window.is_complete()
    }

    /// Run one round: transmit, then resolve one outcome.
    /// Returns `None` once every packet has been delivered.
    pub fn step(&mut self) -> Result<Option<Round>, SimError> {
        if self.window.is_complete() {
            return Ok(None);
        }
        if let Some(limit) = self.config.round_limit()
            && self.rounds >= limit
        {
            return Err(SimError::RoundLimitExceeded(limit));
        }
        self.rounds += 1;

        let window_start = self.window.window_start();
        let window_end = self.window.window_end();
        info!(
            "Round {}: window [{}]",
            self.rounds,
            join_ids(window_start..=window_end)
        );
        debug!("sender: {}", join_ids(self.ledger.ids()));
        debug!("receiver: {}", join_ids(self.receiver.snapshot().iter().copied()));

        let mut events = Vec::new();
        self.window
            .transmit(&self.ledger, &mut self.channel, &mut self.rng, &mut events)?;
        let resolution = self.window.resolve(
            &mut self.ledger,
            &mut self.channel,
            &mut self.receiver,
            &mut self.rng,
            &mut events,
        )?;
        debug!("Round {} resolved as {:?}", self.rounds, resolution);

        for event in &events {
            self.stats.record(event);
            info!("{}", event);
        }

        let round = Round {
            number: self.rounds,
            window_start,
            window_end,
            events,
        };
        self.history.push(round.clone());

        if self.window.is_complete() {
            info!("All packets successfully transmitted after {} rounds", self.rounds);
        }
        Ok(Some(round))
    }

    pub fn run_until_complete(&mut self) -> Result<(), SimError> {
        while self.step()?.is_some() {}
        Ok(())
    }

    /// Produce a serializable snapshot of the current simulation state.
    pub fn export_report(&self) -> SimulationReport {
        SimulationReport {
            config: self.config.clone(),
            window_size: self.window.window_size(),
            rounds: self.rounds,
            completed: self.window.is_complete(),
            receiver_order: self.receiver.snapshot().to_vec(),
            sender_order: self.ledger.ids(),
            packets: self.ledger.iter().copied().collect(),
            stats: self.stats.clone(),
            history: self.history.clone(),
        }
    }
}

fn join_ids(ids: impl IntoIterator<Item = u32>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
