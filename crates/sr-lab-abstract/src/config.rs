use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_LOSS_RATE: f64 = 0.20;
pub const DEFAULT_ACK_LOSS_RATE: f64 = 0.15;
pub const DEFAULT_TIME_TO_WAIT: f64 = 4.0;
/// Round cap for runs that can never finish (a loss rate of 1.0) when no
/// explicit `max_rounds` is configured.
pub const STALLED_ROUND_LIMIT: u64 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Number of packets to deliver (ids `1..=packet_count`).
    pub packet_count: u32,
    /// Fixed window size. When unset the simulator draws one from the seed.
    pub window_size: Option<u32>,
    pub data_loss_rate: f64,
    pub ack_loss_rate: f64,
    /// Estimated times at or above this threshold are treated as timeouts.
    pub time_to_wait: f64,
    /// Hard cap on rounds. Unset means unbounded unless a loss rate of 1.0
    /// makes progress impossible, see [`SimConfig::round_limit`].
    pub max_rounds: Option<u64>,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            packet_count: 10,
            window_size: None,
            data_loss_rate: DEFAULT_DATA_LOSS_RATE,
            ack_loss_rate: DEFAULT_ACK_LOSS_RATE,
            time_to_wait: DEFAULT_TIME_TO_WAIT,
            max_rounds: None,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// A configuration with both loss rates forced to zero.
    pub fn lossless(packet_count: u32) -> Self {
        Self {
            packet_count,
            data_loss_rate: 0.0,
            ack_loss_rate: 0.0,
            ..Default::default()
        }
    }

    /// The round cap actually enforced for this configuration.
    pub fn round_limit(&self) -> Option<u64> {
        let stalled = self.data_loss_rate >= 1.0 || self.ack_loss_rate >= 1.0;
        self.max_rounds.or(stalled.then_some(STALLED_ROUND_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: SimConfig = toml::from_str("packet_count = 7\nseed = 3").unwrap();
        assert_eq!(config.packet_count, 7);
        assert_eq!(config.seed, 3);
        assert_eq!(config.window_size, None);
        assert_eq!(config.data_loss_rate, DEFAULT_DATA_LOSS_RATE);
        assert_eq!(config.ack_loss_rate, DEFAULT_ACK_LOSS_RATE);
        assert_eq!(config.time_to_wait, DEFAULT_TIME_TO_WAIT);
    }

    #[test]
    fn lossless_keeps_other_defaults() {
        let config = SimConfig::lossless(4);
        assert_eq!(config.packet_count, 4);
        assert_eq!(config.data_loss_rate, 0.0);
        assert_eq!(config.ack_loss_rate, 0.0);
        assert_eq!(config.max_rounds, None);
        assert_eq!(config.round_limit(), None);
    }

    #[test]
    fn round_limit_only_applies_to_stalled_or_capped_runs() {
        assert_eq!(SimConfig::default().round_limit(), None);

        let dead_link = SimConfig {
            data_loss_rate: 1.0,
            ..Default::default()
        };
        assert_eq!(dead_link.round_limit(), Some(STALLED_ROUND_LIMIT));

        let capped = SimConfig {
            ack_loss_rate: 1.0,
            max_rounds: Some(40),
            ..Default::default()
        };
        assert_eq!(capped.round_limit(), Some(40));
    }
}
