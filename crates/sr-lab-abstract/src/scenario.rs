use crate::config::SimConfig;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    /// Fixed estimated times for packets `1..=len`. Overrides `packet_count`.
    #[serde(default)]
    pub packet_times: Option<Vec<f64>>,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub packet_count: Option<u32>,
    pub window_size: Option<u32>,
    pub data_loss_rate: Option<f64>,
    pub ack_loss_rate: Option<f64>,
    pub time_to_wait: Option<f64>,
    pub max_rounds: Option<u64>,
    pub seed: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = self.packet_count {
            config.packet_count = v;
        }
        if let Some(v) = self.window_size {
            config.window_size = Some(v);
        }
        if let Some(v) = self.data_loss_rate {
            config.data_loss_rate = v;
        }
        if let Some(v) = self.ack_loss_rate {
            config.ack_loss_rate = v;
        }
        if let Some(v) = self.time_to_wait {
            config.time_to_wait = v;
        }
        if let Some(v) = self.max_rounds {
            config.max_rounds = Some(v);
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }

    /// Stack `top` over `self`; fields set in `top` win.
    pub fn layer(&mut self, top: &SimConfigOverride) {
        self.packet_count = top.packet_count.or(self.packet_count);
        self.window_size = top.window_size.or(self.window_size);
        self.data_loss_rate = top.data_loss_rate.or(self.data_loss_rate);
        self.ack_loss_rate = top.ack_loss_rate.or(self.ack_loss_rate);
        self.time_to_wait = top.time_to_wait.or(self.time_to_wait);
        self.max_rounds = top.max_rounds.or(self.max_rounds);
        self.seed = top.seed.or(self.seed);
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Deterministically drop the next data transmission of packet `id`
    DropNextData { id: u32 },
    /// Deterministically drop the next ACK for packet `id`
    DropNextAck { id: u32 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// Every packet reached the receiver
    AllDelivered,
    /// Receiver buffer matches this exact arrival order
    ReceiverOrder { ids: Vec<u32> },
    /// Simulation finished within this many rounds
    MaxRounds { rounds: u64 },
    /// Number of timeouts is within range
    TimeoutCount { min: u32, max: Option<u32> },
    /// Number of data packets lost in the channel is within range
    DataLossCount { min: u32, max: Option<u32> },
    /// Number of ACKs lost in the channel is within range
    AckLossCount { min: u32, max: Option<u32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_actions_and_assertions() {
        let scenario: TestScenario = toml::from_str(
            r#"
            name = "ack loss"
            description = "first ACK of packet 2 is lost"
            packet_times = [1.0, 2.0]

            [config]
            window_size = 2
            data_loss_rate = 0.0
            ack_loss_rate = 0.0

            [[actions]]
            type = "drop_next_ack"
            id = 2

            [[assertions]]
            type = "receiver_order"
            ids = [1, 2]

            [[assertions]]
            type = "ack_loss_count"
            min = 1
            max = 1
            "#,
        )
        .unwrap();

        assert_eq!(scenario.packet_times, Some(vec![1.0, 2.0]));
        assert!(matches!(scenario.actions[0], TestAction::DropNextAck { id: 2 }));
        assert!(matches!(
            scenario.assertions[1],
            TestAssertion::AckLossCount { min: 1, max: Some(1) }
        ));
    }

    #[test]
    fn override_only_touches_given_fields() {
        let mut config = SimConfig::default();
        let patch = SimConfigOverride {
            window_size: Some(3),
            seed: Some(9),
            ..Default::default()
        };
        patch.apply_to(&mut config);

        assert_eq!(config.window_size, Some(3));
        assert_eq!(config.seed, 9);
        assert_eq!(config.packet_count, SimConfig::default().packet_count);
        assert_eq!(config.data_loss_rate, SimConfig::default().data_loss_rate);
    }

    #[test]
    fn layer_keeps_base_fields_the_top_leaves_unset() {
        let mut base = SimConfigOverride {
            packet_count: Some(4),
            seed: Some(1),
            data_loss_rate: Some(0.0),
            ..Default::default()
        };
        base.layer(&SimConfigOverride {
            seed: Some(77),
            max_rounds: Some(50),
            ..Default::default()
        });

        assert_eq!(base.packet_count, Some(4));
        assert_eq!(base.data_loss_rate, Some(0.0));
        assert_eq!(base.seed, Some(77));
        assert_eq!(base.max_rounds, Some(50));
        assert_eq!(base.window_size, None);
    }

    #[test]
    fn example_config_file_parses_as_override() {
        let patch: SimConfigOverride =
            toml::from_str(include_str!("../../../sr-lab.example.toml")).unwrap();
        assert_eq!(patch.packet_count, Some(12));
        assert_eq!(patch.window_size, None);
        assert_eq!(patch.seed, Some(42));
    }
}
