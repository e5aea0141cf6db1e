use anyhow::{Context, anyhow};
use sr_lab_abstract::{SimConfig, SimConfigOverride, TestAction, TestAssertion, TestScenario};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::Simulator;
use crate::ledger::PacketLedger;
use crate::trace::SimulationReport;

pub fn load_scenario(path: impl AsRef<Path>) -> anyhow::Result<TestScenario> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse scenario file")
}

/// Load the scenario at `path`, stack `overrides` on top of its `[config]`
/// table and run it.
pub fn run_scenario(
    path: impl AsRef<Path>,
    overrides: &SimConfigOverride,
) -> anyhow::Result<SimulationReport> {
    let mut scenario = load_scenario(path)?;
    if scenario.packet_times.is_some() && overrides.packet_count.is_some() {
        warn!(
            "Scenario '{}' fixes its packet times, ignoring the packet count override",
            scenario.name
        );
    }
    scenario.config.layer(overrides);
    run_loaded(&scenario)
}

/// Build a simulator for `scenario` with its deterministic faults registered.
pub fn build_simulator(scenario: &TestScenario) -> anyhow::Result<Simulator> {
    let mut config = SimConfig::default();
    scenario.config.apply_to(&mut config);

    let mut sim = match &scenario.packet_times {
        Some(times) => Simulator::with_ledger(config, PacketLedger::from_times(times))?,
        None => Simulator::new(config)?,
    };

    for action in &scenario.actions {
        match action {
            TestAction::DropNextData { id } => sim.add_drop_data_once(*id),
            TestAction::DropNextAck { id } => sim.add_drop_ack_once(*id),
        }
    }
    Ok(sim)
}

pub fn run_loaded(scenario: &TestScenario) -> anyhow::Result<SimulationReport> {
    info!("Running Scenario: {}", scenario.name);
    info!("Description: {}", scenario.description);

    let mut sim = build_simulator(scenario)?;
    sim.run_until_complete()
        .with_context(|| format!("Scenario '{}' did not complete", scenario.name))?;

    let report = sim.export_report();
    check_assertions(&report, &scenario.assertions)?;
    info!("Scenario '{}' passed", scenario.name);
    Ok(report)
}

pub fn check_assertions(
    report: &SimulationReport,
    assertions: &[TestAssertion],
) -> anyhow::Result<()> {
    for assertion in assertions {
        match assertion {
            TestAssertion::AllDelivered => {
                let mut delivered = report.receiver_order.clone();
                delivered.sort_unstable();
                if delivered != report.sender_order {
                    return Err(anyhow!(
                        "Assertion Failed: receiver holds {:?}, expected every id of {:?}",
                        report.receiver_order,
                        report.sender_order
                    ));
                }
            }
            TestAssertion::ReceiverOrder { ids } => {
                if &report.receiver_order != ids {
                    return Err(anyhow!(
                        "Assertion Failed: receiver order {:?}, expected {:?}",
                        report.receiver_order,
                        ids
                    ));
                }
            }
            TestAssertion::MaxRounds { rounds } => {
                if report.rounds > *rounds {
                    return Err(anyhow!(
                        "Assertion Failed: took {} rounds, expected at most {}",
                        report.rounds,
                        rounds
                    ));
                }
            }
            TestAssertion::TimeoutCount { min, max } => {
                check_count("timeouts", report.stats.timeouts, *min, *max)?
            }
            TestAssertion::DataLossCount { min, max } => {
                check_count("data losses", report.stats.data_losses, *min, *max)?
            }
            TestAssertion::AckLossCount { min, max } => {
                check_count("ACK losses", report.stats.ack_losses, *min, *max)?
            }
        }
    }
    Ok(())
}

fn check_count(what: &str, actual: u32, min: u32, max: Option<u32>) -> anyhow::Result<()> {
    if actual < min {
        return Err(anyhow!(
            "Assertion Failed: {} {}, expected min {}",
            actual,
            what,
            min
        ));
    }
    if let Some(max) = max
        && actual > max
    {
        return Err(anyhow!(
            "Assertion Failed: {} {}, expected max {}",
            actual,
            what,
            max
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> TestScenario {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn bundled_scenarios_pass() {
        for src in [
            include_str!("../../../scenarios/lossless.toml"),
            include_str!("../../../scenarios/data_loss.toml"),
            include_str!("../../../scenarios/ack_loss.toml"),
            include_str!("../../../scenarios/lossy_channel.toml"),
        ] {
            let scenario = parse(src);
            run_loaded(&scenario).unwrap_or_else(|e| panic!("{}: {e:#}", scenario.name));
        }
    }

    #[test]
    fn overrides_win_over_scenario_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../scenarios/lossy_channel.toml");
        let base = run_scenario(path, &SimConfigOverride::default()).unwrap();

        let overrides = SimConfigOverride {
            packet_count: Some(8),
            seed: Some(99),
            data_loss_rate: Some(0.0),
            ..Default::default()
        };
        let report = run_scenario(path, &overrides).unwrap();

        assert_eq!(report.config.packet_count, 8);
        assert_eq!(report.config.seed, 99);
        assert_eq!(report.config.data_loss_rate, 0.0);
        assert_eq!(report.stats.data_losses, 0);
        assert_eq!(report.config.ack_loss_rate, base.config.ack_loss_rate);
        assert_eq!(report.config.time_to_wait, base.config.time_to_wait);
    }

    #[test]
    fn wrong_order_fails() {
        let scenario = parse(
            r#"
            name = "wrong order"
            description = "asserts id order although estimates reverse it"
            packet_times = [2.0, 1.0]

            [config]
            window_size = 2
            data_loss_rate = 0.0
            ack_loss_rate = 0.0

            [[assertions]]
            type = "receiver_order"
            ids = [1, 2]
            "#,
        );
        let err = run_loaded(&scenario).unwrap_err();
        assert!(err.to_string().contains("receiver order [2, 1]"));
    }

    #[test]
    fn count_bounds() {
        assert!(check_count("timeouts", 2, 1, Some(3)).is_ok());
        assert!(check_count("timeouts", 0, 1, None).is_err());
        assert!(check_count("timeouts", 4, 0, Some(3)).is_err());
    }

    #[test]
    fn invalid_config_surfaces_as_error() {
        let scenario = parse(
            r#"
            name = "empty"
            description = "no packets"

            [config]
            packet_count = 0
            "#,
        );
        assert!(build_simulator(&scenario).is_err());
    }
}
