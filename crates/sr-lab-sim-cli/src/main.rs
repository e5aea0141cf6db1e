use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{Level, info};

use sr_lab_abstract::{SimConfig, SimConfigOverride};
use sr_lab_simulator::{SimulationReport, Simulator, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Selective-Repeat ARQ simulator")]
struct Args {
    /// Number of packets to send. Prompted for when not given here or in --config.
    #[arg(long)]
    packets: Option<u32>,

    /// Fixed window size (default: random in [2, min(5, packets / 2)]).
    #[arg(long)]
    window_size: Option<u32>,

    /// Seed for the random source (default: random, logged for replay).
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    data_loss_rate: Option<f64>,
    #[arg(long)]
    ack_loss_rate: Option<f64>,

    /// Estimated times at or above this value time out.
    #[arg(long)]
    time_to_wait: Option<f64>,

    #[arg(long)]
    max_rounds: Option<u64>,

    /// TOML file with simulation settings; command-line flags win.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a test scenario and check its assertions. Simulation flags
    /// override the scenario's `[config]` table.
    #[arg(long, conflicts_with = "config")]
    scenario: Option<PathBuf>,

    /// Write a JSON trace of the finished simulation.
    #[arg(long)]
    trace_out: Option<PathBuf>,

    /// Delay between rounds, purely cosmetic.
    #[arg(long, default_value_t = 0, conflicts_with = "scenario")]
    pace_ms: u64,

    /// Log per-round sender/receiver buffers and resolution details.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("sr-lab starting…");

    let report = if let Some(path) = &args.scenario {
        scenario_runner::run_scenario(path, &args.overrides())?
    } else {
        let config = args.build_config()?;
        run_default_sim(config, Duration::from_millis(args.pace_ms))?
    };

    log_summary(&report);

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

impl Args {
    fn overrides(&self) -> SimConfigOverride {
        SimConfigOverride {
            packet_count: self.packets,
            window_size: self.window_size,
            data_loss_rate: self.data_loss_rate,
            ack_loss_rate: self.ack_loss_rate,
            time_to_wait: self.time_to_wait,
            max_rounds: self.max_rounds,
            seed: self.seed,
        }
    }

    /// Defaults, then the config file, then command-line flags.
    fn build_config(&self) -> Result<SimConfig> {
        let file = match &self.config {
            Some(path) => load_config(path)?,
            None => SimConfigOverride::default(),
        };
        let flags = self.overrides();

        let mut config = SimConfig::default();
        file.apply_to(&mut config);
        flags.apply_to(&mut config);

        if file.packet_count.is_none() && flags.packet_count.is_none() {
            config.packet_count = prompt_packet_count()?;
        }
        if file.seed.is_none() && flags.seed.is_none() {
            config.seed = rand::random();
        }
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn prompt_packet_count() -> Result<u32> {
    print!("Enter the number of packets: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read packet count")?;
    let input = line.trim();
    input
        .parse()
        .with_context(|| format!("'{input}' is not a valid packet count"))
}

fn run_default_sim(config: SimConfig, pace: Duration) -> Result<SimulationReport> {
    let mut sim = Simulator::new(config).context("Failed to set up simulation")?;
    info!(
        "Packets: {} | window size: {} | seed: {}",
        join_ids(&sim.ledger().ids()),
        sim.window_size(),
        sim.config().seed
    );

    while sim.step()?.is_some() {
        if !pace.is_zero() {
            thread::sleep(pace);
        }
    }
    Ok(sim.export_report())
}

fn log_summary(report: &SimulationReport) {
    info!(
        "Rounds: {} | transmissions: {} | data lost: {} | ACKs lost: {} | timeouts: {}",
        report.rounds,
        report.stats.transmissions,
        report.stats.data_losses,
        report.stats.ack_losses,
        report.stats.timeouts
    );
    info!(
        "Receiver's buffer (order of received packets): {}",
        join_ids(&report.receiver_order)
    );
    info!(
        "Sender's buffer (order of sent packets): {}",
        join_ids(&report.sender_order)
    );
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn load_config(path: &Path) -> Result<SimConfigOverride> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_is_rejected_with_a_scenario() {
        assert!(Args::try_parse_from(["sr-lab", "--scenario", "s.toml", "--pace-ms", "5"]).is_err());
        assert!(Args::try_parse_from(["sr-lab", "--scenario", "s.toml", "--config", "c.toml"]).is_err());
    }

    #[test]
    fn scenario_accepts_simulation_flags() {
        let args = Args::try_parse_from([
            "sr-lab",
            "--scenario",
            "s.toml",
            "--seed",
            "7",
            "--max-rounds",
            "500",
            "--ack-loss-rate",
            "0.3",
        ])
        .unwrap();
        let overrides = args.overrides();
        assert_eq!(overrides.seed, Some(7));
        assert_eq!(overrides.max_rounds, Some(500));
        assert_eq!(overrides.ack_loss_rate, Some(0.3));
        assert_eq!(overrides.packet_count, None);
    }

    #[test]
    fn flags_win_over_config_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../sr-lab.example.toml");
        let args =
            Args::try_parse_from(["sr-lab", "--config", path, "--seed", "3", "--packets", "5"])
                .unwrap();
        let config = args.build_config().unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.packet_count, 5);
        assert_eq!(config.data_loss_rate, 0.20);
        assert_eq!(config.max_rounds, None);
    }
}
