use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use swarm_sim::{Simulation, SimulationConfig};
use tracing_subscriber::EnvFilter;

/// Simulates a swarm of peers sharing one file through a tracker and a seeder.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file with the simulation settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    peers: Option<usize>,
    #[arg(long)]
    cycles: Option<usize>,
    /// in bytes
    #[arg(long)]
    file_size: Option<u64>,
    /// in bytes
    #[arg(long)]
    piece_size: Option<u32>,
    /// pause between two cycles
    #[arg(long)]
    delay_ms: Option<u64>,
    /// chance that a single piece transfer succeeds
    #[arg(long)]
    success_rate: Option<f64>,
    /// print the final report as JSON
    #[arg(long)]
    json: bool,
    /// used when RUST_LOG isn't set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        if let Some(peers) = self.peers {
            config.peers = peers;
        }
        if let Some(cycles) = self.cycles {
            config.cycles = cycles;
        }
        if let Some(file_size) = self.file_size {
            config.file_size = file_size;
        }
        if let Some(piece_size) = self.piece_size {
            config.piece_size = piece_size;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.cycle_delay_ms = delay_ms;
        }
        if let Some(success_rate) = self.success_rate {
            config.success_rate = success_rate;
        }
        config.validate().context("validating config")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let simulation = Simulation::new(args.config()?).context("setting up the simulation")?;
    let report = simulation.run().await.context("running the simulation")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing the report")?
        );
    } else {
        println!("{report}");
    }
    Ok(())
}
