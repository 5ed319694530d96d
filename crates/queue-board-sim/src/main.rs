//! Queue board simulator
//!
//! Runs a seeded multi-participant workload over an in-memory lossy network,
//! hands the writer role around, and checks that every participant converges
//! on the writer's state.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod runner;

use config::SimConfig;
use runner::Simulation;

#[derive(Parser)]
#[command(name = "queue-board-sim")]
#[command(about = "Simulate a single-writer replicated queue board", long_about = None)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of participants
    #[arg(short = 'n', long)]
    participants: Option<u32>,

    /// Workload steps, one tick each
    #[arg(short, long)]
    steps: Option<u32>,

    /// Seed for workload and network faults
    #[arg(long)]
    seed: Option<u64>,

    /// Probability that a message is lost
    #[arg(long)]
    drop_rate: Option<f64>,

    /// Hand the writer role on every N steps (0 disables)
    #[arg(long)]
    handoff_every: Option<u32>,

    /// Pace ticks in wall-clock time
    #[arg(long)]
    realtime: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn sim_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };
        if let Some(participants) = self.participants {
            config.participants = participants;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(drop_rate) = self.drop_rate {
            config.drop_rate = drop_rate;
        }
        if let Some(handoff_every) = self.handoff_every {
            config.handoff_every = handoff_every;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.sim_config()?;
    tracing::info!(
        participants = config.participants,
        steps = config.steps,
        seed = config.seed,
        drop_rate = config.drop_rate,
        handoff_every = config.handoff_every,
        "Starting simulation"
    );

    let tick = Duration::from_millis(config.tick_ms);
    let mut simulation = Simulation::new(config)?;
    if cli.realtime {
        let mut interval = tokio::time::interval(tick);
        while !simulation.is_done() {
            interval.tick().await;
            simulation.step()?;
        }
    } else {
        while !simulation.is_done() {
            simulation.step()?;
        }
    }

    let report = simulation.finish();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if !report.passed() {
        anyhow::bail!("replication invariants violated");
    }
    Ok(())
}
