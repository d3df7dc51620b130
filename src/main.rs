//! gripspace - hand-tracking grab/rotate interaction runtime for VR scenes.
//!
//! Detects per-hand grip gestures, grabs and releases labeled objects
//! with pose-preserving reparenting, and rotates held objects from hand
//! orientation deltas. The binary runs scripted headless scenarios.

mod feedback;
mod hand;
mod harness;
mod interaction;
mod monitor;
mod scene;
mod state;

use clap::Parser;
use tracing::info;

use crate::harness::{HarnessConfig, Scenario};

#[derive(Parser, Debug)]
#[command(name = "gripspace", about = "Hand-tracking grab/rotate interaction runtime")]
struct Cli {
    /// Scenario to run: showcase, tracking-loss, or contention
    #[arg(long, default_value = "showcase")]
    scenario: String,

    /// Tick period in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Stop after N ticks (0 = run until interrupted)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Stop after N seconds of wall time
    #[arg(long)]
    exit_after: Option<u64>,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gripspace {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gripspace=info".into()),
        )
        .init();

    info!("gripspace v{} starting", env!("CARGO_PKG_VERSION"));

    let scenario = match Scenario::parse(&cli.scenario) {
        Some(scenario) => scenario,
        None => {
            eprintln!(
                "Unknown scenario: {}. Use: showcase, tracking-loss, or contention",
                cli.scenario
            );
            std::process::exit(1);
        }
    };

    let config = HarnessConfig {
        scenario,
        tick_ms: cli.tick_ms,
        max_ticks: (cli.ticks > 0).then_some(cli.ticks),
        exit_after_s: cli.exit_after,
    };
    harness::run(config)
}
