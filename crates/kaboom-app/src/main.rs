mod count;
mod play;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Hidden-information card-duel engine.
#[derive(Debug, Parser)]
#[command(name = "kaboom", author, version, about = "Kaboom card-duel engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play an interactive game against the engine's policy.
    Play {
        /// RNG seed for the deal.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Strategy blob for the engine side (uniform play when absent).
        #[arg(long, value_name = "FILE")]
        strategy: Option<PathBuf>,
    },
    /// Walk the game tree from a seeded deal and report node counts.
    CountNodes {
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Maximum plies below the root.
        #[arg(long, default_value_t = 6)]
        depth: usize,

        /// Worker threads for per-subtree fan-out.
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
    /// Run a batch of sampled playouts against the initial belief.
    Simulate {
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 1000)]
        iterations: usize,

        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Strategy blob to simulate with (uniform play when absent).
        #[arg(long, value_name = "FILE")]
        strategy: Option<PathBuf>,

        /// Where to write the strategy blob back out.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Play { seed, strategy } => play::run(seed, strategy.as_deref()),
        Command::CountNodes {
            seed,
            depth,
            workers,
        } => count::run(seed, depth, workers),
        Command::Simulate {
            seed,
            iterations,
            workers,
            strategy,
            out,
        } => simulate::run(seed, iterations, workers, strategy.as_deref(), out.as_deref()),
    }
}
