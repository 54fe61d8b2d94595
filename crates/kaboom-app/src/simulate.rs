use anyhow::{Context, Result};
use kaboom_bot::{SearchCounters, SimulationReport, TabularPolicy, simulate_batch};
use kaboom_core::belief::BeliefState;
use kaboom_core::model::card::Card;
use kaboom_core::model::deck::deal_with_seed;
use kaboom_core::model::player::Player;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    report: SimulationReport,
    counters: kaboom_bot::CounterSnapshot,
}

pub fn run(
    seed: u64,
    iterations: usize,
    workers: usize,
    strategy: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    let policy = match strategy {
        Some(path) => TabularPolicy::load(path)
            .with_context(|| format!("loading strategy from {}", path.display()))?,
        None => TabularPolicy::new(),
    };

    let deal = deal_with_seed(seed);
    let mut own_core = deal.hands[Player::First.index()];
    own_core.remove(Card::Defuse);
    let belief = BeliefState::from_own_deal(Player::First, own_core);
    info!(particles = belief.len(), "initial belief built");

    let counters = SearchCounters::shared();
    let report = simulate_batch(
        &belief,
        &policy,
        Player::First,
        iterations,
        workers,
        seed,
        &counters,
    )
    .context("running the simulation batch")?;

    let summary = RunSummary {
        seed,
        report,
        counters: counters.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = out {
        policy
            .save(path)
            .with_context(|| format!("writing strategy blob to {}", path.display()))?;
        info!(path = %path.display(), "strategy blob written");
    }
    Ok(())
}
