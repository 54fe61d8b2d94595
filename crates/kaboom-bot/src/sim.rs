//! Parallel simulation batches over a belief state.

use crate::playout::playout;
use crate::telemetry::SearchCounters;
use kaboom_core::belief::BeliefState;
use kaboom_core::error::EngineError;
use kaboom_core::game::info_set::InfoSet;
use kaboom_core::model::player::Player;
use kaboom_core::policy::DecisionPolicy;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationReport {
    pub iterations: usize,
    pub wins: usize,
    pub losses: usize,
    pub mean_utility: f64,
    pub workers: usize,
}

/// Runs `iterations` independent sampled playouts, split evenly across
/// `workers` rayon tasks. Each worker derives its own RNG from `seed`, so
/// a report is reproducible for a fixed worker count; the policy is shared
/// read-only.
pub fn simulate_batch<P>(
    belief: &BeliefState,
    policy: &P,
    perspective: Player,
    iterations: usize,
    workers: usize,
    seed: u64,
    counters: &SearchCounters,
) -> Result<SimulationReport, EngineError>
where
    P: DecisionPolicy + Sync + ?Sized,
{
    let workers = workers.max(1);
    let base = iterations / workers;
    let extra = iterations % workers;

    let totals: Vec<(usize, f64)> = (0..workers)
        .into_par_iter()
        .map(|worker| {
            let budget = base + usize::from(worker < extra);
            let mut rng = StdRng::seed_from_u64(seed ^ (worker as u64).wrapping_mul(0x9e3779b97f4a7c15));
            let mut wins = 0usize;
            let mut total = 0.0f64;
            for _ in 0..budget {
                let mut tree = belief.sample(&mut rng)?;
                SearchCounters::bump(&counters.samples);
                let utility = playout(&mut tree, policy, perspective, &mut rng, Some(counters))?;
                if utility > 0.0 {
                    wins += 1;
                }
                total += utility;
            }
            Ok((wins, total))
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    let wins: usize = totals.iter().map(|&(w, _)| w).sum();
    let utility: f64 = totals.iter().map(|&(_, u)| u).sum();
    Ok(SimulationReport {
        iterations,
        wins,
        losses: iterations - wins,
        mean_utility: if iterations > 0 {
            utility / iterations as f64
        } else {
            0.0
        },
        workers,
    })
}

/// Advances a belief past one observed transition, recording particle
/// throughput in the counters.
pub fn update_belief<P>(
    belief: &BeliefState,
    observed: &InfoSet,
    policy: &P,
    counters: &SearchCounters,
) -> Result<BeliefState, EngineError>
where
    P: DecisionPolicy + ?Sized,
{
    SearchCounters::bump(&counters.belief_updates);
    SearchCounters::add(&counters.particles_in, belief.len() as u64);
    let next = belief.observe(observed, policy)?;
    SearchCounters::add(&counters.particles_out, next.len() as u64);
    debug!(
        before = belief.len(),
        after = next.len(),
        "belief update filtered particles"
    );
    Ok(next)
}
