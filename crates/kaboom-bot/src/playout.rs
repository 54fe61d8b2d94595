//! Depth-first simulation of one concrete game.

use crate::telemetry::SearchCounters;
use kaboom_core::error::EngineError;
use kaboom_core::model::player::Player;
use kaboom_core::policy::DecisionPolicy;
use kaboom_core::tree::{GameTree, NodeKind};
use rand::Rng;

/// Plays `tree` out to a terminal, sampling chance vertices from their
/// distribution and player vertices from `policy`, and returns the
/// terminal utility for `perspective`. The tree must be fully concrete
/// (a [`BeliefState::sample`](kaboom_core::belief::BeliefState::sample)
/// result or a real deal).
pub fn playout<P, R>(
    tree: &mut GameTree,
    policy: &P,
    perspective: Player,
    rng: &mut R,
    counters: Option<&SearchCounters>,
) -> Result<f64, EngineError>
where
    P: DecisionPolicy + ?Sized,
    R: Rng + ?Sized,
{
    let mut node = tree.root();
    loop {
        match tree.kind(node)? {
            NodeKind::Terminal => {
                if let Some(counters) = counters {
                    SearchCounters::bump(&counters.playouts);
                }
                return tree.utility(node, perspective);
            }
            NodeKind::Chance => {
                // A shuffle is sampled in place rather than expanded: the
                // permutation fan-out is for exact enumeration, not rollouts.
                tree.resolve_shuffle_in_place(node, rng)?;
            }
            NodeKind::Player => {
                tree.build_children(node)?;
                if let Some(counters) = counters {
                    SearchCounters::bump(&counters.nodes_expanded);
                }
                let count = tree.num_children(node)?;
                let actor = tree.acting_player(node)?;
                let key = tree.info_set_key(node, actor)?;
                let probs = policy.action_probabilities(&key, count);
                node = tree.child(node, sample_index(&probs, rng))?;
            }
        }
    }
}

fn sample_index<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let mut remaining = rng.gen_range(0.0..1.0);
    for (i, &p) in probs.iter().enumerate() {
        if remaining < p {
            return i;
        }
        remaining -= p;
    }
    probs.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::playout;
    use crate::telemetry::SearchCounters;
    use kaboom_core::model::player::Player;
    use kaboom_core::policy::UniformPolicy;
    use kaboom_core::tree::GameTree;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn playout_reaches_a_terminal_and_is_zero_sum() {
        let counters = SearchCounters::shared();
        let mut rng = StdRng::seed_from_u64(4);
        for seed in 0..8 {
            let mut tree = GameTree::random_game(seed);
            let utility = playout(
                &mut tree,
                &UniformPolicy,
                Player::First,
                &mut rng,
                Some(&counters),
            )
            .unwrap();
            assert!(utility == 1.0 || utility == -1.0);
        }
        let snap = counters.snapshot();
        assert_eq!(snap.playouts, 8);
        assert!(snap.nodes_expanded >= 8);
    }

    #[test]
    fn seeded_playouts_are_reproducible() {
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut tree = GameTree::random_game(33);
            playout(&mut tree, &UniformPolicy, Player::Second, &mut rng, None).unwrap()
        };
        assert_eq!(run(7), run(7));
    }
}
