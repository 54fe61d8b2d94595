//! Particle-filter belief over the true game state.
//!
//! A [`BeliefState`] holds, for one player, a weighted set of concrete
//! candidate states ("particles"), each owning an independent
//! [`GameTree`]. After every real observed ply the set is replaced, never
//! mutated: each particle is determinized where the ply could touch hidden
//! cards, expanded one ply, filtered by exact information-set match
//! against what was actually observed, and reweighted. Particles with no
//! surviving child are silently dropped; weights are normalized only at
//! sampling time.

pub mod determinize;
pub mod enumerate;

use crate::error::EngineError;
use crate::game::info_set::InfoSet;
use crate::game::state::GameState;
use crate::model::card::Card;
use crate::model::deck::{CORE_DECK, HAND_DEAL, INITIAL_PILE};
use crate::model::player::Player;
use crate::model::set::CardSet;
use crate::policy::DecisionPolicy;
use crate::tree::{GameTree, NodeKind, TurnKind};
use self::determinize::Resolutions;
use self::enumerate::Deals;
use rand::Rng;

/// One weighted candidate for the true state.
#[derive(Debug)]
pub struct Particle {
    tree: GameTree,
    weight: f64,
}

impl Particle {
    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    /// Unnormalized reach weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

#[derive(Debug)]
pub struct BeliefState {
    perspective: Player,
    particles: Vec<Particle>,
}

impl BeliefState {
    /// Initial belief after the deal: one particle per distinct opponent
    /// hand drawable from the core deck minus our own four cards, weighted
    /// by its combinatorial multiplicity. `own_core_deal` excludes the
    /// Defuse every seat receives.
    pub fn from_own_deal(perspective: Player, own_core_deal: CardSet) -> BeliefState {
        let mut available = CORE_DECK;
        available.remove_all(own_core_deal);
        let mut own_hand = own_core_deal;
        own_hand.add(Card::Defuse);

        let mut particles = Vec::new();
        for (pick, multiplicity) in Deals::new(available, HAND_DEAL) {
            let mut their_hand = pick;
            their_hand.add(Card::Defuse);
            let hands = match perspective {
                Player::First => [own_hand, their_hand],
                Player::Second => [their_hand, own_hand],
            };
            let state = GameState::with_unknown_pile(hands[0], hands[1], INITIAL_PILE);
            particles.push(Particle {
                tree: GameTree::with_root(state, Player::First, TurnKind::PlayTurn, 1),
                weight: multiplicity as f64,
            });
        }

        BeliefState {
            perspective,
            particles,
        }
    }

    pub fn perspective(&self) -> Player {
        self.perspective
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn total_weight(&self) -> f64 {
        self.particles.iter().map(|p| p.weight).sum()
    }

    /// Filters the belief against one observed real transition, producing
    /// the replacement particle set.
    ///
    /// `observed` is the perspective player's information set right after
    /// the transition. `policy` supplies branch probabilities when the
    /// transition was an opponent's decision; the perspective player's own
    /// choices are certain, and a chance vertex is folded in exactly (a
    /// uniform shuffle is the same distribution as forgetting the order).
    pub fn observe<P>(&self, observed: &InfoSet, policy: &P) -> Result<BeliefState, EngineError>
    where
        P: DecisionPolicy + ?Sized,
    {
        let mut next: Vec<Particle> = Vec::new();
        for particle in &self.particles {
            let root = particle.tree.root();
            let seat = particle.tree.seat(root)?;
            let pending = particle.tree.pending_turns(root)? as u8;
            let mut turn = particle.tree.turn(root)?;
            let mut base = *particle.tree.state(root)?;
            if turn == TurnKind::ShuffleDrawPile {
                base.forget_pile_order();
                turn = TurnKind::PlayTurn;
            }

            let variants: Vec<GameState> = if turn == TurnKind::PlayTurn {
                Resolutions::new(base)?.collect()
            } else {
                vec![base]
            };

            for variant in variants {
                let mut scratch = GameTree::with_root(variant, seat, turn, pending);
                let scratch_root = scratch.root();
                scratch.build_children(scratch_root)?;
                let count = scratch.num_children(scratch_root)?;

                let ours = turn.node_kind() == NodeKind::Player && seat == self.perspective;
                let branch_probs = if ours {
                    None
                } else {
                    let key = scratch.info_set_key(scratch_root, seat)?;
                    Some(policy.action_probabilities(&key, count))
                };

                for i in 0..count {
                    let child = scratch.child(scratch_root, i)?;
                    if scratch.info_set(child, self.perspective)? != *observed {
                        continue;
                    }
                    let probability = match &branch_probs {
                        None => 1.0,
                        Some(probs) => probs.get(i).copied().unwrap_or(0.0),
                    };
                    if probability > 0.0 {
                        next.push(Particle {
                            tree: scratch.detach(child)?,
                            weight: particle.weight * probability,
                        });
                    }
                }
            }
        }

        if next.is_empty() {
            return Err(EngineError::EmptyBelief);
        }
        Ok(BeliefState {
            perspective: self.perspective,
            particles: next,
        })
    }

    /// Keeps only the `max` heaviest particles. Determinization multiplies
    /// the particle count each ply; interactive callers prune between
    /// observations to keep updates bounded.
    pub fn pruned(&self, max: usize) -> Result<BeliefState, EngineError> {
        if self.particles.len() <= max {
            let particles = self
                .particles
                .iter()
                .map(|p| {
                    Ok(Particle {
                        tree: p.tree.detach(p.tree.root())?,
                        weight: p.weight,
                    })
                })
                .collect::<Result<Vec<_>, EngineError>>()?;
            return Ok(BeliefState {
                perspective: self.perspective,
                particles,
            });
        }

        let mut order: Vec<usize> = (0..self.particles.len()).collect();
        order.sort_by(|&a, &b| {
            self.particles[b]
                .weight
                .partial_cmp(&self.particles[a].weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut particles = Vec::with_capacity(max);
        for &index in order.iter().take(max) {
            let source = &self.particles[index];
            particles.push(Particle {
                tree: source.tree.detach(source.tree.root())?,
                weight: source.weight,
            });
        }
        Ok(BeliefState {
            perspective: self.perspective,
            particles,
        })
    }

    /// Draws one particle proportional to its normalized weight and turns
    /// it into a fully concrete, independently owned tree ready for
    /// simulation.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GameTree, EngineError> {
        if self.particles.is_empty() {
            return Err(EngineError::EmptyBelief);
        }
        let total = self.total_weight();
        let mut target = rng.gen_range(0.0..total.max(f64::MIN_POSITIVE));
        let mut chosen = &self.particles[self.particles.len() - 1];
        for particle in &self.particles {
            if target < particle.weight {
                chosen = particle;
                break;
            }
            target -= particle.weight;
        }

        let mut tree = chosen.tree.detach(chosen.tree.root())?;
        let root = tree.root();
        tree.state_mut(root)?.resolve_unknowns(rng)?;
        Ok(tree)
    }
}
