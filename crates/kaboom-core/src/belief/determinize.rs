//! Resolution of hidden pile slots ahead of one-ply expansion.
//!
//! A particle's children can only be filtered against an observation when
//! the positions a ply can touch are concrete: the top three (an ordinary
//! draw or a Peek) and the bottom (DrawFromBottom). [`Resolutions`]
//! lazily enumerates every distinct way to fill those slots from the
//! particle's unaccounted card pool, deduplicated by the resulting pile
//! ordering.

use crate::error::EngineError;
use crate::game::state::GameState;
use crate::model::card::Card;
use crate::model::set::CardSet;
use crate::model::stack::CardStack;
use std::collections::HashSet;

struct Frame {
    pool: CardSet,
    pile: CardStack,
    slot_index: usize,
    next_id: u8,
}

/// Lazy enumeration of the distinct top-3/bottom fill-ins of one state.
pub struct Resolutions {
    base: GameState,
    slots: Vec<usize>,
    frames: Vec<Frame>,
    seen: HashSet<u64>,
}

impl Resolutions {
    pub fn new(base: GameState) -> Result<Resolutions, EngineError> {
        let pile_size = base.pile_size();
        let mut slots: Vec<usize> = (0..pile_size.min(3))
            .filter(|&i| base.pile_card(i).is_sentinel())
            .collect();
        if pile_size > 3 && base.pile_card(pile_size - 1).is_sentinel() {
            slots.push(pile_size - 1);
        }

        let pool = base.unaccounted();
        if pool.len() < slots.len() {
            return Err(EngineError::FreePoolExhausted {
                missing: slots.len() - pool.len(),
            });
        }

        let frames = vec![Frame {
            pool,
            pile: base.draw_pile(),
            slot_index: 0,
            next_id: 0,
        }];
        Ok(Resolutions {
            base,
            slots,
            frames,
            seen: HashSet::new(),
        })
    }

    /// How many positions this enumeration is resolving.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl Iterator for Resolutions {
    type Item = GameState;

    fn next(&mut self) -> Option<GameState> {
        while let Some(frame) = self.frames.pop() {
            if frame.slot_index == self.slots.len() {
                if self.seen.insert(frame.pile.to_bits()) {
                    let mut state = self.base;
                    state.apply_shuffle(frame.pile);
                    return Some(state);
                }
                continue;
            }

            let next_kind = (frame.next_id..Card::KINDS as u8)
                .filter_map(Card::from_id)
                .find(|&card| frame.pool.contains(card));
            let Some(card) = next_kind else {
                continue;
            };

            self.frames.push(Frame {
                pool: frame.pool,
                pile: frame.pile,
                slot_index: frame.slot_index,
                next_id: card.id() + 1,
            });

            let mut pool = frame.pool;
            pool.remove(card);
            let mut pile = frame.pile;
            pile.set_nth(self.slots[frame.slot_index], card);
            self.frames.push(Frame {
                pool,
                pile,
                slot_index: frame.slot_index + 1,
                next_id: 0,
            });
        }
        None
    }
}
