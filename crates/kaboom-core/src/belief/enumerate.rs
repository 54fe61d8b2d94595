//! Lazy combinatorial generators.
//!
//! Both generators hold their search state in an explicit frame stack on
//! the heap: callers can stop consuming at any point, and the recursion
//! depth is bounded by the container capacity rather than the call stack.

use crate::model::card::Card;
use crate::model::set::CardSet;
use crate::model::stack::CardStack;

pub fn factorial(n: usize) -> u64 {
    (2..=n as u64).product()
}

pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

/// Number of distinct orderings of a multiset: the multinomial
/// coefficient `len! / prod(count_k!)`.
pub fn distinct_shuffles(set: CardSet) -> u64 {
    let mut result = factorial(set.len());
    for (_, count) in set.iter() {
        result /= factorial(count as usize);
    }
    result
}

struct ShuffleFrame {
    remaining: CardSet,
    prefix: CardStack,
    depth: usize,
    next_id: u8,
}

/// Enumerates every distinct ordering of a multiset, lazily, in a stable
/// card-id order. Identical cards are interchangeable, so each distinct
/// ordering appears exactly once.
pub struct Shuffles {
    frames: Vec<ShuffleFrame>,
}

impl Shuffles {
    pub fn new(set: CardSet) -> Self {
        Shuffles {
            frames: vec![ShuffleFrame {
                remaining: set,
                prefix: CardStack::EMPTY,
                depth: 0,
                next_id: 0,
            }],
        }
    }
}

impl Iterator for Shuffles {
    type Item = CardStack;

    fn next(&mut self) -> Option<CardStack> {
        while let Some(frame) = self.frames.pop() {
            if frame.remaining.is_empty() {
                return Some(frame.prefix);
            }

            let next_kind = (frame.next_id..Card::KINDS as u8)
                .filter_map(Card::from_id)
                .find(|&card| frame.remaining.contains(card));
            let Some(card) = next_kind else {
                continue;
            };

            // Sibling: resume this depth at the following kind.
            self.frames.push(ShuffleFrame {
                remaining: frame.remaining,
                prefix: frame.prefix,
                depth: frame.depth,
                next_id: card.id() + 1,
            });

            let mut remaining = frame.remaining;
            remaining.remove(card);
            let mut prefix = frame.prefix;
            prefix.set_nth(frame.depth, card);
            self.frames.push(ShuffleFrame {
                remaining,
                prefix,
                depth: frame.depth + 1,
                next_id: 0,
            });
        }
        None
    }
}

struct DealFrame {
    chosen: CardSet,
    kind_index: usize,
    left: usize,
    multiplicity: u64,
}

/// Enumerates every distinct way to pick `k` cards out of an available
/// multiset, together with the number of physical card combinations that
/// produce each pick (`prod C(available_kind, chosen_kind)`).
pub struct Deals {
    available: CardSet,
    frames: Vec<DealFrame>,
}

impl Deals {
    pub fn new(available: CardSet, k: usize) -> Self {
        Deals {
            available,
            frames: vec![DealFrame {
                chosen: CardSet::EMPTY,
                kind_index: 0,
                left: k,
                multiplicity: 1,
            }],
        }
    }
}

impl Iterator for Deals {
    type Item = (CardSet, u64);

    fn next(&mut self) -> Option<(CardSet, u64)> {
        while let Some(frame) = self.frames.pop() {
            if frame.left == 0 {
                return Some((frame.chosen, frame.multiplicity));
            }
            if frame.kind_index >= Card::KINDS {
                continue;
            }

            let card = Card::ALL[frame.kind_index];
            let available = self.available.count_of(card) as usize;
            let max_take = available.min(frame.left);
            // Push the largest take first so takes pop in ascending order.
            for take in (0..=max_take).rev() {
                let mut chosen = frame.chosen;
                chosen.add_n(card, take as u8);
                self.frames.push(DealFrame {
                    chosen,
                    kind_index: frame.kind_index + 1,
                    left: frame.left - take,
                    multiplicity: frame.multiplicity
                        * binomial(available as u64, take as u64),
                });
            }
        }
        None
    }
}
