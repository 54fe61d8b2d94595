use crate::model::card::Card;
use crate::model::stack::CardStack;
use core::fmt;

const COUNT_BITS: u32 = 5;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;

/// Fixed-capacity multiset of cards, counts bit-packed five bits per kind.
///
/// A `CardSet` is a plain value: copying it yields a fully independent
/// container, which is what lets every tree node and belief particle own
/// its state without copy-on-write bookkeeping.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CardSet(u64);

impl CardSet {
    pub const EMPTY: CardSet = CardSet(0);

    pub const fn new() -> Self {
        CardSet(0)
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    pub const fn from_bits(bits: u64) -> Self {
        CardSet(bits)
    }

    pub const fn count_of(self, card: Card) -> u8 {
        ((self.0 >> (COUNT_BITS * card.id() as u32)) & COUNT_MASK) as u8
    }

    pub const fn contains(self, card: Card) -> bool {
        self.count_of(card) > 0
    }

    pub fn len(self) -> usize {
        Card::ALL
            .iter()
            .map(|&card| self.count_of(card) as usize)
            .sum()
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn distinct_kinds(self) -> usize {
        Card::ALL
            .iter()
            .filter(|&&card| self.contains(card))
            .count()
    }

    pub fn add(&mut self, card: Card) {
        self.add_n(card, 1);
    }

    pub fn add_n(&mut self, card: Card, n: u8) {
        let shift = COUNT_BITS * card.id() as u32;
        let count = self.count_of(card) as u64 + n as u64;
        debug_assert!(count <= COUNT_MASK, "card count overflow for {card}");
        self.0 = (self.0 & !(COUNT_MASK << shift)) | (count << shift);
    }

    /// Removes one card of the given kind. Removing from a zero count is a
    /// caller bug; in release builds it is a silent no-op.
    pub fn remove(&mut self, card: Card) {
        let count = self.count_of(card);
        debug_assert!(count > 0, "removing {card} from a set that has none");
        if count > 0 {
            let shift = COUNT_BITS * card.id() as u32;
            self.0 -= 1 << shift;
        }
    }

    pub fn add_all(&mut self, other: CardSet) {
        for (card, count) in other.iter() {
            self.add_n(card, count);
        }
    }

    pub fn remove_all(&mut self, other: CardSet) {
        for (card, count) in other.iter() {
            for _ in 0..count {
                self.remove(card);
            }
        }
    }

    /// Lazy `(card, count)` enumeration in ascending-id order. The order is
    /// deterministic and kind-stable so enumeration-driven algorithms
    /// (shuffle and deal generators) produce stable, deduplicable output.
    pub fn iter(self) -> impl Iterator<Item = (Card, u8)> {
        Card::ALL
            .into_iter()
            .map(move |card| (card, self.count_of(card)))
            .filter(|&(_, count)| count > 0)
    }

    pub fn as_vec(self) -> Vec<Card> {
        let mut cards = Vec::with_capacity(self.len());
        for (card, count) in self.iter() {
            for _ in 0..count {
                cards.push(card);
            }
        }
        cards
    }

    pub fn from_cards(cards: &[Card]) -> Self {
        let mut set = CardSet::new();
        for &card in cards {
            set.add(card);
        }
        set
    }

    /// Converts to an ordered stack: cards in canonical order, any
    /// `Unknown` entries ending up as (uncounted) trailing padding.
    pub fn to_stack(self) -> CardStack {
        let mut stack = CardStack::new();
        let mut position = 0;
        for (card, count) in self.iter() {
            if card == Card::Unknown {
                continue;
            }
            for _ in 0..count {
                stack.set_nth(position, card);
                position += 1;
            }
        }
        stack
    }
}

impl fmt::Debug for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardSet{{")?;
        let mut first = true;
        for (card, count) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{card}x{count}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::CardSet;
    use crate::model::card::Card;

    #[test]
    fn add_and_remove_track_counts() {
        let mut set = CardSet::new();
        set.add(Card::Skip);
        set.add(Card::Skip);
        set.add(Card::Peek);
        assert_eq!(set.count_of(Card::Skip), 2);
        assert_eq!(set.count_of(Card::Peek), 1);
        assert_eq!(set.len(), 3);
        set.remove(Card::Skip);
        assert_eq!(set.count_of(Card::Skip), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_all_subtracts_a_subset() {
        let mut set = CardSet::from_cards(&[Card::Skip, Card::Skip, Card::Swipe, Card::Peek]);
        let gone = CardSet::from_cards(&[Card::Skip, Card::Peek]);
        set.remove_all(gone);
        assert_eq!(set.count_of(Card::Skip), 1);
        assert_eq!(set.count_of(Card::Peek), 0);
        assert_eq!(set.count_of(Card::Swipe), 1);
    }

    #[test]
    fn iteration_is_in_ascending_id_order() {
        let set = CardSet::from_cards(&[Card::Swipe, Card::Kaboom, Card::Peek]);
        let kinds: Vec<Card> = set.iter().map(|(card, _)| card).collect();
        assert_eq!(kinds, vec![Card::Kaboom, Card::Peek, Card::Swipe]);
    }

    #[test]
    fn stack_roundtrip_preserves_multiset() {
        let set = CardSet::from_cards(&[Card::Skip, Card::Skip, Card::Shuffle, Card::Swipe]);
        let back = set.to_stack().to_set();
        assert_eq!(back, set);
    }

    #[test]
    fn to_stack_pads_unknowns_at_the_tail() {
        let mut set = CardSet::from_cards(&[Card::Skip, Card::Shuffle]);
        set.add_n(Card::Unknown, 3);
        let stack = set.to_stack();
        // Known cards occupy the head; the Unknowns are indistinguishable
        // from absence and do not extend the stack.
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.nth(0), Card::Skip);
        assert_eq!(stack.nth(1), Card::Shuffle);
        assert_eq!(stack.nth(2), Card::Unknown);
    }

    #[test]
    fn distinct_kinds_counts_nonzero_columns() {
        let set = CardSet::from_cards(&[Card::Skip, Card::Skip, Card::Swipe]);
        assert_eq!(set.distinct_kinds(), 2);
    }
}
