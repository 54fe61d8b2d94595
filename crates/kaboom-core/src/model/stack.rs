use crate::model::card::Card;
use crate::model::set::CardSet;
use core::fmt;

const SLOT_BITS: u32 = 4;
const SLOT_MASK: u64 = (1 << SLOT_BITS) - 1;

/// Ordered sequence of cards, four bits per position.
///
/// Positions past the last non-`Unknown` card are indistinguishable from
/// absence, so `len()` is the index of the last known card plus one;
/// leading and interior `Unknown` entries do count. Like [`CardSet`] this
/// is a plain value with no shared backing.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CardStack(u64);

impl CardStack {
    pub const CAPACITY: usize = (u64::BITS / SLOT_BITS) as usize;
    pub const EMPTY: CardStack = CardStack(0);

    pub const fn new() -> Self {
        CardStack(0)
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    pub const fn from_bits(bits: u64) -> Self {
        CardStack(bits)
    }

    pub fn from_cards(cards: &[Card]) -> Self {
        let mut stack = CardStack::new();
        for (i, &card) in cards.iter().enumerate() {
            stack.set_nth(i, card);
        }
        stack
    }

    /// Card at position `n`; any position past capacity reads as `Unknown`.
    pub const fn nth(self, n: usize) -> Card {
        if n >= Self::CAPACITY {
            return Card::Unknown;
        }
        let id = ((self.0 >> (SLOT_BITS * n as u32)) & SLOT_MASK) as u8;
        match Card::from_id(id) {
            Some(card) => card,
            None => Card::Unknown,
        }
    }

    /// Writes position `n`. Writing the value already present is a no-op.
    pub fn set_nth(&mut self, n: usize, card: Card) {
        debug_assert!(n < Self::CAPACITY, "stack position {n} out of range");
        if n >= Self::CAPACITY || self.nth(n) == card {
            return;
        }
        let shift = SLOT_BITS * n as u32;
        self.0 = (self.0 & !(SLOT_MASK << shift)) | ((card.id() as u64) << shift);
    }

    /// Inserts `card` at position `n`, shifting later positions down.
    /// A card shifted past the fixed capacity is dropped.
    pub fn insert(&mut self, n: usize, card: Card) {
        debug_assert!(n < Self::CAPACITY, "stack position {n} out of range");
        let shift = SLOT_BITS * n as u32;
        let below = if shift == 0 {
            0
        } else {
            self.0 & ((1u64 << shift) - 1)
        };
        let above = ((self.0 >> shift) << SLOT_BITS) << shift;
        self.0 = below | above | ((card.id() as u64) << shift);
    }

    /// Removes the card at position `n`, shifting later positions up.
    pub fn remove(&mut self, n: usize) {
        debug_assert!(n < Self::CAPACITY, "stack position {n} out of range");
        let shift = SLOT_BITS * n as u32;
        let below = if shift == 0 {
            0
        } else {
            self.0 & ((1u64 << shift) - 1)
        };
        let above = ((self.0 >> shift) >> SLOT_BITS) << shift;
        self.0 = below | above;
    }

    /// Index of the last non-`Unknown` position plus one.
    pub const fn len(self) -> usize {
        if self.0 == 0 {
            0
        } else {
            Self::CAPACITY - (self.0.leading_zeros() / SLOT_BITS) as usize
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Card> {
        (0..self.len()).map(move |i| self.nth(i))
    }

    /// Multiset view of the stack, counting interior `Unknown` entries.
    pub fn to_set(self) -> CardSet {
        let mut set = CardSet::new();
        for card in self.iter() {
            set.add(card);
        }
        set
    }
}

impl fmt::Debug for CardStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, card) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{card}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for CardStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
