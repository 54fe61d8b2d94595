use core::fmt;
use serde::{Deserialize, Serialize};

/// One card kind from the fixed game alphabet.
///
/// `Unknown` and `ToBeDetermined` are information-absence sentinels, not
/// physical cards: `Unknown` marks an identity nobody in the current
/// context has observed, while `ToBeDetermined` marks an identity whose
/// resolution has been deliberately deferred to sampling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Card {
    Unknown = 0,
    Kaboom = 1,
    Defuse = 2,
    Skip = 3,
    Attack = 4,
    DoubleAttack = 5,
    Peek = 6,
    Shuffle = 7,
    DrawFromBottom = 8,
    Swipe = 9,
    ToBeDetermined = 10,
}

impl Card {
    pub const KINDS: usize = 11;

    pub const ALL: [Card; Card::KINDS] = [
        Card::Unknown,
        Card::Kaboom,
        Card::Defuse,
        Card::Skip,
        Card::Attack,
        Card::DoubleAttack,
        Card::Peek,
        Card::Shuffle,
        Card::DrawFromBottom,
        Card::Swipe,
        Card::ToBeDetermined,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn from_id(id: u8) -> Option<Card> {
        match id {
            0 => Some(Card::Unknown),
            1 => Some(Card::Kaboom),
            2 => Some(Card::Defuse),
            3 => Some(Card::Skip),
            4 => Some(Card::Attack),
            5 => Some(Card::DoubleAttack),
            6 => Some(Card::Peek),
            7 => Some(Card::Shuffle),
            8 => Some(Card::DrawFromBottom),
            9 => Some(Card::Swipe),
            10 => Some(Card::ToBeDetermined),
            _ => None,
        }
    }

    pub const fn is_sentinel(self) -> bool {
        matches!(self, Card::Unknown | Card::ToBeDetermined)
    }

    /// Whether the card may be played from a hand on a regular turn.
    pub const fn is_playable(self) -> bool {
        !matches!(self, Card::Unknown | Card::Kaboom | Card::ToBeDetermined)
    }

    /// Extra turns an attack card transfers to the opponent.
    pub const fn attack_value(self) -> u8 {
        match self {
            Card::Attack => 1,
            Card::DoubleAttack => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Card::Unknown => "?",
            Card::Kaboom => "Kaboom",
            Card::Defuse => "Defuse",
            Card::Skip => "Skip",
            Card::Attack => "Attack",
            Card::DoubleAttack => "DoubleAttack",
            Card::Peek => "Peek",
            Card::Shuffle => "Shuffle",
            Card::DrawFromBottom => "DrawFromBottom",
            Card::Swipe => "Swipe",
            Card::ToBeDetermined => "TBD",
        };
        f.write_str(label)
    }
}
