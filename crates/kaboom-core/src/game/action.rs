use crate::error::EngineError;
use crate::model::card::Card;
use crate::model::player::Player;
use core::fmt;

/// What an action did, as visible in the public log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionKind {
    PlayCard = 0,
    DrawCard = 1,
    GiveCard = 2,
    InsertKaboom = 3,
}

impl ActionKind {
    const fn from_id(id: u8) -> Option<ActionKind> {
        match id {
            0 => Some(ActionKind::PlayCard),
            1 => Some(ActionKind::DrawCard),
            2 => Some(ActionKind::GiveCard),
            3 => Some(ActionKind::InsertKaboom),
            _ => None,
        }
    }
}

/// One move in the game.
///
/// `card` is public (it stays `Unknown` for an ordinary draw). `position`
/// and `revealed` are disclosure fields private to the acting player:
/// `position` is the 1-based draw-pile slot chosen for a Kaboom
/// re-insertion (0 = not chosen / not known), and `revealed` carries
/// identities a card effect exposed — the Peek top three, or the card a
/// draw produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub player: Player,
    pub kind: ActionKind,
    pub card: Card,
    pub position: u8,
    pub revealed: [Card; 3],
}

impl Action {
    pub fn play(player: Player, card: Card) -> Self {
        Action {
            player,
            kind: ActionKind::PlayCard,
            card,
            position: 0,
            revealed: [Card::Unknown; 3],
        }
    }

    pub fn draw(player: Player) -> Self {
        Action {
            player,
            kind: ActionKind::DrawCard,
            card: Card::Unknown,
            position: 0,
            revealed: [Card::Unknown; 3],
        }
    }

    pub fn give(player: Player, card: Card) -> Self {
        Action {
            player,
            kind: ActionKind::GiveCard,
            card,
            position: 0,
            revealed: [Card::Unknown; 3],
        }
    }

    pub fn insert_kaboom(player: Player, position: u8) -> Self {
        Action {
            player,
            kind: ActionKind::InsertKaboom,
            card: Card::Kaboom,
            position,
            revealed: [Card::Unknown; 3],
        }
    }

    pub fn has_private_info(&self) -> bool {
        self.position != 0 || self.revealed.iter().any(|&c| c != Card::Unknown)
    }

    /// The action as `viewer` observes it: another player's disclosure
    /// fields are blanked, everything public is kept.
    pub fn censored(self, viewer: Player) -> Action {
        if self.player == viewer {
            return self;
        }
        Action {
            position: 0,
            revealed: [Card::Unknown; 3],
            ..self
        }
    }

    /// The action as it looked at choice time, before any card effect
    /// filled in its disclosure. The insertion position stays (it is the
    /// choice itself); a draw's outcome does not.
    pub fn as_choice(self) -> Action {
        let card = if self.kind == ActionKind::DrawCard {
            Card::Unknown
        } else {
            self.card
        };
        Action {
            card,
            revealed: [Card::Unknown; 3],
            ..self
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::PlayCard => write!(f, "{} plays {}", self.player, self.card),
            ActionKind::DrawCard => write!(f, "{} draws", self.player),
            ActionKind::GiveCard => write!(f, "{} gives {}", self.player, self.card),
            ActionKind::InsertKaboom => {
                write!(f, "{} buries the Kaboom", self.player)
            }
        }
    }
}

const PRIVATE_FLAG: u8 = 0x80;

/// Compact wire form of an [`Action`].
///
/// Byte 0 packs the seat (1 bit), kind (2 bits), public card (4 bits) and
/// a flag bit announcing that bytes 1 and 2 follow on the wire. Bytes 1–2
/// pack the insertion position and the three revealed cards, four bits
/// each. Actions without private info therefore cost a single byte in the
/// encoded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EncodedAction(pub [u8; 3]);

impl EncodedAction {
    pub fn encode(action: Action) -> Self {
        let mut bytes = [0u8; 3];
        bytes[0] = action.player.index() as u8
            | ((action.kind as u8) << 1)
            | (action.card.id() << 3);
        if action.has_private_info() {
            bytes[0] |= PRIVATE_FLAG;
            bytes[1] = (action.position & 0x0f) | (action.revealed[0].id() << 4);
            bytes[2] = action.revealed[1].id() | (action.revealed[2].id() << 4);
        }
        EncodedAction(bytes)
    }

    pub const fn has_private_info(self) -> bool {
        self.0[0] & PRIVATE_FLAG != 0
    }

    pub fn decode(self) -> Result<Action, EngineError> {
        let byte = self.0[0];
        let player = Player::from_index((byte & 0x01) as usize).ok_or(EngineError::MalformedAction)?;
        let kind = ActionKind::from_id((byte >> 1) & 0x03).ok_or(EngineError::MalformedAction)?;
        let card = Card::from_id((byte >> 3) & 0x0f).ok_or(EngineError::MalformedAction)?;

        let mut action = Action {
            player,
            kind,
            card,
            position: 0,
            revealed: [Card::Unknown; 3],
        };
        if self.has_private_info() {
            action.position = self.0[1] & 0x0f;
            action.revealed = [
                Card::from_id(self.0[1] >> 4).ok_or(EngineError::MalformedAction)?,
                Card::from_id(self.0[2] & 0x0f).ok_or(EngineError::MalformedAction)?,
                Card::from_id(self.0[2] >> 4).ok_or(EngineError::MalformedAction)?,
            ];
        }
        Ok(action)
    }
}
