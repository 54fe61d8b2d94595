use crate::error::EngineError;
use crate::game::action::{Action, EncodedAction};

/// Upper bound on the number of logged actions in one game. Generous: a
/// duel exhausts the draw pile long before this.
pub const MAX_GAME_LENGTH: usize = 48;

/// Append-only public action log.
///
/// Fixed capacity so the whole log is a flat value and copies with its
/// owning state. Private action fields are retained here in memory; it is
/// the observer, not the log, that censors them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct History {
    actions: [EncodedAction; MAX_GAME_LENGTH],
    len: u8,
}

impl History {
    pub fn new() -> Self {
        History {
            actions: [EncodedAction::default(); MAX_GAME_LENGTH],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, action: Action) -> Result<(), EngineError> {
        if self.len() == MAX_GAME_LENGTH {
            return Err(EngineError::HistoryOverflow);
        }
        self.actions[self.len()] = EncodedAction::encode(action);
        self.len += 1;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<EncodedAction> {
        if index < self.len() {
            Some(self.actions[index])
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<EncodedAction> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = EncodedAction> + '_ {
        self.actions[..self.len()].iter().copied()
    }
}

impl Default for History {
    fn default() -> Self {
        History::new()
    }
}

impl core::fmt::Debug for History {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|encoded| encoded.decode()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{History, MAX_GAME_LENGTH};
    use crate::error::EngineError;
    use crate::game::action::Action;
    use crate::model::card::Card;
    use crate::model::player::Player;

    #[test]
    fn push_and_read_back() {
        let mut history = History::new();
        assert!(history.is_empty());
        history.push(Action::play(Player::First, Card::Skip)).unwrap();
        history.push(Action::draw(Player::First)).unwrap();
        assert_eq!(history.len(), 2);
        let first = history.get(0).unwrap().decode().unwrap();
        assert_eq!(first.card, Card::Skip);
        let last = history.last().unwrap().decode().unwrap();
        assert_eq!(last, Action::draw(Player::First));
    }

    #[test]
    fn overflow_is_fatal() {
        let mut history = History::new();
        for _ in 0..MAX_GAME_LENGTH {
            history.push(Action::draw(Player::First)).unwrap();
        }
        assert_eq!(
            history.push(Action::draw(Player::Second)),
            Err(EngineError::HistoryOverflow)
        );
    }
}
