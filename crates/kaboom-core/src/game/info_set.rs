use crate::error::EngineError;
use crate::game::action::{Action, ActionKind};
use crate::model::card::Card;
use crate::model::deck::CORE_DECK;
use crate::model::player::Player;
use crate::model::set::CardSet;
use crate::model::stack::CardStack;

pub const INFO_SET_BYTES: usize = 40;

/// Everything a single player can distinguish about the game.
///
/// - `hand` is fully known.
/// - `opponent_hand` counts cards we know the opponent holds, plus an
///   `Unknown` bucket for the rest.
/// - `draw_pile` counts pile contents the same way; `known_pile` overlays
///   the positions whose identity we have pinned (after a Peek, or after
///   burying the Kaboom ourselves).
/// - `remaining` is the multiset of cards whose location is unresolved;
///   its size always equals the number of `Unknown`s across the opponent
///   hand and the draw pile.
///
/// An `InfoSet` is created once from the initial deal and then advanced in
/// place with one O(1) [`InfoSet::observe`] per logged action; it is never
/// rebuilt from scratch on the hot path. The replay in
/// [`GameState::info_set`](crate::game::state::GameState::info_set) is the
/// canonical slow path the incremental updates must agree with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoSet {
    pub hand: CardSet,
    pub opponent_hand: CardSet,
    pub draw_pile: CardSet,
    pub known_pile: CardStack,
    pub remaining: CardSet,
}

fn take(set: &mut CardSet, card: Card, reason: &'static str) -> Result<(), EngineError> {
    if !set.contains(card) {
        return Err(EngineError::CorruptInfoSet { reason });
    }
    set.remove(card);
    Ok(())
}

impl InfoSet {
    /// View right after the deal, from the seat holding `deal` (five cards
    /// including the Defuse).
    pub fn from_deal(deal: CardSet) -> InfoSet {
        let mut opponent_hand = CardSet::new();
        opponent_hand.add(Card::Defuse);
        opponent_hand.add_n(Card::Unknown, 4);

        let mut draw_pile = CardSet::new();
        draw_pile.add(Card::Kaboom);
        draw_pile.add_n(Card::Unknown, 12);

        let mut core_cards = deal;
        core_cards.remove(Card::Defuse);
        let mut remaining = CORE_DECK;
        remaining.remove_all(core_cards);

        InfoSet {
            hand: deal,
            opponent_hand,
            draw_pile,
            known_pile: CardStack::EMPTY,
            remaining,
        }
    }

    /// Advances the view by one observed action. The action is censored to
    /// what `viewer` could actually see before being folded in.
    pub fn observe(&mut self, action: Action, viewer: Player) -> Result<(), EngineError> {
        let action = action.censored(viewer);
        if action.player == viewer {
            self.observe_own(action)
        } else {
            self.observe_opponent(action)
        }
    }

    fn observe_own(&mut self, action: Action) -> Result<(), EngineError> {
        match action.kind {
            ActionKind::PlayCard => {
                take(&mut self.hand, action.card, "played a card not in hand")?;
                match action.card {
                    Card::Peek => self.see_top(&action.revealed)?,
                    Card::DrawFromBottom => self.draw_from_pile(action.revealed[0], true)?,
                    Card::Shuffle => self.known_pile = CardStack::EMPTY,
                    _ => {}
                }
            }
            ActionKind::DrawCard => self.draw_from_pile(action.revealed[0], false)?,
            ActionKind::GiveCard => {
                take(&mut self.hand, action.card, "gave a card not in hand")?;
                self.opponent_hand.add(action.card);
            }
            ActionKind::InsertKaboom => {
                take(&mut self.hand, Card::Kaboom, "buried a Kaboom not in hand")?;
                self.draw_pile.add(Card::Kaboom);
                if action.position > 0 {
                    self.known_pile.insert(action.position as usize - 1, Card::Kaboom);
                } else {
                    // Blind insertion: position knowledge is gone.
                    self.known_pile = CardStack::EMPTY;
                }
            }
        }
        Ok(())
    }

    fn observe_opponent(&mut self, action: Action) -> Result<(), EngineError> {
        match action.kind {
            ActionKind::PlayCard => {
                self.opponent_played(action.card)?;
                match action.card {
                    Card::DrawFromBottom => self.opponent_drew(Card::Unknown, true)?,
                    Card::Shuffle => self.known_pile = CardStack::EMPTY,
                    _ => {}
                }
            }
            ActionKind::DrawCard => self.opponent_drew(action.card, false)?,
            ActionKind::GiveCard => {
                if self.opponent_hand.contains(action.card) {
                    self.opponent_hand.remove(action.card);
                } else {
                    take(
                        &mut self.opponent_hand,
                        Card::Unknown,
                        "opponent gave from an empty unknown bucket",
                    )?;
                    take(&mut self.remaining, action.card, "gifted card was not outstanding")?;
                }
                self.hand.add(action.card);
            }
            ActionKind::InsertKaboom => {
                take(
                    &mut self.opponent_hand,
                    Card::Kaboom,
                    "opponent buried a Kaboom we did not see them hold",
                )?;
                self.draw_pile.add(Card::Kaboom);
                // Their insertion position is private: every positional
                // pin we held may have shifted, so all of them are void.
                self.known_pile = CardStack::EMPTY;
            }
        }
        Ok(())
    }

    /// Occurrences of `card` pinned to a position by the overlay.
    fn pinned_count(&self, card: Card) -> u8 {
        self.known_pile.iter().filter(|&c| c == card).count() as u8
    }

    /// Removes one identified card from the pile counts. A copy known at
    /// set level but not pinned to a position (the Kaboom before anyone
    /// peeks, or contents surviving a shuffle) is consumed first; otherwise
    /// the card comes out of the unknown bucket and the outstanding pool.
    fn consume_pile_card(&mut self, card: Card) -> Result<(), EngineError> {
        if self.draw_pile.count_of(card) > self.pinned_count(card) {
            self.draw_pile.remove(card);
        } else {
            take(&mut self.draw_pile, Card::Unknown, "draw pile unknown bucket empty")?;
            take(&mut self.remaining, card, "identified card was not outstanding")?;
        }
        Ok(())
    }

    /// Forgets which kinds the unpinned portion of the pile holds, moving
    /// them back into the outstanding pool. Needed when the opponent draws
    /// unseen from a pile whose unknown bucket is empty: the summary cannot
    /// express "they hold one of these".
    fn demote_unpinned_pile_knowledge(&mut self) {
        let counts = self.draw_pile;
        for (card, count) in counts.iter() {
            if card == Card::Unknown {
                continue;
            }
            let unpinned = count.saturating_sub(self.pinned_count(card));
            for _ in 0..unpinned {
                self.draw_pile.remove(card);
                self.draw_pile.add(Card::Unknown);
                self.remaining.add(card);
            }
        }
    }

    /// Our own draw of `card` from the top (or bottom) of the pile.
    fn draw_from_pile(&mut self, card: Card, from_bottom: bool) -> Result<(), EngineError> {
        if card.is_sentinel() {
            return Err(EngineError::CorruptInfoSet {
                reason: "own draw with unresolved identity",
            });
        }
        let position = if from_bottom {
            self.draw_pile.len().saturating_sub(1)
        } else {
            0
        };
        let known = self.known_pile.nth(position);
        self.known_pile.remove(position);
        if known == Card::Unknown {
            self.consume_pile_card(card)?;
        } else {
            if known != card {
                return Err(EngineError::InfoSetDiverged {
                    position,
                    expected: known,
                    actual: card,
                });
            }
            take(&mut self.draw_pile, known, "drawn card missing from pile counts")?;
        }
        self.hand.add(card);
        Ok(())
    }

    /// The opponent drew; `public_card` is non-`Unknown` only when the draw
    /// is publicly visible (the Kaboom).
    fn opponent_drew(&mut self, public_card: Card, from_bottom: bool) -> Result<(), EngineError> {
        let position = if from_bottom {
            self.draw_pile.len().saturating_sub(1)
        } else {
            0
        };
        let known = self.known_pile.nth(position);
        self.known_pile.remove(position);
        if known != Card::Unknown {
            if public_card != Card::Unknown && public_card != known {
                return Err(EngineError::InfoSetDiverged {
                    position,
                    expected: known,
                    actual: public_card,
                });
            }
            self.opponent_hand.add(known);
            take(&mut self.draw_pile, known, "drawn card missing from pile counts")?;
        } else if public_card != Card::Unknown {
            self.opponent_hand.add(public_card);
            self.consume_pile_card(public_card)?;
        } else {
            if self.draw_pile.count_of(Card::Unknown) == 0 {
                self.demote_unpinned_pile_knowledge();
            }
            self.opponent_hand.add(Card::Unknown);
            take(&mut self.draw_pile, Card::Unknown, "draw pile unknown bucket empty")?;
        }
        Ok(())
    }

    fn opponent_played(&mut self, card: Card) -> Result<(), EngineError> {
        if self.opponent_hand.contains(card) {
            self.opponent_hand.remove(card);
        } else {
            take(
                &mut self.opponent_hand,
                Card::Unknown,
                "opponent played from an empty unknown bucket",
            )?;
            take(&mut self.remaining, card, "played card was not outstanding")?;
        }
        Ok(())
    }

    /// Folds a Peek disclosure into the positional overlay. A conflict with
    /// an already-pinned position means the tree builder and this model
    /// have diverged, which is unrecoverable.
    fn see_top(&mut self, revealed: &[Card; 3]) -> Result<(), EngineError> {
        for (i, &card) in revealed.iter().enumerate() {
            if card == Card::Unknown {
                continue; // pile was shorter than three cards
            }
            let known = self.known_pile.nth(i);
            if known == Card::Unknown {
                if self.draw_pile.count_of(card) > self.pinned_count(card) {
                    // Known to be in the pile, position now pinned.
                    self.known_pile.set_nth(i, card);
                } else {
                    take(&mut self.remaining, card, "revealed card was not outstanding")?;
                    take(&mut self.draw_pile, Card::Unknown, "draw pile unknown bucket empty")?;
                    self.draw_pile.add(card);
                    self.known_pile.set_nth(i, card);
                }
            } else if known != card {
                return Err(EngineError::InfoSetDiverged {
                    position: i,
                    expected: known,
                    actual: card,
                });
            }
        }
        Ok(())
    }

    /// Checks every internal constraint.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.hand.count_of(Card::Unknown) != 0 || self.hand.count_of(Card::ToBeDetermined) != 0 {
            return Err(EngineError::CorruptInfoSet {
                reason: "own hand contains unresolved cards",
            });
        }

        let unresolved = self.opponent_hand.count_of(Card::Unknown) as usize
            + self.draw_pile.count_of(Card::Unknown) as usize;
        if unresolved != self.remaining.len() {
            return Err(EngineError::CorruptInfoSet {
                reason: "remaining cards disagree with unknown buckets",
            });
        }

        if self.known_pile.len() > self.draw_pile.len() {
            return Err(EngineError::CorruptInfoSet {
                reason: "positional overlay longer than the pile",
            });
        }
        let mut pinned = CardSet::new();
        for card in self.known_pile.iter() {
            if card != Card::Unknown {
                pinned.add(card);
            }
        }
        for (card, count) in pinned.iter() {
            if self.draw_pile.count_of(card) < count {
                return Err(EngineError::CorruptInfoSet {
                    reason: "overlay pins a card the pile counts do not hold",
                });
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; INFO_SET_BYTES] {
        let mut bytes = [0u8; INFO_SET_BYTES];
        let words = [
            self.hand.to_bits(),
            self.opponent_hand.to_bits(),
            self.draw_pile.to_bits(),
            self.known_pile.to_bits(),
            self.remaining.to_bits(),
        ];
        for (i, word) in words.iter().enumerate() {
            bytes[8 * i..8 * (i + 1)].copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<InfoSet, EngineError> {
        if bytes.len() != INFO_SET_BYTES {
            return Err(EngineError::MalformedAction);
        }
        let mut words = [0u64; 5];
        for (i, word) in words.iter_mut().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[8 * i..8 * (i + 1)]);
            *word = u64::from_le_bytes(chunk);
        }
        Ok(InfoSet {
            hand: CardSet::from_bits(words[0]),
            opponent_hand: CardSet::from_bits(words[1]),
            draw_pile: CardSet::from_bits(words[2]),
            known_pile: CardStack::from_bits(words[3]),
            remaining: CardSet::from_bits(words[4]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::InfoSet;
    use crate::error::EngineError;
    use crate::game::action::Action;
    use crate::model::card::Card;
    use crate::model::player::Player;
    use crate::model::set::CardSet;

    fn sample_deal() -> CardSet {
        let mut deal = CardSet::from_cards(&[Card::Skip, Card::Skip, Card::Peek, Card::Swipe]);
        deal.add(Card::Defuse);
        deal
    }

    #[test]
    fn initial_view_is_valid() {
        let view = InfoSet::from_deal(sample_deal());
        view.validate().unwrap();
        assert_eq!(view.remaining.len(), 16);
        assert_eq!(view.opponent_hand.count_of(Card::Unknown), 4);
        assert_eq!(view.draw_pile.count_of(Card::Unknown), 12);
    }

    #[test]
    fn own_draw_of_unseen_card_consumes_remaining() {
        let mut view = InfoSet::from_deal(sample_deal());
        let before = view.remaining.count_of(Card::Shuffle);
        let mut action = Action::draw(Player::First);
        action.revealed[0] = Card::Shuffle;
        view.observe(action, Player::First).unwrap();
        view.validate().unwrap();
        assert_eq!(view.hand.count_of(Card::Shuffle), 1);
        assert_eq!(view.remaining.count_of(Card::Shuffle), before - 1);
        assert_eq!(view.draw_pile.count_of(Card::Unknown), 11);
    }

    #[test]
    fn peek_pins_positions_and_draw_consumes_them() {
        let mut view = InfoSet::from_deal(sample_deal());
        let mut peek = Action::play(Player::First, Card::Peek);
        peek.revealed = [Card::Attack, Card::Shuffle, Card::Swipe];
        view.observe(peek, Player::First).unwrap();
        view.validate().unwrap();
        assert_eq!(view.known_pile.nth(0), Card::Attack);
        assert_eq!(view.draw_pile.count_of(Card::Unknown), 9);

        // Drawing the pinned top card must not touch `remaining`.
        let remaining_before = view.remaining;
        let mut draw = Action::draw(Player::First);
        draw.revealed[0] = Card::Attack;
        view.observe(draw, Player::First).unwrap();
        view.validate().unwrap();
        assert_eq!(view.remaining, remaining_before);
        assert_eq!(view.known_pile.nth(0), Card::Shuffle);
    }

    #[test]
    fn conflicting_reveal_is_fatal() {
        let mut view = InfoSet::from_deal(sample_deal());
        let mut peek = Action::play(Player::First, Card::Peek);
        peek.revealed = [Card::Attack, Card::Shuffle, Card::Swipe];
        view.observe(peek, Player::First).unwrap();

        view.hand.add(Card::Peek); // put a second Peek in hand for the replay
        let mut conflicting = Action::play(Player::First, Card::Peek);
        conflicting.revealed = [Card::Skip, Card::Shuffle, Card::Swipe];
        let err = view.observe(conflicting, Player::First).unwrap_err();
        assert!(matches!(err, EngineError::InfoSetDiverged { position: 0, .. }));
    }

    #[test]
    fn opponent_play_splits_known_and_unknown() {
        let mut view = InfoSet::from_deal(sample_deal());
        // Their Defuse is the only card we know they hold.
        view.observe(Action::play(Player::Second, Card::Defuse), Player::First)
            .unwrap();
        view.validate().unwrap();
        assert_eq!(view.opponent_hand.count_of(Card::Defuse), 0);
        assert_eq!(view.opponent_hand.count_of(Card::Unknown), 4);

        let outstanding = view.remaining.count_of(Card::Skip);
        view.observe(Action::play(Player::Second, Card::Skip), Player::First)
            .unwrap();
        view.validate().unwrap();
        assert_eq!(view.opponent_hand.count_of(Card::Unknown), 3);
        assert_eq!(view.remaining.count_of(Card::Skip), outstanding - 1);
    }

    #[test]
    fn public_kaboom_draw_is_resolved_for_the_observer() {
        let mut view = InfoSet::from_deal(sample_deal());
        let mut draw = Action::draw(Player::Second);
        draw.card = Card::Kaboom;
        draw.revealed[0] = Card::Kaboom;
        view.observe(draw, Player::First).unwrap();
        view.validate().unwrap();
        assert_eq!(view.opponent_hand.count_of(Card::Kaboom), 1);
        assert_eq!(view.draw_pile.count_of(Card::Kaboom), 0);
        assert_eq!(view.draw_pile.len(), 12);
    }

    #[test]
    fn opponent_insertion_voids_the_overlay() {
        let mut view = InfoSet::from_deal(sample_deal());
        let mut draw = Action::draw(Player::Second);
        draw.card = Card::Kaboom;
        view.observe(draw, Player::First).unwrap();

        let mut peek = Action::play(Player::First, Card::Peek);
        peek.revealed = [Card::Attack, Card::Shuffle, Card::Swipe];
        view.observe(peek, Player::First).unwrap();
        assert_eq!(view.known_pile.nth(0), Card::Attack);

        view.observe(Action::play(Player::Second, Card::Defuse), Player::First)
            .unwrap();
        view.observe(Action::insert_kaboom(Player::Second, 3), Player::First)
            .unwrap();
        view.validate().unwrap();
        assert!(view.known_pile.is_empty());
        assert_eq!(view.draw_pile.count_of(Card::Kaboom), 1);
    }

    #[test]
    fn byte_form_roundtrips() {
        let view = InfoSet::from_deal(sample_deal());
        let bytes = view.to_bytes();
        assert_eq!(InfoSet::from_bytes(&bytes).unwrap(), view);
        assert!(InfoSet::from_bytes(&bytes[..20]).is_err());
    }
}
