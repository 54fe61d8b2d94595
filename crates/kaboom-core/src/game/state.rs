use crate::error::EngineError;
use crate::game::action::{Action, ActionKind, EncodedAction};
use crate::game::history::History;
use crate::game::info_set::InfoSet;
use crate::model::card::Card;
use crate::model::deck::{Deal, FULL_DECK};
use crate::model::player::Player;
use crate::model::set::CardSet;
use crate::model::stack::CardStack;
use rand::Rng;
use rand::seq::SliceRandom;

/// Authoritative game state: the draw pile, both hands, the initial deals
/// and the public action log.
///
/// A `GameState` is a flat value. In belief particles the pile may contain
/// `Unknown` positions (nobody has resolved them yet); `pile_size` tracks
/// the physical pile size independently of how many positions are known,
/// since trailing `Unknown`s are invisible to [`CardStack::len`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    draw_pile: CardStack,
    pile_size: u8,
    hands: [CardSet; 2],
    deals: [CardSet; 2],
    history: History,
}

impl GameState {
    pub fn new(draw_pile: CardStack, first_hand: CardSet, second_hand: CardSet) -> Self {
        GameState {
            draw_pile,
            pile_size: draw_pile.len() as u8,
            hands: [first_hand, second_hand],
            deals: [first_hand, second_hand],
            history: History::new(),
        }
    }

    pub fn from_deal(deal: &Deal) -> Self {
        GameState::new(deal.draw_pile, deal.hands[0], deal.hands[1])
    }

    /// State whose pile order is entirely unresolved, as belief particles
    /// start out.
    pub fn with_unknown_pile(first_hand: CardSet, second_hand: CardSet, pile_size: usize) -> Self {
        GameState {
            draw_pile: CardStack::EMPTY,
            pile_size: pile_size as u8,
            hands: [first_hand, second_hand],
            deals: [first_hand, second_hand],
            history: History::new(),
        }
    }

    pub fn hand(&self, player: Player) -> CardSet {
        self.hands[player.index()]
    }

    pub fn draw_pile(&self) -> CardStack {
        self.draw_pile
    }

    pub fn pile_size(&self) -> usize {
        self.pile_size as usize
    }

    /// Card at pile position `i`, `Unknown` when unresolved or out of range.
    pub fn pile_card(&self, i: usize) -> Card {
        if i < self.pile_size() {
            self.draw_pile.nth(i)
        } else {
            Card::Unknown
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_action(&self) -> Option<EncodedAction> {
        self.history.last()
    }

    pub fn last_action_was_attack(&self) -> bool {
        self.last_action()
            .and_then(|encoded| encoded.decode().ok())
            .map(|action| {
                action.kind == ActionKind::PlayCard && action.card.attack_value() > 0
            })
            .unwrap_or(false)
    }

    /// Applies one action, filling in any disclosure fields its card effect
    /// produces, and logs it when `visible`. Returns the completed action.
    pub fn apply(&mut self, action: Action, visible: bool) -> Result<Action, EngineError> {
        let mut action = action;
        match action.kind {
            ActionKind::PlayCard => self.play_card(&mut action)?,
            ActionKind::DrawCard => self.draw_top(&mut action),
            ActionKind::GiveCard => self.give_card(action),
            ActionKind::InsertKaboom => self.insert_kaboom(action)?,
        }
        if visible {
            self.history.push(action)?;
        }
        Ok(action)
    }

    /// Replaces the pile with a freshly shuffled ordering. The resolution
    /// of a shuffle is not an observable action, so nothing is logged.
    pub fn apply_shuffle(&mut self, shuffled: CardStack) {
        self.draw_pile = shuffled;
    }

    /// Drops all positional pile knowledge, keeping the physical size.
    pub fn forget_pile_order(&mut self) {
        self.draw_pile = CardStack::EMPTY;
    }

    fn play_card(&mut self, action: &mut Action) -> Result<(), EngineError> {
        let seat = action.player.index();
        self.hands[seat].remove(action.card);
        match action.card {
            Card::Peek => {
                action.revealed = [self.pile_card(0), self.pile_card(1), self.pile_card(2)];
            }
            Card::DrawFromBottom => {
                if self.pile_size == 0 {
                    return Err(EngineError::CorruptInfoSet {
                        reason: "bottom draw from an empty pile",
                    });
                }
                let bottom = self.pile_size() - 1;
                let drawn = resolve_drawn(self.draw_pile.nth(bottom));
                self.draw_pile.remove(bottom);
                self.pile_size -= 1;
                self.hands[seat].add(drawn);
                action.revealed[0] = drawn;
            }
            _ => {}
        }
        Ok(())
    }

    fn draw_top(&mut self, action: &mut Action) {
        debug_assert!(self.pile_size > 0, "draw from an empty pile");
        let drawn = resolve_drawn(self.draw_pile.nth(0));
        self.draw_pile.remove(0);
        self.pile_size -= 1;
        self.hands[action.player.index()].add(drawn);
        // Drawing the Kaboom is public knowledge.
        if drawn == Card::Kaboom {
            action.card = Card::Kaboom;
        }
        action.revealed[0] = drawn;
    }

    fn give_card(&mut self, action: Action) {
        self.hands[action.player.index()].remove(action.card);
        self.hands[action.player.opponent().index()].add(action.card);
    }

    fn insert_kaboom(&mut self, action: Action) -> Result<(), EngineError> {
        if action.position == 0 {
            return Err(EngineError::MalformedAction);
        }
        self.hands[action.player.index()].remove(Card::Kaboom);
        self.draw_pile.insert(action.position as usize - 1, Card::Kaboom);
        self.pile_size += 1;
        Ok(())
    }

    /// The player's information set, derived canonically by folding the
    /// full history against their initial deal.
    pub fn info_set(&self, player: Player) -> Result<InfoSet, EngineError> {
        let mut view = InfoSet::from_deal(self.deals[player.index()]);
        for encoded in self.history.iter() {
            view.observe(encoded.decode()?, player)?;
        }
        Ok(view)
    }

    /// Multiset of cards whose location is unaccounted for: the full deck
    /// minus both hands' resolved cards, minus resolved pile positions,
    /// minus everything played out of the game. This is the pool that
    /// fills unresolved slots during determinization and sampling.
    pub fn unaccounted(&self) -> CardSet {
        let mut pool = FULL_DECK;
        for seat in Player::LOOP {
            for (card, count) in self.hands[seat.index()].iter() {
                if !card.is_sentinel() {
                    for _ in 0..count {
                        pool.remove(card);
                    }
                }
            }
        }
        for i in 0..self.pile_size() {
            let card = self.draw_pile.nth(i);
            if !card.is_sentinel() {
                pool.remove(card);
            }
        }
        for encoded in self.history.iter() {
            if let Ok(action) = encoded.decode() {
                if action.kind == ActionKind::PlayCard {
                    pool.remove(action.card);
                }
            }
        }
        pool
    }

    /// Resolves every remaining sentinel — unresolved pile positions and
    /// deferred hand cards — by drawing without replacement from the
    /// unaccounted pool in a uniformly random order, producing a fully
    /// concrete, rules-consistent state. Running out of pool cards means
    /// the unresolved-slot accounting has diverged, which is fatal.
    pub fn resolve_unknowns<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), EngineError> {
        let needed = self.unresolved_slots();
        if needed == 0 {
            return Ok(());
        }
        let mut pool = self.unaccounted().as_vec();
        if pool.len() < needed {
            return Err(EngineError::FreePoolExhausted {
                missing: needed - pool.len(),
            });
        }
        pool.shuffle(rng);

        for i in 0..self.pile_size() {
            if self.draw_pile.nth(i).is_sentinel() {
                let card = pool.pop().expect("pool sized to the slot count");
                self.draw_pile.set_nth(i, card);
            }
        }
        for seat in Player::LOOP {
            let deferred = self.hands[seat.index()].count_of(Card::ToBeDetermined);
            for _ in 0..deferred {
                let card = pool.pop().expect("pool sized to the slot count");
                self.hands[seat.index()].remove(Card::ToBeDetermined);
                self.hands[seat.index()].add(card);
            }
        }
        Ok(())
    }

    /// Number of unresolved slots (pile positions plus drawn-but-deferred
    /// hand cards) a full sample must fill.
    pub fn unresolved_slots(&self) -> usize {
        let pile = (0..self.pile_size())
            .filter(|&i| self.draw_pile.nth(i).is_sentinel())
            .count();
        let hands: usize = Player::LOOP
            .iter()
            .map(|seat| self.hands[seat.index()].count_of(Card::ToBeDetermined) as usize)
            .sum();
        pile + hands
    }
}

fn resolve_drawn(card: Card) -> Card {
    if card == Card::Unknown {
        // The slot exists but nobody has resolved its identity yet; the
        // drawn card is determined at sampling time.
        Card::ToBeDetermined
    } else {
        card
    }
}

#[cfg(test)]
mod tests {
    use super::GameState;
    use crate::game::action::Action;
    use crate::model::card::Card;
    use crate::model::deck::deal_with_seed;
    use crate::model::player::Player;
    use crate::model::set::CardSet;
    use crate::model::stack::CardStack;

    fn small_state() -> GameState {
        let mut first = CardSet::from_cards(&[Card::Skip, Card::Peek]);
        first.add(Card::Defuse);
        let mut second = CardSet::from_cards(&[Card::Swipe, Card::Attack]);
        second.add(Card::Defuse);
        let pile = CardStack::from_cards(&[Card::Shuffle, Card::Kaboom, Card::Skip]);
        GameState::new(pile, first, second)
    }

    #[test]
    fn draw_moves_top_card_into_hand() {
        let mut state = small_state();
        let action = state.apply(Action::draw(Player::First), true).unwrap();
        assert_eq!(action.revealed[0], Card::Shuffle);
        assert_eq!(action.card, Card::Unknown);
        assert!(state.hand(Player::First).contains(Card::Shuffle));
        assert_eq!(state.pile_size(), 2);
        assert_eq!(state.pile_card(0), Card::Kaboom);
    }

    #[test]
    fn drawing_the_kaboom_is_written_back_into_the_action() {
        let mut state = small_state();
        state.apply(Action::draw(Player::First), true).unwrap();
        let action = state.apply(Action::draw(Player::First), true).unwrap();
        assert_eq!(action.card, Card::Kaboom);
        assert!(state.hand(Player::First).contains(Card::Kaboom));
    }

    #[test]
    fn peek_fills_disclosure_at_application_time() {
        let mut state = small_state();
        let action = state
            .apply(Action::play(Player::First, Card::Peek), true)
            .unwrap();
        assert_eq!(
            action.revealed,
            [Card::Shuffle, Card::Kaboom, Card::Skip]
        );
        assert!(!state.hand(Player::First).contains(Card::Peek));
        assert_eq!(state.pile_size(), 3);
    }

    #[test]
    fn bottom_draw_takes_the_last_card() {
        let first = CardSet::from_cards(&[Card::DrawFromBottom, Card::Defuse]);
        let second = CardSet::from_cards(&[Card::Swipe, Card::Defuse]);
        let pile = CardStack::from_cards(&[Card::Shuffle, Card::Kaboom, Card::Skip]);
        let mut state = GameState::new(pile, first, second);
        let action = state
            .apply(Action::play(Player::First, Card::DrawFromBottom), true)
            .unwrap();
        assert_eq!(action.revealed[0], Card::Skip);
        assert!(state.hand(Player::First).contains(Card::Skip));
        assert_eq!(state.pile_size(), 2);
        assert_eq!(state.pile_card(1), Card::Kaboom);
    }

    #[test]
    fn give_transfers_between_hands() {
        let mut state = small_state();
        state
            .apply(Action::give(Player::Second, Card::Attack), true)
            .unwrap();
        assert!(state.hand(Player::First).contains(Card::Attack));
        assert!(!state.hand(Player::Second).contains(Card::Attack));
    }

    #[test]
    fn insertion_restores_the_pile() {
        let mut state = small_state();
        state.apply(Action::draw(Player::First), true).unwrap();
        state.apply(Action::draw(Player::First), true).unwrap(); // the Kaboom
        state
            .apply(Action::play(Player::First, Card::Defuse), true)
            .unwrap();
        state
            .apply(Action::insert_kaboom(Player::First, 1), true)
            .unwrap();
        assert_eq!(state.pile_size(), 2);
        assert_eq!(state.pile_card(0), Card::Kaboom);
        assert!(!state.hand(Player::First).contains(Card::Kaboom));
    }

    #[test]
    fn unaccounted_covers_exactly_the_unresolved_slots() {
        let deal = deal_with_seed(11);
        let state = GameState::from_deal(&deal);
        // A fully concrete deal leaves nothing unaccounted.
        assert!(state.unaccounted().is_empty());
        assert_eq!(state.unresolved_slots(), 0);

        let hidden = GameState::with_unknown_pile(deal.hands[0], deal.hands[1], 13);
        let pool = hidden.unaccounted();
        assert_eq!(pool.len(), 13);
        assert_eq!(hidden.unresolved_slots(), 13);
        assert_eq!(pool.count_of(Card::Kaboom), 1);
    }

    #[test]
    fn drawing_an_unresolved_slot_defers_the_identity() {
        let deal = deal_with_seed(11);
        let mut state = GameState::with_unknown_pile(deal.hands[0], deal.hands[1], 13);
        let action = state.apply(Action::draw(Player::First), true).unwrap();
        assert_eq!(action.revealed[0], Card::ToBeDetermined);
        assert_eq!(state.hand(Player::First).count_of(Card::ToBeDetermined), 1);
        assert_eq!(state.unresolved_slots(), 13);
    }
}
