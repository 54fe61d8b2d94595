use crate::model::card::Card;
use crate::model::set::CardSet;
use crate::model::stack::CardStack;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const fn packed(card: Card, count: u64) -> u64 {
    count << (5 * card.id() as u32)
}

/// The 20 shuffle-and-deal cards: neither Defuse nor the Kaboom itself.
pub const CORE_DECK: CardSet = CardSet::from_bits(
    packed(Card::Skip, 4)
        | packed(Card::Attack, 3)
        | packed(Card::DoubleAttack, 1)
        | packed(Card::Peek, 3)
        | packed(Card::Shuffle, 2)
        | packed(Card::DrawFromBottom, 3)
        | packed(Card::Swipe, 4),
);

/// Every physical card in play: the core deck, one Defuse per seat and the
/// single Kaboom.
pub const FULL_DECK: CardSet = CardSet::from_bits(
    CORE_DECK.to_bits() | packed(Card::Defuse, 2) | packed(Card::Kaboom, 1),
);

pub const HAND_DEAL: usize = 4;
pub const INITIAL_PILE: usize = 13;

/// A concrete initial deal: both five-card hands (Defuse included) and the
/// thirteen-card draw pile with the Kaboom inserted.
#[derive(Debug, Clone, Copy)]
pub struct Deal {
    pub hands: [CardSet; 2],
    pub draw_pile: CardStack,
}

pub fn deal<R: Rng + ?Sized>(rng: &mut R) -> Deal {
    let mut cards = CORE_DECK.as_vec();
    cards.shuffle(rng);

    let mut first = CardSet::from_cards(&cards[..HAND_DEAL]);
    first.add(Card::Defuse);
    let mut second = CardSet::from_cards(&cards[HAND_DEAL..2 * HAND_DEAL]);
    second.add(Card::Defuse);

    let mut draw_pile = CardStack::from_cards(&cards[2 * HAND_DEAL..]);
    let pile_len = cards.len() - 2 * HAND_DEAL;
    draw_pile.insert(rng.gen_range(0..=pile_len), Card::Kaboom);

    Deal {
        hands: [first, second],
        draw_pile,
    }
}

pub fn deal_with_seed(seed: u64) -> Deal {
    let mut rng = StdRng::seed_from_u64(seed);
    deal(&mut rng)
}

#[cfg(test)]
mod tests {
    use super::{CORE_DECK, FULL_DECK, INITIAL_PILE, deal_with_seed};
    use crate::model::card::Card;

    #[test]
    fn deck_sizes() {
        assert_eq!(CORE_DECK.len(), 20);
        assert_eq!(FULL_DECK.len(), 23);
        assert_eq!(FULL_DECK.count_of(Card::Kaboom), 1);
        assert_eq!(FULL_DECK.count_of(Card::Defuse), 2);
    }

    #[test]
    fn deal_is_deterministic_per_seed() {
        let a = deal_with_seed(42);
        let b = deal_with_seed(42);
        assert_eq!(a.hands[0], b.hands[0]);
        assert_eq!(a.hands[1], b.hands[1]);
        assert_eq!(a.draw_pile, b.draw_pile);
    }

    #[test]
    fn deal_accounts_for_every_card() {
        let deal = deal_with_seed(7);
        assert_eq!(deal.hands[0].len(), 5);
        assert_eq!(deal.hands[1].len(), 5);
        assert_eq!(deal.hands[0].count_of(Card::Defuse), 1);
        assert_eq!(deal.hands[1].count_of(Card::Defuse), 1);
        assert_eq!(deal.draw_pile.len(), INITIAL_PILE);

        let mut seen = deal.draw_pile.to_set();
        seen.add_all(deal.hands[0]);
        seen.add_all(deal.hands[1]);
        assert_eq!(seen, FULL_DECK);
    }
}
