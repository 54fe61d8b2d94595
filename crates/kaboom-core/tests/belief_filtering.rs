//! Belief-state updates against observed transitions.

use kaboom_core::belief::BeliefState;
use kaboom_core::game::action::Action;
use kaboom_core::game::info_set::InfoSet;
use kaboom_core::model::card::Card;
use kaboom_core::model::player::Player;
use kaboom_core::model::set::CardSet;
use kaboom_core::policy::UniformPolicy;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn own_core_deal() -> CardSet {
    CardSet::from_cards(&[Card::Skip, Card::Skip, Card::Peek, Card::Swipe])
}

fn initial_view(core_deal: CardSet) -> InfoSet {
    let mut hand = core_deal;
    hand.add(Card::Defuse);
    InfoSet::from_deal(hand)
}

#[test]
fn opponent_play_rejects_particles_without_the_card() {
    // Perspective: the second player, watching the first player open.
    let belief = BeliefState::from_own_deal(Player::Second, own_core_deal())
        .pruned(4)
        .unwrap();
    let examined: usize = belief.len();

    let mut observed = initial_view(own_core_deal());
    observed
        .observe(Action::play(Player::First, Card::Attack), Player::Second)
        .unwrap();

    let posterior = belief.observe(&observed, &UniformPolicy).unwrap();
    assert!(!posterior.is_empty());
    for particle in posterior.particles() {
        let tree = particle.tree();
        let root = tree.root();
        let state = tree.state(root).unwrap();
        // Survivors really did spend an Attack out of the candidate hand.
        let last = state.last_action().unwrap().decode().unwrap();
        assert_eq!(last.card, Card::Attack);
        assert_eq!(last.player, Player::First);
        // The exact-match filter: every survivor reproduces the observed
        // information set bit for bit.
        assert_eq!(state.info_set(Player::Second).unwrap(), observed);
        // Attack hands control to us with one extra pending turn owed.
        assert_eq!(tree.acting_player(root).unwrap(), Player::Second);
    }
    assert!(examined >= 1, "at least one parent particle was examined");
}

#[test]
fn own_action_reweights_with_certainty() {
    let belief = BeliefState::from_own_deal(Player::First, own_core_deal())
        .pruned(3)
        .unwrap();
    let prior_weights: Vec<f64> = belief.particles().iter().map(|p| p.weight()).collect();

    let mut observed = initial_view(own_core_deal());
    observed
        .observe(Action::play(Player::First, Card::Skip), Player::First)
        .unwrap();

    let posterior = belief.observe(&observed, &UniformPolicy).unwrap();
    assert!(!posterior.is_empty());
    for particle in posterior.particles() {
        // Our own choice carries probability 1: every survivor keeps the
        // weight of the particle it came from, with no policy discount.
        assert!(
            prior_weights.contains(&particle.weight()),
            "weight {} is not an undiscounted prior weight",
            particle.weight()
        );
        let tree = particle.tree();
        let state = tree.state(tree.root()).unwrap();
        assert_eq!(state.info_set(Player::First).unwrap(), observed);
    }
}

#[test]
fn observed_draw_pins_the_determinized_top() {
    let belief = BeliefState::from_own_deal(Player::First, own_core_deal())
        .pruned(3)
        .unwrap();

    let mut observed = initial_view(own_core_deal());
    let mut draw = Action::draw(Player::First);
    draw.revealed[0] = Card::Shuffle;
    observed.observe(draw, Player::First).unwrap();

    let posterior = belief.observe(&observed, &UniformPolicy).unwrap();
    assert!(!posterior.is_empty());
    for particle in posterior.particles() {
        let tree = particle.tree();
        let state = tree.state(tree.root()).unwrap();
        // Only determinizations that put a Shuffle on top survived.
        assert_eq!(state.hand(Player::First).count_of(Card::Shuffle), 1);
        assert_eq!(state.pile_size(), 12);
        assert_eq!(state.info_set(Player::First).unwrap(), observed);
    }
}

#[test]
fn posterior_samples_are_concrete_and_consistent() {
    let belief = BeliefState::from_own_deal(Player::First, own_core_deal())
        .pruned(3)
        .unwrap();

    let mut observed = initial_view(own_core_deal());
    let mut draw = Action::draw(Player::First);
    draw.revealed[0] = Card::Attack;
    observed.observe(draw, Player::First).unwrap();
    let posterior = belief.observe(&observed, &UniformPolicy).unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..4 {
        let tree = posterior.sample(&mut rng).unwrap();
        let state = tree.state(tree.root()).unwrap();
        assert_eq!(state.unresolved_slots(), 0);
        assert!(state.unaccounted().is_empty());
        assert!(state.hand(Player::First).contains(Card::Attack));
        // The sample agrees with everything we observed.
        assert_eq!(state.info_set(Player::First).unwrap(), observed);
    }
}

#[test]
fn rejecting_every_particle_reports_an_empty_belief() {
    // The three heaviest candidate deals all combine the three-copy kinds;
    // none of them holds the single DoubleAttack.
    let belief = BeliefState::from_own_deal(Player::Second, own_core_deal())
        .pruned(3)
        .unwrap();
    for particle in belief.particles() {
        let tree = particle.tree();
        let state = tree.state(tree.root()).unwrap();
        assert!(!state.hand(Player::First).contains(Card::DoubleAttack));
    }

    let mut observed = initial_view(own_core_deal());
    observed
        .observe(Action::play(Player::First, Card::DoubleAttack), Player::Second)
        .unwrap();

    let result = belief.observe(&observed, &UniformPolicy);
    assert!(matches!(
        result,
        Err(kaboom_core::error::EngineError::EmptyBelief)
    ));
}
