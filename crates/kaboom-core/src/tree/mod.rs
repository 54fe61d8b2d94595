//! The extensive-form game tree.
//!
//! Nodes live in an arena owned by their [`GameTree`]; handles are
//! generation-checked [`NodeId`]s, so touching a freed node is a detected
//! error instead of silent reuse. Traversal is single-owner and
//! depth-first: children are materialized lazily by
//! [`GameTree::build_children`], never recomputed once built, and handed
//! back to the pool with [`GameTree::free_children`]. A node that must
//! outlive its tree or cross a thread boundary is first
//! [`GameTree::detach`]ed into an independent tree with a fresh arena.

use crate::error::EngineError;
use crate::game::action::Action;
use crate::game::info_set::InfoSet;
use crate::game::serialization::InfoSetWithActions;
use crate::game::state::GameState;
use crate::belief::enumerate::{Shuffles, distinct_shuffles};
use crate::model::card::Card;
use crate::model::deck::{Deal, deal_with_seed};
use crate::model::player::Player;
use rand::Rng;
use rand::seq::SliceRandom;

/// Where the turn-structure state machine currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnKind {
    PlayTurn,
    GiveCard,
    ShuffleDrawPile,
    MustDefuse,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Player,
    Chance,
    Terminal,
}

impl TurnKind {
    pub const fn node_kind(self) -> NodeKind {
        match self {
            TurnKind::ShuffleDrawPile => NodeKind::Chance,
            TurnKind::GameOver => NodeKind::Terminal,
            _ => NodeKind::Player,
        }
    }
}

/// Generation-checked handle into a tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Node {
    state: GameState,
    player: Player,
    turn: TurnKind,
    pending_turns: u8,
    built: bool,
    children: Vec<NodeId>,
    probabilities: Vec<f64>,
}

impl Node {
    fn fresh(state: GameState, player: Player, turn: TurnKind, pending_turns: u8) -> Node {
        Node {
            state,
            player,
            turn,
            pending_turns,
            built: false,
            children: Vec::new(),
            probabilities: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-owning game tree rooted at one state.
#[derive(Debug)]
pub struct GameTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    child_pool: Vec<Vec<NodeId>>,
    prob_pool: Vec<Vec<f64>>,
    root: NodeId,
}

impl GameTree {
    /// Tree for a freshly dealt game; the first player always opens.
    pub fn new_game(deal: &Deal) -> GameTree {
        GameTree::with_root(
            GameState::from_deal(deal),
            Player::First,
            TurnKind::PlayTurn,
            1,
        )
    }

    pub fn random_game(seed: u64) -> GameTree {
        GameTree::new_game(&deal_with_seed(seed))
    }

    /// Tree rooted at an arbitrary state and machine position.
    pub fn with_root(
        state: GameState,
        player: Player,
        turn: TurnKind,
        pending_turns: u8,
    ) -> GameTree {
        GameTree {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::fresh(state, player, turn, pending_turns)),
            }],
            free: Vec::new(),
            child_pool: Vec::new(),
            prob_pool: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: NodeId) -> Result<&Node, EngineError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(EngineError::StaleHandle)
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, EngineError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(EngineError::StaleHandle)
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, EngineError> {
        Ok(self.get(id)?.turn.node_kind())
    }

    pub fn turn(&self, id: NodeId) -> Result<TurnKind, EngineError> {
        Ok(self.get(id)?.turn)
    }

    /// The player to act. Chance and terminal vertices have none; asking is
    /// a sign the caller's traversal has diverged, so it is an error.
    pub fn acting_player(&self, id: NodeId) -> Result<Player, EngineError> {
        let node = self.get(id)?;
        match node.turn.node_kind() {
            NodeKind::Player => Ok(node.player),
            _ => Err(EngineError::NoActingPlayer),
        }
    }

    pub(crate) fn seat(&self, id: NodeId) -> Result<Player, EngineError> {
        Ok(self.get(id)?.player)
    }

    pub fn pending_turns(&self, id: NodeId) -> Result<usize, EngineError> {
        Ok(self.get(id)?.pending_turns as usize)
    }

    pub fn state(&self, id: NodeId) -> Result<&GameState, EngineError> {
        Ok(&self.get(id)?.state)
    }

    pub(crate) fn state_mut(&mut self, id: NodeId) -> Result<&mut GameState, EngineError> {
        Ok(&mut self.get_mut(id)?.state)
    }

    /// Terminal utility for `player`: +1 for the winner, -1 for the loser.
    pub fn utility(&self, id: NodeId, player: Player) -> Result<f64, EngineError> {
        let node = self.get(id)?;
        if node.turn != TurnKind::GameOver {
            return Err(EngineError::NotATerminal);
        }
        Ok(if node.player == player { 1.0 } else { -1.0 })
    }

    pub fn info_set(&self, id: NodeId, player: Player) -> Result<InfoSet, EngineError> {
        self.get(id)?.state.info_set(player)
    }

    /// Opaque hashable key for the node's information set. For the acting
    /// player of a built decision node the key also carries the legal
    /// action list, which is what a strategy store indexes by.
    pub fn info_set_key(&self, id: NodeId, player: Player) -> Result<Vec<u8>, EngineError> {
        let node = self.get(id)?;
        let info_set = node.state.info_set(player)?;
        let actions = if node.built
            && node.turn.node_kind() == NodeKind::Player
            && node.player == player
        {
            // Keyed by what the actor could choose, not by what the
            // choices turned out to reveal.
            self.available_actions(id)?
                .into_iter()
                .map(Action::as_choice)
                .collect()
        } else {
            Vec::new()
        };
        Ok(InfoSetWithActions { info_set, actions }.to_bytes())
    }

    pub fn num_children(&self, id: NodeId) -> Result<usize, EngineError> {
        Ok(self.get(id)?.children.len())
    }

    pub fn child(&self, id: NodeId, index: usize) -> Result<NodeId, EngineError> {
        self.get(id)?
            .children
            .get(index)
            .copied()
            .ok_or(EngineError::ChildOutOfRange { index })
    }

    /// The action chosen to reach child `index`: the first entry the child
    /// appended to the log (a hazard draw also appends the forced Defuse
    /// behind it). `None` for a chance resolution, which is not an
    /// observable action.
    pub fn child_action(&self, id: NodeId, index: usize) -> Result<Option<Action>, EngineError> {
        let child_id = self.child(id, index)?;
        let parent_logged = self.get(id)?.state.history().len();
        let child = self.get(child_id)?;
        match child.state.history().get(parent_logged) {
            Some(encoded) => Ok(Some(encoded.decode()?)),
            None => Ok(None),
        }
    }

    /// The legal actions at a built decision node, in child order.
    pub fn available_actions(&self, id: NodeId) -> Result<Vec<Action>, EngineError> {
        let count = self.num_children(id)?;
        let mut actions = Vec::with_capacity(count);
        for i in 0..count {
            if let Some(action) = self.child_action(id, i)? {
                actions.push(action);
            }
        }
        Ok(actions)
    }

    pub fn chance_probability(&self, id: NodeId, index: usize) -> Result<f64, EngineError> {
        let node = self.get(id)?;
        if node.turn.node_kind() != NodeKind::Chance {
            return Err(EngineError::NotAChance);
        }
        node.probabilities
            .get(index)
            .copied()
            .ok_or(EngineError::ChildOutOfRange { index })
    }

    /// Samples one chance child by its probability.
    pub fn sample_chance_child<R: Rng + ?Sized>(
        &self,
        id: NodeId,
        rng: &mut R,
    ) -> Result<(NodeId, f64), EngineError> {
        let node = self.get(id)?;
        if node.turn.node_kind() != NodeKind::Chance {
            return Err(EngineError::NotAChance);
        }
        if node.children.is_empty() {
            return Err(EngineError::ChildOutOfRange { index: 0 });
        }
        let mut remaining = rng.gen_range(0.0..1.0);
        for (child, &probability) in node.children.iter().zip(&node.probabilities) {
            if remaining < probability {
                return Ok((*child, probability));
            }
            remaining -= probability;
        }
        let last = node.children.len() - 1;
        Ok((node.children[last], node.probabilities[last]))
    }

    /// Resolves a chance vertex in place by sampling one uniformly random
    /// ordering of the pile, without materializing the permutation
    /// children. Sampling a uniform permutation draws from exactly the
    /// distribution the enumerated children would carry, so simulation
    /// walks use this instead of [`GameTree::build_children`].
    pub fn resolve_shuffle_in_place<R: Rng + ?Sized>(
        &mut self,
        id: NodeId,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        let node = self.get(id)?;
        if node.turn != TurnKind::ShuffleDrawPile {
            return Err(EngineError::NotAChance);
        }
        let state = node.state;
        let mut cards: Vec<Card> = (0..state.pile_size()).map(|i| state.pile_card(i)).collect();
        cards.shuffle(rng);
        let node = self.get_mut(id)?;
        node.state
            .apply_shuffle(crate::model::stack::CardStack::from_cards(&cards));
        node.turn = TurnKind::PlayTurn;
        Ok(())
    }

    /// Independent deep copy of one node, backed by a fresh arena. The copy
    /// shares nothing with this tree and is safe to hand to another thread;
    /// its children start unbuilt.
    pub fn detach(&self, id: NodeId) -> Result<GameTree, EngineError> {
        let node = self.get(id)?;
        Ok(GameTree::with_root(
            node.state,
            node.player,
            node.turn,
            node.pending_turns,
        ))
    }

    /// Materializes the node's one-ply children. Idempotent; terminal
    /// nodes build to zero children.
    pub fn build_children(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.get(id)?;
        if node.built {
            return Ok(());
        }
        let turn = node.turn;
        match turn {
            TurnKind::PlayTurn => self.build_play_turn(id),
            TurnKind::GiveCard => self.build_give_card(id),
            TurnKind::ShuffleDrawPile => self.build_shuffle(id),
            TurnKind::MustDefuse => self.build_must_defuse(id),
            TurnKind::GameOver => {
                self.get_mut(id)?.built = true;
                Ok(())
            }
        }
    }

    /// Returns the node's entire subtree of children to the pool. Any
    /// handle into that subtree becomes stale.
    pub fn free_children(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.get_mut(id)?;
        let children = std::mem::take(&mut node.children);
        let probabilities = std::mem::take(&mut node.probabilities);
        node.built = false;
        self.recycle_probs(probabilities);

        let mut pending = children;
        while let Some(child) = pending.pop() {
            let slot = &mut self.slots[child.index as usize];
            debug_assert_eq!(slot.generation, child.generation);
            if let Some(freed) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(child.index);
                pending.extend(freed.children);
                self.recycle_probs(freed.probabilities);
            }
        }
        self.recycle_children(pending);
        Ok(())
    }

    /// Scoped teardown for a node that is permanently done with: frees its
    /// subtree and the node itself.
    pub fn release(&mut self, id: NodeId) -> Result<(), EngineError> {
        self.free_children(id)?;
        let slot = &mut self.slots[id.index as usize];
        if slot.generation == id.generation && slot.node.is_some() {
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    fn take_children(&mut self) -> Vec<NodeId> {
        self.child_pool.pop().unwrap_or_default()
    }

    fn take_probs(&mut self) -> Vec<f64> {
        self.prob_pool.pop().unwrap_or_default()
    }

    fn recycle_children(&mut self, mut vec: Vec<NodeId>) {
        if vec.capacity() > 0 {
            vec.clear();
            self.child_pool.push(vec);
        }
    }

    fn recycle_probs(&mut self, mut vec: Vec<f64>) {
        if vec.capacity() > 0 {
            vec.clear();
            self.prob_pool.push(vec);
        }
    }

    fn build_play_turn(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.get(id)?;
        let state = node.state;
        let player = node.player;
        let pending = node.pending_turns as i32;
        let hand = state.hand(player);

        let mut children = self.take_children();
        for (card, _) in hand.iter() {
            let mut child = Node::fresh(state, player, TurnKind::PlayTurn, 1);
            child.state.apply(Action::play(player, card), true)?;
            match card {
                Card::Defuse | Card::Peek => advance_turn(&mut child, player, pending)?,
                Card::Skip => advance_turn(&mut child, player, pending - 1)?,
                Card::DrawFromBottom => after_draw(&mut child, player, pending)?,
                Card::Shuffle => {
                    child.player = player;
                    child.turn = TurnKind::ShuffleDrawPile;
                    child.pending_turns = pending as u8;
                }
                Card::Attack | Card::DoubleAttack => {
                    let mut owed = card.attack_value() as i32;
                    if state.last_action_was_attack() {
                        // Attack-back: the new obligation stacks on top of
                        // the turns already pending against us.
                        owed += pending;
                    }
                    advance_turn(&mut child, player.opponent(), owed)?;
                }
                Card::Swipe => {
                    if child.state.hand(player.opponent()).is_empty() {
                        // Nothing to take; the card is spent for no effect.
                        advance_turn(&mut child, player, pending)?;
                    } else {
                        child.player = player.opponent();
                        child.turn = TurnKind::GiveCard;
                        child.pending_turns = pending as u8;
                    }
                }
                other => return Err(EngineError::UnsupportedCard { card: other }),
            }
            let child_id = self.alloc(child);
            children.push(child_id);
        }

        // End the turn by drawing the top card.
        let mut child = Node::fresh(state, player, TurnKind::PlayTurn, 1);
        child.state.apply(Action::draw(player), true)?;
        after_draw(&mut child, player, pending)?;
        let child_id = self.alloc(child);
        children.push(child_id);

        let node = self.get_mut(id)?;
        node.children = children;
        node.built = true;
        Ok(())
    }

    fn build_give_card(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.get(id)?;
        let state = node.state;
        let giver = node.player;
        let pending = node.pending_turns as i32;

        let mut children = self.take_children();
        for (card, _) in state.hand(giver).iter() {
            let mut child = Node::fresh(state, giver, TurnKind::PlayTurn, 1);
            child.state.apply(Action::give(giver, card), true)?;
            // Play returns to the swiper with their pending turns intact.
            advance_turn(&mut child, giver.opponent(), pending)?;
            let child_id = self.alloc(child);
            children.push(child_id);
        }

        let node = self.get_mut(id)?;
        node.children = children;
        node.built = true;
        Ok(())
    }

    fn build_shuffle(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.get(id)?;
        let state = node.state;
        let player = node.player;
        let pending = node.pending_turns;

        let mut pile = crate::model::set::CardSet::new();
        for i in 0..state.pile_size() {
            pile.add(state.pile_card(i));
        }
        let orderings = distinct_shuffles(pile);
        let probability = 1.0 / orderings as f64;

        let mut children = self.take_children();
        let mut probabilities = self.take_probs();
        for ordering in Shuffles::new(pile) {
            let mut child = Node::fresh(state, player, TurnKind::PlayTurn, pending);
            child.state.apply_shuffle(ordering);
            let child_id = self.alloc(child);
            children.push(child_id);
            probabilities.push(probability);
        }
        debug_assert_eq!(children.len() as u64, orderings);

        let node = self.get_mut(id)?;
        node.children = children;
        node.probabilities = probabilities;
        node.built = true;
        Ok(())
    }

    fn build_must_defuse(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.get(id)?;
        let state = node.state;
        let player = node.player;
        let pending = node.pending_turns as i32;
        let pile_size = state.pile_size();

        let mut children = self.take_children();
        // An empty pile still takes the card back (sole slot); otherwise
        // up to five near-top slots.
        let near_top = pile_size.min(5).max(1);
        for slot in 0..near_top {
            let mut child = Node::fresh(state, player, TurnKind::PlayTurn, 1);
            child
                .state
                .apply(Action::insert_kaboom(player, slot as u8 + 1), true)?;
            // Burying the Kaboom ends a turn.
            advance_turn(&mut child, player, pending - 1)?;
            let child_id = self.alloc(child);
            children.push(child_id);
        }

        // The very bottom is offered only when it is distinguishable from
        // the near-top slots.
        if pile_size > 5 {
            let mut child = Node::fresh(state, player, TurnKind::PlayTurn, 1);
            child
                .state
                .apply(Action::insert_kaboom(player, pile_size as u8 + 1), true)?;
            advance_turn(&mut child, player, pending - 1)?;
            let child_id = self.alloc(child);
            children.push(child_id);
        }

        let node = self.get_mut(id)?;
        node.children = children;
        node.built = true;
        Ok(())
    }
}

/// Settles a node after a draw: the hazard forces a defuse (or ends the
/// game) without consuming a pending turn; a clean draw consumes one.
fn after_draw(node: &mut Node, player: Player, pending: i32) -> Result<(), EngineError> {
    if node.state.hand(player).contains(Card::Kaboom) {
        defuse_or_lose(node, player, pending)
    } else {
        advance_turn(node, player, pending - 1)
    }
}

/// Hands the node to whoever plays next, passing control to the opponent
/// with one fresh turn once the pending count is spent.
fn advance_turn(node: &mut Node, player: Player, pending: i32) -> Result<(), EngineError> {
    if node.state.hand(player).contains(Card::Kaboom) {
        return defuse_or_lose(node, player, pending);
    }
    let (player, pending) = if pending <= 0 {
        (player.opponent(), 1)
    } else {
        (player, pending)
    };
    node.player = player;
    node.turn = TurnKind::PlayTurn;
    node.pending_turns = pending as u8;
    Ok(())
}

fn defuse_or_lose(node: &mut Node, player: Player, pending: i32) -> Result<(), EngineError> {
    if node.state.hand(player).contains(Card::Defuse) {
        node.player = player;
        node.turn = TurnKind::MustDefuse;
        node.pending_turns = pending.max(1) as u8;
        // The defuse play is forced and immediate.
        node.state.apply(Action::play(player, Card::Defuse), true)?;
    } else {
        node.player = player.opponent();
        node.turn = TurnKind::GameOver;
        node.pending_turns = 0;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{GameTree, NodeKind, TurnKind};
    use crate::error::EngineError;
    use crate::model::card::Card;
    use crate::model::player::Player;
    use crate::model::set::CardSet;
    use crate::model::stack::CardStack;
    use crate::game::state::GameState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn hand(cards: &[Card]) -> CardSet {
        CardSet::from_cards(cards)
    }

    fn tree_with(
        pile: &[Card],
        first: &[Card],
        second: &[Card],
        player: Player,
        pending: u8,
    ) -> GameTree {
        let state = GameState::new(CardStack::from_cards(pile), hand(first), hand(second));
        GameTree::with_root(state, player, TurnKind::PlayTurn, pending)
    }

    #[test]
    fn play_turn_offers_each_kind_plus_the_draw() {
        let mut tree = tree_with(
            &[Card::Skip, Card::Kaboom, Card::Peek],
            &[Card::Skip, Card::Skip, Card::Defuse],
            &[Card::Swipe, Card::Defuse],
            Player::First,
            1,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        // Two distinct kinds in hand plus the end-of-turn draw.
        assert_eq!(tree.num_children(root).unwrap(), 3);
        // Idempotent.
        tree.build_children(root).unwrap();
        assert_eq!(tree.num_children(root).unwrap(), 3);
    }

    #[test]
    fn skip_passes_the_turn_without_drawing() {
        let mut tree = tree_with(
            &[Card::Peek, Card::Kaboom],
            &[Card::Skip, Card::Defuse],
            &[Card::Swipe, Card::Defuse],
            Player::First,
            1,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        let skip_child = tree.child(root, 1).unwrap(); // Defuse sorts first
        assert_eq!(tree.acting_player(skip_child).unwrap(), Player::Second);
        assert_eq!(tree.pending_turns(skip_child).unwrap(), 1);
        assert_eq!(tree.state(skip_child).unwrap().pile_size(), 2);
    }

    #[test]
    fn hazard_draw_forces_the_defuse_without_spending_a_turn() {
        let mut tree = tree_with(
            &[Card::Kaboom, Card::Peek],
            &[Card::Skip, Card::Defuse],
            &[Card::Swipe, Card::Defuse],
            Player::First,
            2,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        let draw_child = tree.child(root, 2).unwrap();
        assert_eq!(tree.turn(draw_child).unwrap(), TurnKind::MustDefuse);
        assert_eq!(tree.acting_player(draw_child).unwrap(), Player::First);
        // The hazard interrupted the turn; both pending turns survive.
        assert_eq!(tree.pending_turns(draw_child).unwrap(), 2);
        // The forced Defuse is already played.
        assert!(
            !tree
                .state(draw_child)
                .unwrap()
                .hand(Player::First)
                .contains(Card::Defuse)
        );
    }

    #[test]
    fn hazard_draw_without_defuse_ends_the_game() {
        let mut tree = tree_with(
            &[Card::Kaboom, Card::Peek],
            &[Card::Skip],
            &[Card::Swipe, Card::Defuse],
            Player::First,
            1,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        let draw_child = tree.child(root, 1).unwrap();
        assert_eq!(tree.kind(draw_child).unwrap(), NodeKind::Terminal);
        assert_eq!(tree.utility(draw_child, Player::Second).unwrap(), 1.0);
        assert_eq!(tree.utility(draw_child, Player::First).unwrap(), -1.0);
        assert_eq!(
            tree.utility(root, Player::First),
            Err(EngineError::NotATerminal)
        );
    }

    #[test]
    fn must_defuse_offers_near_top_slots_and_conditional_bottom() {
        for (pile_size, expected) in [(0usize, 1usize), (2, 2), (5, 5), (6, 6), (9, 6)] {
            let mut pile = vec![Card::Peek; pile_size];
            if let Some(top) = pile.first_mut() {
                *top = Card::Skip;
            }
            let state = GameState::new(
                CardStack::from_cards(&pile),
                hand(&[Card::Kaboom]),
                hand(&[Card::Swipe]),
            );
            let mut tree = GameTree::with_root(state, Player::First, TurnKind::MustDefuse, 1);
            let root = tree.root();
            tree.build_children(root).unwrap();
            assert_eq!(
                tree.num_children(root).unwrap(),
                expected,
                "pile of {pile_size}"
            );
            for i in 0..expected {
                let child = tree.child(root, i).unwrap();
                assert_eq!(tree.turn(child).unwrap(), TurnKind::PlayTurn);
                assert_eq!(tree.acting_player(child).unwrap(), Player::Second);
                assert_eq!(
                    tree.state(child).unwrap().pile_size(),
                    pile_size + 1,
                    "pile restored"
                );
            }
        }
    }

    #[test]
    fn shuffle_children_cover_distinct_orderings_with_equal_probability() {
        let state = GameState::new(
            CardStack::from_cards(&[Card::Skip, Card::Skip, Card::Peek]),
            hand(&[Card::Defuse]),
            hand(&[Card::Swipe]),
        );
        let mut tree = GameTree::with_root(state, Player::First, TurnKind::ShuffleDrawPile, 1);
        let root = tree.root();
        tree.build_children(root).unwrap();
        assert_eq!(tree.kind(root).unwrap(), NodeKind::Chance);
        assert_eq!(tree.num_children(root).unwrap(), 3);
        let mut total = 0.0;
        for i in 0..3 {
            let p = tree.chance_probability(root, i).unwrap();
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
            total += p;
        }
        assert!((total - 1.0).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(3);
        let (sampled, p) = tree.sample_chance_child(root, &mut rng).unwrap();
        assert!((p - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(tree.turn(sampled).unwrap(), TurnKind::PlayTurn);
        assert_eq!(tree.chance_probability(tree.root(), 5), Err(EngineError::ChildOutOfRange { index: 5 }));
    }

    #[test]
    fn shuffle_can_be_sampled_in_place() {
        let state = GameState::new(
            CardStack::from_cards(&[Card::Skip, Card::Peek, Card::Swipe, Card::Kaboom]),
            hand(&[Card::Defuse]),
            hand(&[Card::Swipe]),
        );
        let mut tree = GameTree::with_root(state, Player::Second, TurnKind::ShuffleDrawPile, 2);
        let root = tree.root();
        let mut rng = StdRng::seed_from_u64(8);
        tree.resolve_shuffle_in_place(root, &mut rng).unwrap();
        assert_eq!(tree.turn(root).unwrap(), TurnKind::PlayTurn);
        assert_eq!(tree.acting_player(root).unwrap(), Player::Second);
        assert_eq!(tree.pending_turns(root).unwrap(), 2);
        let shuffled = tree.state(root).unwrap();
        assert_eq!(shuffled.pile_size(), 4);
        assert_eq!(shuffled.draw_pile().to_set(), state.draw_pile().to_set());
        assert_eq!(
            tree.resolve_shuffle_in_place(root, &mut rng),
            Err(EngineError::NotAChance)
        );
    }

    #[test]
    fn acting_player_of_a_chance_vertex_is_an_error() {
        let state = GameState::new(
            CardStack::from_cards(&[Card::Skip]),
            hand(&[Card::Defuse]),
            hand(&[Card::Swipe]),
        );
        let tree = GameTree::with_root(state, Player::First, TurnKind::ShuffleDrawPile, 1);
        assert_eq!(
            tree.acting_player(tree.root()),
            Err(EngineError::NoActingPlayer)
        );
    }

    #[test]
    fn swipe_against_an_empty_hand_is_a_noop() {
        let mut tree = tree_with(
            &[Card::Peek, Card::Kaboom],
            &[Card::Swipe],
            &[],
            Player::First,
            1,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        let swipe_child = tree.child(root, 0).unwrap();
        assert_eq!(tree.turn(swipe_child).unwrap(), TurnKind::PlayTurn);
        assert_eq!(tree.acting_player(swipe_child).unwrap(), Player::First);
        assert_eq!(tree.pending_turns(swipe_child).unwrap(), 1);
    }

    #[test]
    fn swipe_forces_a_give_and_play_returns_to_the_swiper() {
        let mut tree = tree_with(
            &[Card::Peek, Card::Kaboom],
            &[Card::Swipe],
            &[Card::Skip, Card::Attack],
            Player::First,
            1,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        let give_node = tree.child(root, 0).unwrap();
        assert_eq!(tree.turn(give_node).unwrap(), TurnKind::GiveCard);
        assert_eq!(tree.acting_player(give_node).unwrap(), Player::Second);

        let mut tree2 = tree.detach(give_node).unwrap();
        let give_root = tree2.root();
        tree2.build_children(give_root).unwrap();
        assert_eq!(tree2.num_children(give_root).unwrap(), 2);
        let gave = tree2.child(give_root, 0).unwrap();
        assert_eq!(tree2.acting_player(gave).unwrap(), Player::First);
        assert!(tree2.state(gave).unwrap().hand(Player::First).len() > 0);
    }

    #[test]
    fn attack_chain_stacks_three_deep() {
        // P0 attacks, P1 attacks back, P0 attacks back again: the final
        // obligation accumulates additively each time.
        let mut tree = tree_with(
            &[Card::Peek, Card::Kaboom, Card::Skip],
            &[Card::Attack, Card::Attack],
            &[Card::Attack, Card::DoubleAttack],
            Player::First,
            1,
        );
        let root = tree.root();
        tree.build_children(root).unwrap();
        let first_attack = tree.child(root, 0).unwrap();
        assert_eq!(tree.acting_player(first_attack).unwrap(), Player::Second);
        assert_eq!(tree.pending_turns(first_attack).unwrap(), 1);

        let mut second = tree.detach(first_attack).unwrap();
        let root2 = second.root();
        second.build_children(root2).unwrap();
        // P1 slaps back with the DoubleAttack: 2 + the 1 pending = 3.
        let counter = second.child(root2, 1).unwrap();
        assert_eq!(second.acting_player(counter).unwrap(), Player::First);
        assert_eq!(second.pending_turns(counter).unwrap(), 3);

        let mut third = second.detach(counter).unwrap();
        let root3 = third.root();
        third.build_children(root3).unwrap();
        // P0 slaps back again: 1 + the 3 pending = 4 on P1.
        let counter2 = third.child(root3, 0).unwrap();
        assert_eq!(third.acting_player(counter2).unwrap(), Player::Second);
        assert_eq!(third.pending_turns(counter2).unwrap(), 4);
    }

    #[test]
    fn freed_children_leave_stale_handles_and_reusable_slots() {
        let mut tree = GameTree::random_game(9);
        let root = tree.root();
        tree.build_children(root).unwrap();
        let child = tree.child(root, 0).unwrap();
        let before = tree.len();
        tree.free_children(root).unwrap();
        assert_eq!(tree.state(child), Err(EngineError::StaleHandle));
        assert_eq!(tree.num_children(root).unwrap(), 0);
        assert_eq!(tree.len(), 1);

        // Rebuilding reuses pooled slots instead of growing the arena.
        tree.build_children(root).unwrap();
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn detached_copy_is_independent_of_the_source_pool() {
        let mut tree = GameTree::random_game(21);
        let root = tree.root();
        tree.build_children(root).unwrap();
        let child = tree.child(root, 0).unwrap();
        let mut copy = tree.detach(child).unwrap();
        tree.free_children(root).unwrap();

        let copy_root = copy.root();
        copy.build_children(copy_root).unwrap();
        assert!(copy.num_children(copy_root).unwrap() > 0);
        copy.release(copy_root).unwrap();
        assert!(copy.is_empty());
    }
}
