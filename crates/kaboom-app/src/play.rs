use anyhow::{Context, Result, bail};
use kaboom_bot::TabularPolicy;
use kaboom_core::game::action::ActionKind;
use kaboom_core::game::info_set::InfoSet;
use kaboom_core::model::card::Card;
use kaboom_core::model::player::Player;
use kaboom_core::policy::DecisionPolicy;
use kaboom_core::tree::{GameTree, NodeId, NodeKind, TurnKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

const HUMAN: Player = Player::First;

pub fn run(seed: u64, strategy: Option<&Path>) -> Result<()> {
    let policy = match strategy {
        Some(path) => TabularPolicy::load(path)
            .with_context(|| format!("loading strategy from {}", path.display()))?,
        None => TabularPolicy::new(),
    };
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(0xdecaf));
    let mut tree = GameTree::random_game(seed);
    let mut node = tree.root();

    println!("You are {HUMAN}. The pile holds 13 cards, one of them the Kaboom.");
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        match tree.kind(node).context("inspecting node")? {
            NodeKind::Terminal => {
                let you = tree.utility(node, HUMAN).context("terminal utility")?;
                if you > 0.0 {
                    println!("The Kaboom went off across the table. You win.");
                } else {
                    println!("Boom. You lose.");
                }
                return Ok(());
            }
            NodeKind::Chance => {
                println!("The draw pile is shuffled.");
                tree.resolve_shuffle_in_place(node, &mut rng)
                    .context("resolving shuffle")?;
            }
            NodeKind::Player => {
                tree.build_children(node).context("expanding node")?;
                let actor = tree.acting_player(node).context("acting player")?;
                let chosen = if actor == HUMAN {
                    prompt_choice(&tree, node, &mut input)?
                } else {
                    bot_choice(&tree, node, &policy, &mut rng)?
                };
                describe_transition(&tree, node, chosen, actor)?;
                node = tree.child(node, chosen).context("descending")?;
            }
        }
    }
}

fn prompt_choice(
    tree: &GameTree,
    node: NodeId,
    input: &mut impl BufRead,
) -> Result<usize> {
    let view = tree.info_set(node, HUMAN).context("your view")?;
    print_view(tree, node, &view)?;

    let count = tree.num_children(node).context("child count")?;
    for i in 0..count {
        match tree.child_action(node, i).context("labeling action")? {
            Some(action) => println!("  [{i}] {action}"),
            None => println!("  [{i}] (chance)"),
        }
    }

    // Invalid input is re-prompted, never propagated.
    loop {
        print!("choice> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if input.read_line(&mut line).context("reading stdin")? == 0 {
            bail!("stdin closed mid-game");
        }
        match line.trim().parse::<usize>() {
            Ok(choice) if choice < count => return Ok(choice),
            _ => println!("enter a number between 0 and {}", count - 1),
        }
    }
}

fn bot_choice<R: Rng>(
    tree: &GameTree,
    node: NodeId,
    policy: &TabularPolicy,
    rng: &mut R,
) -> Result<usize> {
    let actor = tree.acting_player(node)?;
    let count = tree.num_children(node)?;
    let key = tree.info_set_key(node, actor)?;
    let probs = policy.action_probabilities(&key, count);
    let mut remaining = rng.gen_range(0.0..1.0);
    for (i, &p) in probs.iter().enumerate() {
        if remaining < p {
            debug!(choice = i, "engine move");
            return Ok(i);
        }
        remaining -= p;
    }
    Ok(count - 1)
}

fn print_view(tree: &GameTree, node: NodeId, view: &InfoSet) -> Result<()> {
    let turn = tree.turn(node)?;
    let pending = tree.pending_turns(node)?;
    let hand = view
        .hand
        .as_vec()
        .iter()
        .map(|card| card.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!();
    println!(
        "-- your hand: {hand} | opponent holds {} cards | pile: {} cards",
        view.opponent_hand.len(),
        view.draw_pile.len(),
    );
    if !view.known_pile.is_empty() {
        println!("-- known pile positions: {}", view.known_pile);
    }
    if turn == TurnKind::MustDefuse {
        println!("-- you must bury the Kaboom ({pending} turn(s) still pending)");
    } else if pending > 1 {
        println!("-- {pending} turns pending against you");
    }
    Ok(())
}

fn describe_transition(
    tree: &GameTree,
    node: NodeId,
    choice: usize,
    actor: Player,
) -> Result<()> {
    if let Some(action) = tree.child_action(node, choice)? {
        if actor == HUMAN {
            println!("you: {action}");
            match action.kind {
                ActionKind::DrawCard => println!("you drew: {}", action.revealed[0]),
                ActionKind::PlayCard if action.card == Card::Peek => {
                    println!(
                        "top of pile: {} {} {}",
                        action.revealed[0], action.revealed[1], action.revealed[2]
                    );
                }
                ActionKind::PlayCard if action.card == Card::DrawFromBottom => {
                    println!("from the bottom you drew: {}", action.revealed[0]);
                }
                _ => {}
            }
        } else {
            // Show only what the human is entitled to see.
            println!("engine: {}", action.censored(HUMAN));
        }
    }
    Ok(())
}
