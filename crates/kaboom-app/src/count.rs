use anyhow::{Context, Result};
use kaboom_bot::SubtreePool;
use kaboom_core::belief::enumerate::distinct_shuffles;
use kaboom_core::tree::{GameTree, NodeId, NodeKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// A chance vertex above this many orderings is counted but not expanded;
/// enumerating an early 12-card shuffle would be billions of children.
const SHUFFLE_EXPANSION_LIMIT: u64 = 1_000;

#[derive(Debug, Default)]
struct Tally {
    player: AtomicU64,
    chance: AtomicU64,
    terminal: AtomicU64,
}

pub fn run(seed: u64, depth: usize, workers: usize) -> Result<()> {
    let mut tree = GameTree::random_game(seed);
    let root = tree.root();
    let tally = Arc::new(Tally::default());

    // Fan each root child out to the pool as an independent subtree; the
    // root itself is counted here.
    tally.player.fetch_add(1, Ordering::Relaxed);
    tree.build_children(root)
        .context("expanding the root node")?;
    let pool = SubtreePool::new(workers, workers * 2);
    for i in 0..tree.num_children(root).context("root children")? {
        let child = tree.child(root, i).context("root child")?;
        let subtree = tree.detach(child).context("detaching subtree")?;
        let tally = Arc::clone(&tally);
        pool.dispatch(subtree, move |mut subtree| {
            let root = subtree.root();
            if let Err(err) = count_subtree(&mut subtree, root, depth.saturating_sub(1), &tally) {
                tracing::error!(%err, "subtree walk aborted");
            }
        });
    }
    let inline = pool.inline_runs();
    pool.shutdown();

    let player = tally.player.load(Ordering::Relaxed);
    let chance = tally.chance.load(Ordering::Relaxed);
    let terminal = tally.terminal.load(Ordering::Relaxed);
    info!(inline_fallbacks = inline, "count complete");
    println!("player nodes:   {player}");
    println!("chance nodes:   {chance}");
    println!("terminal nodes: {terminal}");
    println!("total:          {}", player + chance + terminal);
    Ok(())
}

fn count_subtree(
    tree: &mut GameTree,
    node: NodeId,
    depth: usize,
    tally: &Tally,
) -> Result<(), kaboom_core::error::EngineError> {
    match tree.kind(node)? {
        NodeKind::Terminal => {
            tally.terminal.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        NodeKind::Chance => {
            tally.chance.fetch_add(1, Ordering::Relaxed);
            let state = tree.state(node)?;
            let mut pile = kaboom_core::model::set::CardSet::new();
            for i in 0..state.pile_size() {
                pile.add(state.pile_card(i));
            }
            if distinct_shuffles(pile) > SHUFFLE_EXPANSION_LIMIT || depth == 0 {
                return Ok(());
            }
        }
        NodeKind::Player => {
            tally.player.fetch_add(1, Ordering::Relaxed);
            if depth == 0 {
                return Ok(());
            }
        }
    }

    tree.build_children(node)?;
    for i in 0..tree.num_children(node)? {
        let child = tree.child(node, i)?;
        count_subtree(tree, child, depth - 1, tally)?;
    }
    tree.free_children(node)?;
    Ok(())
}
