//! Injectable search counters.
//!
//! Callers that want observability allocate one [`SearchCounters`] block
//! and thread an `Arc` of it through the search; nothing here is ambient
//! process state.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SearchCounters {
    pub nodes_expanded: AtomicU64,
    pub playouts: AtomicU64,
    pub samples: AtomicU64,
    pub belief_updates: AtomicU64,
    pub particles_in: AtomicU64,
    pub particles_out: AtomicU64,
    pub inline_fallbacks: AtomicU64,
}

impl SearchCounters {
    pub fn shared() -> Arc<SearchCounters> {
        Arc::new(SearchCounters::default())
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            nodes_expanded: self.nodes_expanded.load(Ordering::Relaxed),
            playouts: self.playouts.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            belief_updates: self.belief_updates.load(Ordering::Relaxed),
            particles_in: self.particles_in.load(Ordering::Relaxed),
            particles_out: self.particles_out.load(Ordering::Relaxed),
            inline_fallbacks: self.inline_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub nodes_expanded: u64,
    pub playouts: u64,
    pub samples: u64,
    pub belief_updates: u64,
    pub particles_in: u64,
    pub particles_out: u64,
    pub inline_fallbacks: u64,
}
