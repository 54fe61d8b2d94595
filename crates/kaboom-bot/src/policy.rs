//! Concrete [`DecisionPolicy`] implementations.

use kaboom_core::policy::DecisionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Strategy table keyed by the opaque information-set bytes.
///
/// Unknown keys fall back to uniform play. The on-disk form is an opaque
/// byte blob produced and consumed only here; callers just move bytes.
#[derive(Debug, Clone, Default)]
pub struct TabularPolicy {
    table: HashMap<Vec<u8>, Vec<f64>>,
}

#[derive(Serialize, Deserialize)]
struct TableRow(Vec<u8>, Vec<f64>);

impl TabularPolicy {
    pub fn new() -> TabularPolicy {
        TabularPolicy::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Stores a distribution for a key, normalizing the weights.
    pub fn insert(&mut self, key: Vec<u8>, weights: Vec<f64>) {
        let total: f64 = weights.iter().copied().filter(|w| *w > 0.0).sum();
        let normalized = if total > 0.0 {
            weights
                .iter()
                .map(|w| if *w > 0.0 { w / total } else { 0.0 })
                .collect()
        } else if weights.is_empty() {
            weights
        } else {
            vec![1.0 / weights.len() as f64; weights.len()]
        };
        self.table.insert(key, normalized);
    }

    pub fn get(&self, key: &[u8]) -> Option<&[f64]> {
        self.table.get(key).map(Vec::as_slice)
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut rows: Vec<TableRow> = self
            .table
            .iter()
            .map(|(k, v)| TableRow(k.clone(), v.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        serde_json::to_vec(&rows).map_err(io::Error::other)
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<TabularPolicy> {
        let rows: Vec<TableRow> = serde_json::from_slice(bytes).map_err(io::Error::other)?;
        let mut policy = TabularPolicy::new();
        for TableRow(key, weights) in rows {
            policy.insert(key, weights);
        }
        Ok(policy)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_bytes()?)
    }

    pub fn load(path: &Path) -> io::Result<TabularPolicy> {
        TabularPolicy::from_bytes(&fs::read(path)?)
    }
}

impl DecisionPolicy for TabularPolicy {
    fn action_probabilities(&self, key: &[u8], num_actions: usize) -> Vec<f64> {
        match self.table.get(key) {
            Some(probs) if probs.len() == num_actions => probs.clone(),
            _ => {
                if num_actions == 0 {
                    Vec::new()
                } else {
                    vec![1.0 / num_actions as f64; num_actions]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TabularPolicy;
    use kaboom_core::policy::DecisionPolicy;

    #[test]
    fn stored_distributions_are_normalized() {
        let mut policy = TabularPolicy::new();
        policy.insert(b"key".to_vec(), vec![1.0, 3.0]);
        let probs = policy.action_probabilities(b"key", 2);
        assert!((probs[0] - 0.25).abs() < 1e-12);
        assert!((probs[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn unknown_keys_fall_back_to_uniform() {
        let policy = TabularPolicy::new();
        let probs = policy.action_probabilities(b"missing", 4);
        assert_eq!(probs, vec![0.25; 4]);
    }

    #[test]
    fn arity_mismatch_falls_back_to_uniform() {
        let mut policy = TabularPolicy::new();
        policy.insert(b"key".to_vec(), vec![0.5, 0.5]);
        let probs = policy.action_probabilities(b"key", 3);
        assert_eq!(probs.len(), 3);
    }

    #[test]
    fn blob_roundtrip_preserves_the_table() {
        let mut policy = TabularPolicy::new();
        policy.insert(vec![1, 2, 3], vec![0.5, 0.5]);
        policy.insert(vec![9], vec![1.0]);
        let bytes = policy.to_bytes().unwrap();
        let restored = TabularPolicy::from_bytes(&bytes).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(&[1, 2, 3]), policy.get(&[1, 2, 3]));
    }
}
