/// Action-selection distribution supplied by whatever search or strategy
/// layer sits on top of the engine.
///
/// The engine itself never chooses actions; it only needs branch
/// probabilities when reweighting belief particles after an opponent
/// decision. Keys are the opaque bytes produced by
/// [`GameTree::info_set_key`](crate::tree::GameTree::info_set_key).
pub trait DecisionPolicy {
    /// Probability of each of the `num_actions` branches at the decision
    /// point identified by `key`. Must return a distribution (sums to 1).
    fn action_probabilities(&self, key: &[u8], num_actions: usize) -> Vec<f64>;
}

/// The no-information default: every branch equally likely.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPolicy;

impl DecisionPolicy for UniformPolicy {
    fn action_probabilities(&self, _key: &[u8], num_actions: usize) -> Vec<f64> {
        if num_actions == 0 {
            return Vec::new();
        }
        vec![1.0 / num_actions as f64; num_actions]
    }
}

#[cfg(test)]
mod tests {
    use super::{DecisionPolicy, UniformPolicy};

    #[test]
    fn uniform_policy_is_a_distribution() {
        let probs = UniformPolicy.action_probabilities(b"key", 4);
        assert_eq!(probs.len(), 4);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
