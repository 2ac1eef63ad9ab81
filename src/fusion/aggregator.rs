//! Weighted score aggregation over whichever inputs are available

use std::collections::BTreeMap;

/// Combines scores into a weighted mean.
///
/// Only the weights of the scores actually present enter the denominator,
/// so a missing input never drags the result toward zero: the remaining
/// weights are re-normalized to sum to 1. Scores are visited in key order,
/// which keeps the floating-point result independent of insertion order.
#[derive(Debug, Clone)]
pub struct ScoreAggregator<K: Ord> {
    /// Per-input weights
    weights: BTreeMap<K, f64>,
    /// Weight for inputs not in the weights map
    default_weight: f64,
}

impl<K: Ord> ScoreAggregator<K> {
    /// Create an aggregator with explicit weights; unknown inputs get no weight.
    pub fn new(weights: BTreeMap<K, f64>) -> Self {
        Self {
            weights,
            default_weight: 0.0,
        }
    }

    /// Create aggregator with equal weights for all inputs.
    pub fn equal_weights() -> Self {
        Self {
            weights: BTreeMap::new(),
            default_weight: 1.0,
        }
    }

    /// Configured weight for an input.
    pub fn weight_of(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(self.default_weight)
    }

    /// Aggregate scores into a single value in [0, 1].
    ///
    /// Returns `None` when there is nothing to aggregate or every present
    /// input has zero weight.
    pub fn aggregate(&self, scores: &BTreeMap<K, f64>) -> Option<f64> {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (key, &score) in scores {
            let weight = self.weight_of(key);
            weighted_sum += score * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            Some((weighted_sum / total_weight).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}
