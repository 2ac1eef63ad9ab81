//! Fusion of partial provider signals into a single verdict

use crate::config::{ActionTable, FusionConfig};
use crate::fusion::aggregator::ScoreAggregator;
use crate::types::signal::{ProviderKind, SignalResult};
use crate::types::transaction::Transaction;
use crate::types::verdict::{FraudType, RiskTier, RiskTierThresholds, Verdict};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Reason given when no weighted signal is available.
pub const INSUFFICIENT_SIGNAL_DATA: &str = "insufficient signal data";

/// Combines provider signals into a calibrated verdict.
///
/// `fuse` is a pure function of its inputs and the configuration: no I/O,
/// no clock, no randomness.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    aggregator: ScoreAggregator<ProviderKind>,
    fraud_threshold: f64,
    risk_tiers: RiskTierThresholds,
    actions: ActionTable,
    compliance_boost: f64,
}

/// A reason together with the ranking key of the signal that produced it
struct RankedReason<'a> {
    probability: f64,
    weight: f64,
    provider: ProviderKind,
    text: &'a str,
}

impl FusionEngine {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            aggregator: ScoreAggregator::new(config.weights.to_map()),
            fraud_threshold: config.fraud_threshold,
            risk_tiers: config.risk_tiers.clone(),
            actions: config.actions.clone(),
            compliance_boost: config.compliance_boost,
        }
    }

    /// Fuse zero or more signals for `transaction` into a verdict.
    pub fn fuse(&self, transaction: &Transaction, signals: &[SignalResult]) -> Verdict {
        // Canonical order first, so nothing downstream depends on input order.
        let mut available: Vec<&SignalResult> =
            signals.iter().filter(|s| s.is_available()).collect();
        available.sort_by(|a, b| {
            a.provider
                .cmp(&b.provider)
                .then_with(|| cmp_desc(a.score(), b.score()))
        });

        // A provider reporting twice counts once, with its highest estimate.
        let mut scores: BTreeMap<ProviderKind, f64> = BTreeMap::new();
        for signal in &available {
            if let Some(p) = signal.score() {
                scores
                    .entry(signal.provider)
                    .and_modify(|s| *s = s.max(p))
                    .or_insert(p);
            }
        }

        let unavailable: Vec<ProviderKind> = ProviderKind::ALL
            .into_iter()
            .filter(|p| !scores.contains_key(p))
            .collect();

        let Some(weighted_mean) = self.aggregator.aggregate(&scores) else {
            debug!(
                transaction_id = %transaction.transaction_id,
                "No weighted signal available, failing closed"
            );
            return self.insufficient_data(transaction, scores, unavailable);
        };

        let confidence = if available.iter().any(|s| s.requires_sar_filing()) {
            (weighted_mean + self.compliance_boost).min(1.0)
        } else {
            weighted_mean
        };

        let is_fraud = confidence >= self.fraud_threshold;
        let risk_tier = RiskTier::from_confidence(confidence, &self.risk_tiers);

        let mut reasons = self.rank_reasons(&available);
        reasons.extend(
            unavailable
                .iter()
                .map(|p| format!("{p} signal unavailable")),
        );

        let fraud_type = dominant_fraud_type(&available).unwrap_or(if is_fraud {
            FraudType::CardFraud
        } else {
            FraudType::Unknown
        });

        debug!(
            transaction_id = %transaction.transaction_id,
            confidence = confidence,
            risk_tier = %risk_tier,
            signals = scores.len(),
            "Signals fused"
        );

        Verdict {
            transaction_id: transaction.transaction_id.clone(),
            is_fraud,
            confidence,
            risk_tier,
            fraud_type,
            reasons,
            recommended_actions: self.actions.for_tier(risk_tier).to_vec(),
            signal_scores: scores,
            unavailable_providers: unavailable,
            case_id: None,
        }
    }

    fn insufficient_data(
        &self,
        transaction: &Transaction,
        scores: BTreeMap<ProviderKind, f64>,
        unavailable: Vec<ProviderKind>,
    ) -> Verdict {
        Verdict {
            transaction_id: transaction.transaction_id.clone(),
            is_fraud: false,
            confidence: 0.0,
            risk_tier: RiskTier::Low,
            fraud_type: FraudType::Unknown,
            reasons: vec![INSUFFICIENT_SIGNAL_DATA.to_string()],
            recommended_actions: self.actions.for_tier(RiskTier::Low).to_vec(),
            signal_scores: scores,
            unavailable_providers: unavailable,
            case_id: None,
        }
    }

    /// Pool reasons, drop exact duplicates and order them by the source
    /// signal's probability, then provider weight, then provider order.
    fn rank_reasons(&self, available: &[&SignalResult]) -> Vec<String> {
        let mut ranked: Vec<RankedReason<'_>> = available
            .iter()
            .flat_map(|signal| {
                let probability = signal.score().unwrap_or(0.0);
                let weight = self.aggregator.weight_of(&signal.provider);
                signal.reasons.iter().map(move |text| RankedReason {
                    probability,
                    weight,
                    provider: signal.provider,
                    text,
                })
            })
            .collect();

        // Stable: a signal's own reasons keep their order.
        ranked.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| b.weight.total_cmp(&a.weight))
                .then_with(|| a.provider.cmp(&b.provider))
        });

        let mut seen = HashSet::new();
        ranked
            .into_iter()
            .filter(|r| seen.insert(r.text))
            .map(|r| r.text.to_string())
            .collect()
    }
}

fn cmp_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.unwrap_or(0.0).total_cmp(&a.unwrap_or(0.0))
}

/// Most common known fraud type among similarity matches; ties go to the
/// type listed first in [`FraudType`].
fn dominant_fraud_type(available: &[&SignalResult]) -> Option<FraudType> {
    let mut counts: BTreeMap<FraudType, usize> = BTreeMap::new();
    for m in available.iter().flat_map(|s| s.similar_matches()) {
        if m.fraud_type != FraudType::Unknown {
            *counts.entry(m.fraud_type).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .fold(None, |best: Option<(FraudType, usize)>, (ft, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((ft, n)),
        })
        .map(|(ft, _)| ft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderWeights;
    use crate::types::signal::{SignalMetadata, SimilarMatch};

    const EPS: f64 = 1e-9;

    fn engine() -> FusionEngine {
        FusionEngine::new(&FusionConfig::default())
    }

    fn transaction() -> Transaction {
        Transaction::new("tx_15000", "user_1", 15_000.0).with_timestamp("2025-11-12T03:00:00Z")
    }

    fn signal(provider: ProviderKind, p: f64, reasons: &[&str]) -> SignalResult {
        SignalResult::available(provider, p).with_reasons(reasons.iter().copied())
    }

    fn similar(pattern_id: &str, fraud_type: FraudType, score: f64) -> SimilarMatch {
        SimilarMatch {
            pattern_id: pattern_id.to_string(),
            fraud_type,
            description: format!("pattern {pattern_id}"),
            similarity_score: score,
        }
    }

    #[test]
    fn test_single_ensemble_signal_renormalized() {
        let verdict = engine().fuse(
            &transaction(),
            &[signal(ProviderKind::EnsembleInference, 0.89, &["Unusual transaction amount"])],
        );

        assert!((verdict.confidence - 0.89).abs() < EPS);
        assert!(verdict.is_fraud);
        assert_eq!(verdict.risk_tier, RiskTier::Critical);
        assert!(verdict
            .recommended_actions
            .contains(&"block transaction".to_string()));
        assert_eq!(verdict.reasons[0], "Unusual transaction amount");
        assert_eq!(verdict.unavailable_providers.len(), 3);
    }

    #[test]
    fn test_two_signals_medium() {
        let verdict = engine().fuse(
            &transaction(),
            &[
                signal(ProviderKind::PatternAnomaly, 0.40, &[]),
                signal(ProviderKind::SimilaritySearch, 0.20, &[]),
            ],
        );

        // 0.40*0.60 + 0.20*0.40
        assert!((verdict.confidence - 0.32).abs() < EPS);
        assert_eq!(verdict.risk_tier, RiskTier::Medium);
        assert!(!verdict.is_fraud);
        assert_eq!(verdict.recommended_actions, ["flag for monitoring".to_string()]);
    }

    #[test]
    fn test_zero_signals_fail_closed() {
        let verdict = engine().fuse(&transaction(), &[]);

        assert!(!verdict.is_fraud);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.risk_tier, RiskTier::Low);
        assert_eq!(verdict.reasons, [INSUFFICIENT_SIGNAL_DATA.to_string()]);
        assert_eq!(verdict.unavailable_providers, ProviderKind::ALL.to_vec());
    }

    #[test]
    fn test_all_unavailable_signals_fail_closed() {
        let signals: Vec<SignalResult> = ProviderKind::ALL
            .into_iter()
            .map(SignalResult::unavailable)
            .collect();
        let verdict = engine().fuse(&transaction(), &signals);

        assert_eq!(verdict.confidence, 0.0);
        assert!(!verdict.is_fraud);
        assert_eq!(verdict.risk_tier, RiskTier::Low);
        assert_eq!(verdict.reasons, [INSUFFICIENT_SIGNAL_DATA.to_string()]);
    }

    #[test]
    fn test_zero_weight_signals_fail_closed() {
        let mut config = FusionConfig::default();
        config.weights = ProviderWeights {
            ensemble_inference: 1.0,
            pattern_anomaly: 0.0,
            similarity_search: 0.0,
            workflow_compliance: 0.0,
        };
        let verdict = FusionEngine::new(&config).fuse(
            &transaction(),
            &[signal(ProviderKind::PatternAnomaly, 0.95, &["odd hour"])],
        );

        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.reasons, [INSUFFICIENT_SIGNAL_DATA.to_string()]);
        assert_eq!(verdict.signal_scores.get(&ProviderKind::PatternAnomaly), Some(&0.95));
        assert!(verdict.is_insufficient_data());
    }

    #[test]
    fn test_removing_provider_matches_proportional_redistribution() {
        let all = [
            signal(ProviderKind::EnsembleInference, 0.82, &[]),
            signal(ProviderKind::PatternAnomaly, 0.64, &[]),
            signal(ProviderKind::SimilaritySearch, 0.89, &[]),
            signal(ProviderKind::WorkflowCompliance, 0.10, &[]),
        ];
        let without_pattern: Vec<SignalResult> = all
            .iter()
            .filter(|s| s.provider != ProviderKind::PatternAnomaly)
            .cloned()
            .collect();

        let fused = engine().fuse(&transaction(), &without_pattern).confidence;

        // Pattern's 0.30 spread over the remaining 0.70 in proportion.
        let w = ProviderWeights::default();
        let rest = w.ensemble_inference + w.similarity_search + w.workflow_compliance;
        let expected = 0.82 * w.ensemble_inference / rest
            + 0.89 * w.similarity_search / rest
            + 0.10 * w.workflow_compliance / rest;

        assert!((fused - expected).abs() < EPS);
    }

    #[test]
    fn test_order_independence() {
        let signals = vec![
            signal(ProviderKind::EnsembleInference, 0.82, &["a"]),
            signal(ProviderKind::PatternAnomaly, 0.64, &["b"]),
            signal(ProviderKind::SimilaritySearch, 0.89, &["c"]),
            signal(ProviderKind::WorkflowCompliance, 0.10, &["d"]),
        ];
        let mut reversed = signals.clone();
        reversed.reverse();
        let mut rotated = signals.clone();
        rotated.rotate_left(2);

        let engine = engine();
        let base = engine.fuse(&transaction(), &signals);
        assert_eq!(base.confidence, engine.fuse(&transaction(), &reversed).confidence);
        assert_eq!(base.confidence, engine.fuse(&transaction(), &rotated).confidence);
        assert_eq!(base.reasons, engine.fuse(&transaction(), &reversed).reasons);
    }

    #[test]
    fn test_idempotent() {
        let signals = vec![
            signal(ProviderKind::EnsembleInference, 0.7, &["x"]),
            signal(ProviderKind::SimilaritySearch, 0.3, &["y"]),
        ];
        let engine = engine();
        assert_eq!(
            engine.fuse(&transaction(), &signals),
            engine.fuse(&transaction(), &signals)
        );
    }

    #[test]
    fn test_confidence_bounded_and_tier_consistent() {
        let engine = engine();
        let thresholds = RiskTierThresholds::default();
        for i in 0..=20 {
            let p = i as f64 / 20.0;
            let verdict = engine.fuse(
                &transaction(),
                &[
                    signal(ProviderKind::EnsembleInference, p, &[]),
                    signal(ProviderKind::PatternAnomaly, 1.0 - p, &[]),
                ],
            );
            assert!((0.0..=1.0).contains(&verdict.confidence));
            assert_eq!(
                verdict.risk_tier,
                RiskTier::from_confidence(verdict.confidence, &thresholds)
            );
            assert_eq!(verdict.is_fraud, verdict.confidence >= 0.75);
        }
    }

    #[test]
    fn test_reason_ordering_and_dedup() {
        let verdict = engine().fuse(
            &transaction(),
            &[
                signal(
                    ProviderKind::PatternAnomaly,
                    0.6,
                    &["New geographic location detected", "Transaction outside normal hours"],
                ),
                signal(
                    ProviderKind::EnsembleInference,
                    0.6,
                    &["Unusual transaction amount", "New geographic location detected"],
                ),
                signal(ProviderKind::SimilaritySearch, 0.9, &["Similar to 2 known fraud patterns"]),
            ],
        );

        assert_eq!(
            verdict.reasons[..4],
            [
                "Similar to 2 known fraud patterns".to_string(),
                // equal probability: ensemble (0.35) outranks pattern (0.30)
                "Unusual transaction amount".to_string(),
                "New geographic location detected".to_string(),
                "Transaction outside normal hours".to_string(),
            ]
        );
        assert_eq!(
            verdict.reasons[4..],
            ["workflow-compliance signal unavailable".to_string()]
        );
    }

    #[test]
    fn test_equal_weight_tie_uses_provider_order() {
        let mut config = FusionConfig::default();
        config.weights.pattern_anomaly = 0.35;
        let verdict = FusionEngine::new(&config).fuse(
            &transaction(),
            &[
                signal(ProviderKind::PatternAnomaly, 0.5, &["pattern"]),
                signal(ProviderKind::EnsembleInference, 0.5, &["ensemble"]),
            ],
        );
        assert_eq!(verdict.reasons[..2], ["ensemble".to_string(), "pattern".to_string()]);
    }

    #[test]
    fn test_duplicate_provider_counts_once() {
        let verdict = engine().fuse(
            &transaction(),
            &[
                signal(ProviderKind::EnsembleInference, 0.4, &[]),
                signal(ProviderKind::EnsembleInference, 0.8, &[]),
                signal(ProviderKind::PatternAnomaly, 0.2, &[]),
            ],
        );
        let expected = (0.8 * 0.35 + 0.2 * 0.30) / 0.65;
        assert!((verdict.confidence - expected).abs() < EPS);
    }

    #[test]
    fn test_compliance_boost_is_additive() {
        let mut config = FusionConfig::default();
        config.compliance_boost = 0.1;
        let compliance = signal(ProviderKind::WorkflowCompliance, 0.5, &["SAR filing required"])
            .with_metadata(SignalMetadata::Compliance {
                status: "review".to_string(),
                requires_sar_filing: true,
            });

        let verdict = FusionEngine::new(&config).fuse(
            &transaction(),
            &[signal(ProviderKind::EnsembleInference, 0.7, &[]), compliance],
        );
        let mean = (0.7 * 0.35 + 0.5 * 0.15) / 0.50;
        assert!((verdict.confidence - (mean + 0.1)).abs() < EPS);
    }

    #[test]
    fn test_fraud_type_from_similar_matches() {
        let matches = vec![
            similar("fraud_001", FraudType::CardFraud, 0.89),
            similar("fraud_002", FraudType::MoneyLaundering, 0.80),
            similar("fraud_005", FraudType::CardFraud, 0.76),
        ];
        let similarity = signal(ProviderKind::SimilaritySearch, 0.89, &[])
            .with_metadata(SignalMetadata::Similarity { matches });

        let verdict = engine().fuse(&transaction(), &[similarity]);
        assert_eq!(verdict.fraud_type, FraudType::CardFraud);
    }

    #[test]
    fn test_fraud_type_tie_uses_enum_order() {
        let matches = vec![
            similar("a", FraudType::MoneyLaundering, 0.9),
            similar("b", FraudType::IdentityTheft, 0.8),
        ];
        let similarity = signal(ProviderKind::SimilaritySearch, 0.2, &[])
            .with_metadata(SignalMetadata::Similarity { matches });

        let verdict = engine().fuse(&transaction(), &[similarity]);
        assert_eq!(verdict.fraud_type, FraudType::IdentityTheft);
    }

    #[test]
    fn test_fraud_type_fallbacks() {
        let engine = engine();
        let high = [signal(ProviderKind::EnsembleInference, 0.9, &[])];
        let fraud = engine.fuse(&transaction(), &high);
        assert_eq!(fraud.fraud_type, FraudType::CardFraud);

        let low = [signal(ProviderKind::EnsembleInference, 0.1, &[])];
        let benign = engine.fuse(&transaction(), &low);
        assert_eq!(benign.fraud_type, FraudType::Unknown);
    }

    fn raw(provider: ProviderKind, probability: f64) -> SignalResult {
        SignalResult {
            provider,
            probability: Some(probability),
            reasons: vec!["raw reason".to_string()],
            metadata: None,
        }
    }

    #[test]
    fn test_non_finite_probability_is_unavailable() {
        let verdict = engine().fuse(
            &transaction(),
            &[
                raw(ProviderKind::EnsembleInference, f64::NAN),
                signal(ProviderKind::PatternAnomaly, 0.1, &[]),
            ],
        );

        assert!((verdict.confidence - 0.1).abs() < EPS);
        assert_eq!(verdict.risk_tier, RiskTier::Low);
        assert!(!verdict.is_fraud);
        assert_eq!(verdict.recommended_actions, ["approve"]);
        assert!(verdict
            .unavailable_providers
            .contains(&ProviderKind::EnsembleInference));
        assert!(!verdict.reasons.contains(&"raw reason".to_string()));
    }

    #[test]
    fn test_only_non_finite_signals_fail_closed() {
        let verdict = engine().fuse(
            &transaction(),
            &[
                raw(ProviderKind::EnsembleInference, f64::NAN),
                raw(ProviderKind::PatternAnomaly, f64::NEG_INFINITY),
            ],
        );
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.reasons, [INSUFFICIENT_SIGNAL_DATA]);
    }

    #[test]
    fn test_out_of_range_probability_clamped() {
        let engine = engine();
        let high = engine.fuse(&transaction(), &[raw(ProviderKind::EnsembleInference, 4.0)]);
        assert_eq!(high.confidence, 1.0);
        assert_eq!(high.risk_tier, RiskTier::Critical);
        assert!(high.is_fraud);

        let low = engine.fuse(&transaction(), &[raw(ProviderKind::EnsembleInference, -2.0)]);
        assert_eq!(low.confidence, 0.0);
        assert_eq!(low.risk_tier, RiskTier::Low);
        assert_eq!(low.signal_scores[&ProviderKind::EnsembleInference], 0.0);
    }
}
