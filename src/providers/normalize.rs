//! Mapping of collaborator answers into canonical signals

use crate::fusion::aggregator::ScoreAggregator;
use crate::providers::{ComplianceOutput, EnsembleOutput, PatternOutput};
use crate::types::signal::{Agreement, ProviderKind, SignalMetadata, SignalResult, SimilarMatch};
use std::collections::BTreeMap;

/// Ensemble signal. When the collaborator only reports per-model votes,
/// they are combined with `votes`, the same re-normalizing weighted mean
/// used for fusion.
pub fn ensemble_signal(output: EnsembleOutput, votes: &ScoreAggregator<String>) -> SignalResult {
    let kind = ProviderKind::EnsembleInference;

    let mut by_model: BTreeMap<String, f64> = BTreeMap::new();
    for vote in output.votes.iter().filter(|v| v.fraud_probability.is_finite()) {
        by_model
            .entry(vote.model.clone())
            .and_modify(|p| *p = p.max(vote.fraud_probability))
            .or_insert(vote.fraud_probability);
    }

    let probability = output
        .probability
        .filter(|p| p.is_finite())
        .or_else(|| votes.aggregate(&by_model));

    let Some(probability) = probability else {
        return SignalResult::unavailable(kind);
    };

    let probabilities: Vec<f64> = by_model.values().copied().collect();
    let agreement = Agreement::from_probabilities(&probabilities);

    let vote_reasons: Vec<String> = output
        .votes
        .iter()
        .flat_map(|v| v.risk_factors.iter().cloned())
        .collect();

    SignalResult::available(kind, probability)
        .with_reasons(output.risk_factors)
        .with_reasons(vote_reasons)
        .with_metadata(SignalMetadata::Ensemble {
            votes: output.votes,
            agreement,
        })
}

/// Pattern signal: the collaborator's confidence is in its own
/// suspicious/not-suspicious call, so a confident "not suspicious"
/// becomes a low fraud probability.
pub fn pattern_signal(output: PatternOutput) -> SignalResult {
    let probability = if output.is_suspicious {
        output.confidence
    } else {
        1.0 - output.confidence
    };

    SignalResult::available(ProviderKind::PatternAnomaly, probability)
        .with_reasons(output.anomalies)
        .with_reasons(output.risk_factors)
        .with_metadata(SignalMetadata::Pattern {
            explanation: output.explanation,
        })
}

/// Similarity signal: strongest match at or above `score_threshold`.
/// No qualifying match is an answered, benign signal.
pub fn similarity_signal(matches: Vec<SimilarMatch>, score_threshold: f64) -> SignalResult {
    let mut matches: Vec<SimilarMatch> = matches
        .into_iter()
        .filter(|m| m.similarity_score.is_finite() && m.similarity_score >= score_threshold)
        .collect();
    matches.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.pattern_id.cmp(&b.pattern_id))
    });

    let probability = matches.first().map(|m| m.similarity_score).unwrap_or(0.0);

    let mut reasons = Vec::with_capacity(matches.len() + 1);
    if !matches.is_empty() {
        reasons.push(format!("Similar to {} known fraud patterns", matches.len()));
        reasons.extend(matches.iter().map(|m| m.description.clone()));
    }

    SignalResult::available(ProviderKind::SimilaritySearch, probability)
        .with_reasons(reasons)
        .with_metadata(SignalMetadata::Similarity { matches })
}

pub fn compliance_signal(output: ComplianceOutput) -> SignalResult {
    let mut reasons = output.findings;
    if output.requires_sar_filing {
        reasons.push("Suspicious activity report filing required".to_string());
    }

    SignalResult::available(ProviderKind::WorkflowCompliance, output.risk_score)
        .with_reasons(reasons)
        .with_metadata(SignalMetadata::Compliance {
            status: output.status,
            requires_sar_filing: output.requires_sar_filing,
        })
}
