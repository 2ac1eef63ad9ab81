//! Canonical per-provider fraud signals

use crate::types::verdict::FraudType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four signal-producing collaborators.
///
/// Variant order is the canonical provider order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    EnsembleInference,
    PatternAnomaly,
    SimilaritySearch,
    WorkflowCompliance,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::EnsembleInference,
        ProviderKind::PatternAnomaly,
        ProviderKind::SimilaritySearch,
        ProviderKind::WorkflowCompliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::EnsembleInference => "ensemble-inference",
            ProviderKind::PatternAnomaly => "pattern-anomaly",
            ProviderKind::SimilaritySearch => "similarity-search",
            ProviderKind::WorkflowCompliance => "workflow-compliance",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model's opinion inside the ensemble collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVote {
    pub model: String,
    pub fraud_probability: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

/// How closely the ensemble's models agree (variance buckets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
    High,
    Medium,
    Low,
}

impl Agreement {
    pub fn from_probabilities(probabilities: &[f64]) -> Option<Self> {
        if probabilities.is_empty() {
            return None;
        }
        let n = probabilities.len() as f64;
        let mean = probabilities.iter().sum::<f64>() / n;
        let variance = probabilities.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

        Some(if variance < 0.01 {
            Agreement::High
        } else if variance < 0.05 {
            Agreement::Medium
        } else {
            Agreement::Low
        })
    }
}

/// A known fraud pattern returned by the similarity store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub pattern_id: String,
    #[serde(rename = "type", default)]
    pub fraud_type: FraudType,
    pub description: String,
    pub similarity_score: f64,
}

/// Provider-specific detail carried alongside a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalMetadata {
    Ensemble {
        votes: Vec<ModelVote>,
        agreement: Option<Agreement>,
    },
    Pattern {
        explanation: Option<String>,
    },
    Similarity {
        matches: Vec<SimilarMatch>,
    },
    Compliance {
        status: String,
        requires_sar_filing: bool,
    },
}

/// A partial fraud estimate produced by one provider.
///
/// `probability` is `None` when the provider could not answer; such a
/// signal carries no weight in fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub provider: ProviderKind,
    pub probability: Option<f64>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub metadata: Option<SignalMetadata>,
}

impl SignalResult {
    /// An answered signal. Probabilities are clamped into [0, 1]; a
    /// non-finite probability makes the signal unavailable.
    pub fn available(provider: ProviderKind, probability: f64) -> Self {
        let probability = probability.is_finite().then(|| probability.clamp(0.0, 1.0));
        Self {
            provider,
            probability,
            reasons: Vec::new(),
            metadata: None,
        }
    }

    pub fn unavailable(provider: ProviderKind) -> Self {
        Self {
            provider,
            probability: None,
            reasons: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_reasons<I, S>(mut self, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasons.extend(reasons.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, metadata: SignalMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The probability as fusion sees it: clamped into [0, 1], `None` when
    /// missing or not finite. Applies to signals built field by field or
    /// deserialized, not only those from [`available`](Self::available).
    pub fn score(&self) -> Option<f64> {
        self.probability
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 1.0))
    }

    pub fn is_available(&self) -> bool {
        self.score().is_some()
    }

    /// Similarity matches, if this signal carries any
    pub fn similar_matches(&self) -> &[SimilarMatch] {
        match &self.metadata {
            Some(SignalMetadata::Similarity { matches }) => matches,
            _ => &[],
        }
    }

    /// Whether the compliance collaborator asked for a SAR filing
    pub fn requires_sar_filing(&self) -> bool {
        matches!(
            self.metadata,
            Some(SignalMetadata::Compliance {
                requires_sar_filing: true,
                ..
            })
        )
    }
}
