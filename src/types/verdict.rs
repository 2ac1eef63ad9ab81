//! Fraud verdict data structures

use crate::fusion::INSUFFICIENT_SIGNAL_DATA;
use crate::types::signal::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Risk tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Medium,
        RiskTier::High,
        RiskTier::Critical,
    ];

    /// Determine risk tier from confidence and tier boundaries
    pub fn from_confidence(confidence: f64, thresholds: &RiskTierThresholds) -> Self {
        if confidence < thresholds.medium {
            RiskTier::Low
        } else if confidence < thresholds.high {
            RiskTier::Medium
        } else if confidence < thresholds.critical {
            RiskTier::High
        } else {
            RiskTier::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds of the medium, high and critical tiers.
///
/// Anything below `medium` is low. Bounds must satisfy
/// `0 <= medium <= high <= critical <= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTierThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl RiskTierThresholds {
    pub fn is_monotonic(&self) -> bool {
        let bounds = [0.0, self.medium, self.high, self.critical, 1.0];
        bounds.iter().all(|b| b.is_finite()) && bounds.windows(2).all(|w| w[0] <= w[1])
    }
}

impl Default for RiskTierThresholds {
    fn default() -> Self {
        Self {
            medium: 0.30,
            high: 0.60,
            critical: 0.75,
        }
    }
}

/// Fraud typology attached to a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudType {
    IdentityTheft,
    CardFraud,
    MoneyLaundering,
    AccountTakeover,
    SyntheticIdentity,
    Phishing,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Result of fusing all available signals for one transaction.
///
/// Built once per analysis by the fusion engine; the case trigger may
/// return a copy with a case identifier or a failure note attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub transaction_id: String,

    pub is_fraud: bool,

    /// Fused fraud confidence (0.0 - 1.0)
    pub confidence: f64,

    pub risk_tier: RiskTier,

    pub fraud_type: FraudType,

    /// Deduplicated, most suspicious and most trusted first
    pub reasons: Vec<String>,

    pub recommended_actions: Vec<String>,

    /// Probability reported by every provider that answered
    pub signal_scores: BTreeMap<ProviderKind, f64>,

    /// Providers that timed out, failed or were disabled
    pub unavailable_providers: Vec<ProviderKind>,

    /// Investigation case opened by the workflow collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
}

impl Verdict {
    pub fn with_case_id(mut self, case_id: String) -> Self {
        self.case_id = Some(case_id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.reasons.push(note.into());
        self
    }

    /// Fusion failed closed: no signal carried any weight.
    pub fn is_insufficient_data(&self) -> bool {
        self.reasons.iter().any(|r| r == INSUFFICIENT_SIGNAL_DATA)
    }
}
