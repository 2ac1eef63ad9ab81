//! External signal collaborators and the adapters that normalize them
//!
//! Each collaborator is reached through a trait so that fusion can be
//! exercised with deterministic fixtures. Adapters only invoke the
//! collaborator, bound the wait, and map the answer into a
//! [`SignalResult`](crate::types::SignalResult) or "unavailable".

pub mod adapters;
pub mod demo;
#[cfg(any(test, feature = "test-util"))]
pub mod fixture;
pub mod http;
pub mod normalize;

use crate::error::ProviderError;
use crate::types::signal::{ModelVote, SimilarMatch};
use crate::types::transaction::Transaction;
use crate::types::verdict::RiskTier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

pub use adapters::SignalProviders;

/// Multi-model ensemble inference
#[async_trait]
pub trait EnsembleInference: Send + Sync {
    async fn infer(&self, transaction_text: &str) -> Result<EnsembleOutput, ProviderError>;
}

/// Behavioral pattern / anomaly analysis
#[async_trait]
pub trait PatternAnomaly: Send + Sync {
    async fn analyze_pattern(
        &self,
        transaction: &Transaction,
    ) -> Result<PatternOutput, ProviderError>;
}

/// Read-only search over the store of known fraud patterns
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn find_similar(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>, ProviderError>;
}

/// Case management and compliance screening
#[async_trait]
pub trait WorkflowAutomation: Send + Sync {
    /// Open an investigation case. Implementations should treat a repeated
    /// `reference_key` as the same case.
    async fn create_case(&self, request: &CaseRequest) -> Result<CaseReceipt, ProviderError>;

    async fn compliance_check(
        &self,
        transaction: &Transaction,
    ) -> Result<ComplianceOutput, ProviderError>;
}

/// Ensemble answer: a combined probability, per-model votes, or both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleOutput {
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub votes: Vec<ModelVote>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternOutput {
    pub is_suspicious: bool,
    /// Confidence in `is_suspicious`
    pub confidence: f64,
    #[serde(default)]
    pub anomalies: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceOutput {
    pub status: String,
    #[serde(default)]
    pub requires_sar_filing: bool,
    pub risk_score: f64,
    #[serde(default)]
    pub findings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasePriority {
    High,
    Urgent,
}

impl From<RiskTier> for CasePriority {
    fn from(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Critical => CasePriority::Urgent,
            _ => CasePriority::High,
        }
    }
}

/// Request to open an investigation case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRequest {
    /// Stable key derived from the transaction id, for collaborator dedup
    pub reference_key: String,
    pub transaction_id: String,
    pub risk_tier: RiskTier,
    pub priority: CasePriority,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReceipt {
    pub case_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Await a collaborator call for at most `limit`.
pub async fn call_with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}
