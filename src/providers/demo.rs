//! Canned collaborators used when a provider runs in `demo` mode.
//!
//! They answer instantly and deterministically so the pipeline can run
//! without vendor credentials. The pattern and compliance stand-ins react
//! to large amounts and night-time activity so demo traffic produces a
//! spread of verdicts.

use crate::error::ProviderError;
use crate::providers::{
    CaseReceipt, CaseRequest, ComplianceOutput, EnsembleInference, EnsembleOutput, PatternAnomaly,
    PatternOutput, SimilaritySearch, WorkflowAutomation,
};
use crate::types::signal::{ModelVote, SimilarMatch};
use crate::types::transaction::Transaction;
use crate::types::verdict::FraudType;
use async_trait::async_trait;
use chrono::Timelike;
use uuid::Uuid;

/// Reporting threshold used by the demo compliance screen
const LARGE_AMOUNT: f64 = 10_000.0;

fn is_night(transaction: &Transaction) -> bool {
    transaction
        .occurred_at()
        .map(|at| at.hour() < 6)
        .unwrap_or(false)
}

pub struct DemoEnsemble;

#[async_trait]
impl EnsembleInference for DemoEnsemble {
    async fn infer(&self, _transaction_text: &str) -> Result<EnsembleOutput, ProviderError> {
        let vote = |model: &str, p: f64, confidence: f64, factors: &[&str]| ModelVote {
            model: model.to_string(),
            fraud_probability: p,
            confidence: Some(confidence),
            risk_factors: factors.iter().map(|f| f.to_string()).collect(),
        };

        Ok(EnsembleOutput {
            probability: Some(0.82),
            votes: vec![
                vote("gpt-4", 0.85, 0.92, &["Unusual amount", "Geographic anomaly"]),
                vote("claude-3-opus", 0.81, 0.88, &["Timing pattern", "Merchant risk"]),
                vote("llama-3", 0.80, 0.87, &["Amount deviation", "Location change"]),
            ],
            risk_factors: vec![
                "Unusual transaction amount".to_string(),
                "New geographic location".to_string(),
                "Irregular timing pattern".to_string(),
                "High-risk merchant category".to_string(),
            ],
        })
    }
}

pub struct DemoPatternAnalyzer;

#[async_trait]
impl PatternAnomaly for DemoPatternAnalyzer {
    async fn analyze_pattern(
        &self,
        transaction: &Transaction,
    ) -> Result<PatternOutput, ProviderError> {
        let mut anomalies = Vec::new();
        if transaction.amount >= LARGE_AMOUNT {
            anomalies.push("Transaction amount far above account average".to_string());
        }
        if is_night(transaction) {
            anomalies.push("Transaction outside normal hours".to_string());
        }
        if transaction.location.is_none() {
            anomalies.push("Transaction location unknown".to_string());
        }

        let suspicious = !anomalies.is_empty();
        Ok(PatternOutput {
            is_suspicious: suspicious,
            confidence: if suspicious { 0.82 } else { 0.9 },
            risk_factors: if suspicious {
                vec!["Unusual spending pattern".to_string()]
            } else {
                Vec::new()
            },
            explanation: Some(if suspicious {
                "Transaction shows red flags requiring investigation".to_string()
            } else {
                "Transaction consistent with account history".to_string()
            }),
            anomalies,
        })
    }
}

pub struct DemoSimilaritySearch;

#[async_trait]
impl SimilaritySearch for DemoSimilaritySearch {
    async fn find_similar(
        &self,
        _text: &str,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>, ProviderError> {
        let mut matches = vec![
            SimilarMatch {
                pattern_id: "fraud_001".to_string(),
                fraud_type: FraudType::CardFraud,
                description: "Multiple transactions from different countries within 1 hour"
                    .to_string(),
                similarity_score: 0.89,
            },
            SimilarMatch {
                pattern_id: "fraud_005".to_string(),
                fraud_type: FraudType::CardFraud,
                description: "Small test transactions followed by large purchase".to_string(),
                similarity_score: 0.76,
            },
        ];
        matches.truncate(limit);
        Ok(matches)
    }
}

pub struct DemoWorkflow;

#[async_trait]
impl WorkflowAutomation for DemoWorkflow {
    async fn create_case(&self, request: &CaseRequest) -> Result<CaseReceipt, ProviderError> {
        // Same reference key, same case.
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, request.reference_key.as_bytes());
        let short: String = id.simple().to_string().chars().take(12).collect();
        Ok(CaseReceipt {
            case_id: format!("WF-{}", short.to_uppercase()),
            status: Some("initiated".to_string()),
        })
    }

    async fn compliance_check(
        &self,
        transaction: &Transaction,
    ) -> Result<ComplianceOutput, ProviderError> {
        let over_limit = transaction.amount >= LARGE_AMOUNT;
        Ok(ComplianceOutput {
            status: if over_limit { "review" } else { "passed" }.to_string(),
            requires_sar_filing: over_limit,
            risk_score: if over_limit { 0.6 } else { 0.05 },
            findings: if over_limit {
                vec!["Amount above currency transaction reporting threshold".to_string()]
            } else {
                Vec::new()
            },
        })
    }
}
