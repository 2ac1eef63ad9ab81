//! Opening investigation cases for fraud verdicts

use crate::config::CaseTriggerConfig;
use crate::error::ProviderError;
use crate::providers::adapters::ProviderSlot;
use crate::providers::{call_with_timeout, CasePriority, CaseRequest, WorkflowAutomation};
use crate::types::transaction::Transaction;
use crate::types::verdict::{RiskTier, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Prefix of the reason appended when a case could not be opened.
pub const CASE_CREATION_FAILED: &str = "investigation case could not be opened";

/// Namespace for case reference keys. Changing it breaks dedup of cases
/// already opened by the workflow collaborator.
const CASE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c3a52_8e0b_4d7a_9c41_52e8a3b70d19);

/// Stable external reference for the case of a transaction.
pub fn reference_key(transaction_id: &str) -> String {
    format!(
        "fraud-case-{}",
        Uuid::new_v5(&CASE_NAMESPACE, transaction_id.as_bytes())
    )
}

/// Asks the workflow collaborator to open a case when a verdict is both
/// flagged as fraud and at or above `min_tier`.
pub struct CaseTrigger {
    workflow: Option<Arc<dyn WorkflowAutomation>>,
    timeout: Duration,
    min_tier: RiskTier,
    enabled: bool,
}

impl CaseTrigger {
    pub fn new(
        workflow: Arc<dyn WorkflowAutomation>,
        timeout: Duration,
        min_tier: RiskTier,
    ) -> Self {
        Self {
            workflow: Some(workflow),
            timeout,
            min_tier,
            enabled: true,
        }
    }

    /// A trigger that never opens cases
    pub fn disabled() -> Self {
        Self {
            workflow: None,
            timeout: Duration::ZERO,
            min_tier: RiskTier::Critical,
            enabled: false,
        }
    }

    /// Build from configuration, sharing the workflow collaborator used
    /// for compliance signals.
    pub fn from_config(
        config: &CaseTriggerConfig,
        workflow: &ProviderSlot<dyn WorkflowAutomation>,
    ) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| workflow.timeout());

        Self {
            workflow: workflow.provider().cloned(),
            timeout,
            min_tier: config.min_tier,
            enabled: true,
        }
    }

    pub fn should_open(&self, verdict: &Verdict) -> bool {
        self.enabled && verdict.is_fraud && verdict.risk_tier >= self.min_tier
    }

    /// Return `verdict` unchanged, with a case id attached, or with a note
    /// that the case could not be opened. The fraud determination itself
    /// is never altered.
    pub async fn maybe_open_case(&self, transaction: &Transaction, verdict: Verdict) -> Verdict {
        if !self.should_open(&verdict) {
            return verdict;
        }

        let request = CaseRequest {
            reference_key: reference_key(&transaction.transaction_id),
            transaction_id: transaction.transaction_id.clone(),
            risk_tier: verdict.risk_tier,
            priority: CasePriority::from(verdict.risk_tier),
            reasons: verdict.reasons.clone(),
        };

        let result = match &self.workflow {
            Some(workflow) => {
                call_with_timeout(self.timeout, workflow.create_case(&request)).await
            }
            None => Err(ProviderError::Unavailable(
                "workflow provider is disabled".to_string(),
            )),
        };

        match result {
            Ok(receipt) => {
                info!(
                    transaction_id = %transaction.transaction_id,
                    case_id = %receipt.case_id,
                    reference_key = %request.reference_key,
                    risk_tier = %verdict.risk_tier,
                    "Investigation case opened"
                );
                verdict.with_case_id(receipt.case_id)
            }
            Err(e) => {
                error!(
                    transaction_id = %transaction.transaction_id,
                    reference_key = %request.reference_key,
                    error = %e,
                    "Failed to open investigation case"
                );
                verdict.with_note(format!("{CASE_CREATION_FAILED}: {e}"))
            }
        }
    }
}
