//! End-to-end analysis of a single transaction

use crate::case_trigger::CaseTrigger;
use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::fusion::FusionEngine;
use crate::providers::SignalProviders;
use crate::types::transaction::Transaction;
use crate::types::verdict::Verdict;
use anyhow::Result;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs the providers, fuses their signals and opens a case when warranted.
///
/// Shared freely between concurrent requests: nothing is mutated after
/// construction.
pub struct FraudAnalyzer {
    providers: SignalProviders,
    engine: FusionEngine,
    case_trigger: CaseTrigger,
}

impl FraudAnalyzer {
    pub fn new(
        providers: SignalProviders,
        engine: FusionEngine,
        case_trigger: CaseTrigger,
    ) -> Self {
        Self {
            providers,
            engine,
            case_trigger,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let providers = SignalProviders::from_config(&config.providers)?;
        let engine = FusionEngine::new(&config.fusion);
        let case_trigger = CaseTrigger::from_config(&config.case_trigger, providers.workflow());
        Ok(Self::new(providers, engine, case_trigger))
    }

    /// Analyze one transaction.
    ///
    /// Fails only when the transaction itself is invalid, in which case no
    /// provider is called. Provider outages degrade the verdict instead.
    pub async fn analyze(&self, transaction: &Transaction) -> Result<Verdict, AnalysisError> {
        transaction.validate()?;
        let started = Instant::now();

        let signals = self.providers.collect(transaction).await;
        let verdict = self.engine.fuse(transaction, &signals);

        if verdict.is_insufficient_data() {
            error!(
                transaction_id = %transaction.transaction_id,
                answered = verdict.signal_scores.len(),
                "No weighted signal available"
            );
        }

        let verdict = self.case_trigger.maybe_open_case(transaction, verdict).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if verdict.is_fraud {
            info!(
                transaction_id = %verdict.transaction_id,
                confidence = verdict.confidence,
                risk_tier = %verdict.risk_tier,
                fraud_type = ?verdict.fraud_type,
                case_id = verdict.case_id.as_deref().unwrap_or("-"),
                elapsed_ms,
                "Fraud verdict"
            );
        } else {
            debug!(
                transaction_id = %verdict.transaction_id,
                confidence = verdict.confidence,
                risk_tier = %verdict.risk_tier,
                elapsed_ms,
                "Transaction cleared"
            );
        }

        Ok(verdict)
    }
}
