//! Scripted collaborators for tests: fixed answers, failures or delays,
//! with call counting.

use crate::error::ProviderError;
use crate::providers::{
    CaseReceipt, CaseRequest, ComplianceOutput, EnsembleInference, EnsembleOutput, PatternAnomaly,
    PatternOutput, SimilaritySearch, WorkflowAutomation,
};
use crate::types::signal::SimilarMatch;
use crate::types::transaction::Transaction;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A collaborator that always gives the same answer.
pub struct Fixture<T> {
    response: Option<T>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl<T: Clone + Send + Sync> Fixture<T> {
    pub fn ok(response: T) -> Self {
        Self {
            response: Some(response),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Wait `delay` before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("fixture configured to fail".to_string()))
    }
}

#[async_trait]
impl EnsembleInference for Fixture<EnsembleOutput> {
    async fn infer(&self, _transaction_text: &str) -> Result<EnsembleOutput, ProviderError> {
        self.respond().await
    }
}

#[async_trait]
impl PatternAnomaly for Fixture<PatternOutput> {
    async fn analyze_pattern(
        &self,
        _transaction: &Transaction,
    ) -> Result<PatternOutput, ProviderError> {
        self.respond().await
    }
}

#[async_trait]
impl SimilaritySearch for Fixture<Vec<SimilarMatch>> {
    async fn find_similar(
        &self,
        _text: &str,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>, ProviderError> {
        let mut matches = self.respond().await?;
        matches.truncate(limit);
        Ok(matches)
    }
}

/// Workflow collaborator that dedups cases by reference key and records
/// every case request it receives.
pub struct FixtureWorkflow {
    compliance: Fixture<ComplianceOutput>,
    cases_fail: bool,
    case_delay: Option<Duration>,
    opened: Mutex<BTreeMap<String, CaseReceipt>>,
    requests: Mutex<Vec<CaseRequest>>,
}

impl FixtureWorkflow {
    pub fn new(compliance: Fixture<ComplianceOutput>) -> Self {
        Self {
            compliance,
            cases_fail: false,
            case_delay: None,
            opened: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Case creation always fails
    pub fn failing_cases(mut self) -> Self {
        self.cases_fail = true;
        self
    }

    pub fn delayed_cases(mut self, delay: Duration) -> Self {
        self.case_delay = Some(delay);
        self
    }

    pub fn case_requests(&self) -> Vec<CaseRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of distinct cases opened
    pub fn cases_opened(&self) -> usize {
        self.opened.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn compliance_calls(&self) -> usize {
        self.compliance.calls()
    }
}

#[async_trait]
impl WorkflowAutomation for FixtureWorkflow {
    async fn create_case(&self, request: &CaseRequest) -> Result<CaseReceipt, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.case_delay {
            tokio::time::sleep(delay).await;
        }
        if self.cases_fail {
            return Err(ProviderError::Server {
                status: 503,
                body: "case service unavailable".to_string(),
            });
        }

        let mut opened = self
            .opened
            .lock()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let next_id = format!("CASE-{:04}", opened.len() + 1);
        let receipt = opened
            .entry(request.reference_key.clone())
            .or_insert_with(|| CaseReceipt {
                case_id: next_id,
                status: Some("initiated".to_string()),
            });
        Ok(receipt.clone())
    }

    async fn compliance_check(
        &self,
        _transaction: &Transaction,
    ) -> Result<ComplianceOutput, ProviderError> {
        self.compliance.respond().await
    }
}
