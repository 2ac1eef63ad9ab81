//! Concurrent fan-out to the signal providers

use crate::config::{ProviderConfig, ProviderMode, ProvidersConfig};
use crate::error::ProviderError;
use crate::fusion::aggregator::ScoreAggregator;
use crate::providers::demo::{DemoEnsemble, DemoPatternAnalyzer, DemoSimilaritySearch, DemoWorkflow};
use crate::providers::http::{
    HttpEnsemble, HttpPatternAnalyzer, HttpSimilaritySearch, HttpWorkflow, ProviderClient,
};
use crate::providers::{
    call_with_timeout, normalize, EnsembleInference, PatternAnomaly, SimilaritySearch,
    WorkflowAutomation,
};
use crate::types::signal::{ProviderKind, SignalResult};
use crate::types::transaction::Transaction;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A collaborator plus its per-call timeout; `None` when disabled.
pub struct ProviderSlot<P: ?Sized> {
    provider: Option<Arc<P>>,
    timeout: Duration,
}

impl<P: ?Sized> ProviderSlot<P> {
    pub fn enabled(provider: Arc<P>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    pub fn disabled() -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn provider(&self) -> Option<&Arc<P>> {
        self.provider.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// The four signal providers, queried concurrently for each transaction.
///
/// Holds no per-request state: every call to [`collect`](Self::collect)
/// is independent.
pub struct SignalProviders {
    ensemble: ProviderSlot<dyn EnsembleInference>,
    pattern: ProviderSlot<dyn PatternAnomaly>,
    similarity: ProviderSlot<dyn SimilaritySearch>,
    workflow: ProviderSlot<dyn WorkflowAutomation>,
    vote_weights: ScoreAggregator<String>,
    similarity_limit: usize,
    score_threshold: f64,
}

impl Default for SignalProviders {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProviders {
    /// All providers disabled
    pub fn new() -> Self {
        Self {
            ensemble: ProviderSlot::disabled(),
            pattern: ProviderSlot::disabled(),
            similarity: ProviderSlot::disabled(),
            workflow: ProviderSlot::disabled(),
            vote_weights: ScoreAggregator::equal_weights(),
            similarity_limit: 5,
            score_threshold: 0.7,
        }
    }

    pub fn with_ensemble(
        mut self,
        provider: Arc<dyn EnsembleInference>,
        timeout: Duration,
    ) -> Self {
        self.ensemble = ProviderSlot::enabled(provider, timeout);
        self
    }

    pub fn with_pattern(mut self, provider: Arc<dyn PatternAnomaly>, timeout: Duration) -> Self {
        self.pattern = ProviderSlot::enabled(provider, timeout);
        self
    }

    pub fn with_similarity(
        mut self,
        provider: Arc<dyn SimilaritySearch>,
        timeout: Duration,
    ) -> Self {
        self.similarity = ProviderSlot::enabled(provider, timeout);
        self
    }

    pub fn with_workflow(
        mut self,
        provider: Arc<dyn WorkflowAutomation>,
        timeout: Duration,
    ) -> Self {
        self.workflow = ProviderSlot::enabled(provider, timeout);
        self
    }

    /// Weights for combining per-model ensemble votes
    pub fn with_vote_weights(mut self, vote_weights: ScoreAggregator<String>) -> Self {
        self.vote_weights = vote_weights;
        self
    }

    pub fn with_similarity_filter(mut self, limit: usize, score_threshold: f64) -> Self {
        self.similarity_limit = limit;
        self.score_threshold = score_threshold;
        self
    }

    /// Build providers as configured: HTTP clients, demo stand-ins, or nothing.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let mut providers = Self::new().with_similarity_filter(
            config.similarity.limit,
            config.similarity.score_threshold,
        );

        if !config.ensemble.model_weights.is_empty() {
            providers = providers
                .with_vote_weights(ScoreAggregator::new(config.ensemble.model_weights.clone()));
        }

        match config.ensemble.mode {
            ProviderMode::Http => {
                let client = http_client("ensemble", &config.ensemble)?;
                let models = config.ensemble.models.clone();
                providers = providers.with_ensemble(
                    Arc::new(HttpEnsemble::new(client, models)),
                    config.ensemble.timeout(),
                );
            }
            ProviderMode::Demo => {
                providers =
                    providers.with_ensemble(Arc::new(DemoEnsemble), config.ensemble.timeout());
            }
            ProviderMode::Disabled => {}
        }

        match config.pattern.mode {
            ProviderMode::Http => {
                let client = http_client("pattern", &config.pattern)?;
                providers = providers.with_pattern(
                    Arc::new(HttpPatternAnalyzer::new(client)),
                    config.pattern.timeout(),
                );
            }
            ProviderMode::Demo => {
                providers =
                    providers.with_pattern(Arc::new(DemoPatternAnalyzer), config.pattern.timeout());
            }
            ProviderMode::Disabled => {}
        }

        match config.similarity.mode {
            ProviderMode::Http => {
                let client = http_client("similarity", &config.similarity)?;
                providers = providers.with_similarity(
                    Arc::new(HttpSimilaritySearch::new(client)),
                    config.similarity.timeout(),
                );
            }
            ProviderMode::Demo => {
                providers = providers
                    .with_similarity(Arc::new(DemoSimilaritySearch), config.similarity.timeout());
            }
            ProviderMode::Disabled => {}
        }

        match config.workflow.mode {
            ProviderMode::Http => {
                let client = http_client("workflow", &config.workflow)?;
                providers = providers.with_workflow(
                    Arc::new(HttpWorkflow::new(client)),
                    config.workflow.timeout(),
                );
            }
            ProviderMode::Demo => {
                providers =
                    providers.with_workflow(Arc::new(DemoWorkflow), config.workflow.timeout());
            }
            ProviderMode::Disabled => {}
        }

        info!(
            ensemble = ?config.ensemble.mode,
            pattern = ?config.pattern.mode,
            similarity = ?config.similarity.mode,
            workflow = ?config.workflow.mode,
            "Signal providers configured"
        );

        Ok(providers)
    }

    /// The workflow collaborator, shared with the case trigger
    pub fn workflow(&self) -> &ProviderSlot<dyn WorkflowAutomation> {
        &self.workflow
    }

    /// Query all four providers concurrently.
    ///
    /// Returns once every call has answered, failed or timed out; always
    /// one signal per provider, unavailable ones included. Dropping the
    /// returned future abandons any call still in flight.
    pub async fn collect(&self, transaction: &Transaction) -> Vec<SignalResult> {
        let text = transaction.to_text();

        let (ensemble, pattern, similarity, compliance) = tokio::join!(
            self.ensemble_signal(&text),
            self.pattern_signal(transaction),
            self.similarity_signal(&text),
            self.compliance_signal(transaction),
        );

        vec![ensemble, pattern, similarity, compliance]
    }

    async fn ensemble_signal(&self, text: &str) -> SignalResult {
        let kind = ProviderKind::EnsembleInference;
        let Some(provider) = self.ensemble.provider() else {
            return SignalResult::unavailable(kind);
        };
        bounded(kind, self.ensemble.timeout, provider.infer(text))
            .await
            .map(|out| normalize::ensemble_signal(out, &self.vote_weights))
            .unwrap_or_else(|| SignalResult::unavailable(kind))
    }

    async fn pattern_signal(&self, transaction: &Transaction) -> SignalResult {
        let kind = ProviderKind::PatternAnomaly;
        let Some(provider) = self.pattern.provider() else {
            return SignalResult::unavailable(kind);
        };
        bounded(kind, self.pattern.timeout, provider.analyze_pattern(transaction))
            .await
            .map(normalize::pattern_signal)
            .unwrap_or_else(|| SignalResult::unavailable(kind))
    }

    async fn similarity_signal(&self, text: &str) -> SignalResult {
        let kind = ProviderKind::SimilaritySearch;
        let Some(provider) = self.similarity.provider() else {
            return SignalResult::unavailable(kind);
        };
        bounded(
            kind,
            self.similarity.timeout,
            provider.find_similar(text, self.similarity_limit),
        )
        .await
        .map(|matches| normalize::similarity_signal(matches, self.score_threshold))
        .unwrap_or_else(|| SignalResult::unavailable(kind))
    }

    async fn compliance_signal(&self, transaction: &Transaction) -> SignalResult {
        let kind = ProviderKind::WorkflowCompliance;
        let Some(provider) = self.workflow.provider() else {
            return SignalResult::unavailable(kind);
        };
        bounded(kind, self.workflow.timeout, provider.compliance_check(transaction))
            .await
            .map(normalize::compliance_signal)
            .unwrap_or_else(|| SignalResult::unavailable(kind))
    }
}

fn http_client(name: &str, config: &ProviderConfig) -> Result<ProviderClient> {
    let base_url = config
        .base_url
        .as_deref()
        .with_context(|| format!("provider {name} is in http mode but has no base_url"))?;
    ProviderClient::new(base_url, config.api_key.clone(), config.timeout())
        .with_context(|| format!("Failed to build HTTP client for provider {name}"))
}

/// Run one provider call under its timeout. Failures are absorbed here:
/// the caller only learns that the signal is absent.
async fn bounded<T, F>(kind: ProviderKind, limit: Duration, call: F) -> Option<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let started = Instant::now();
    match call_with_timeout(limit, call).await {
        Ok(value) => {
            debug!(
                provider = %kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Provider answered"
            );
            Some(value)
        }
        Err(e) => {
            warn!(
                provider = %kind,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Provider unavailable, signal dropped"
            );
            None
        }
    }
}
