//! Configuration management for the fraud fusion pipeline

use crate::error::ConfigError;
use crate::types::signal::ProviderKind;
use crate::types::verdict::{RiskTier, RiskTierThresholds};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub fusion: FusionConfig,
    pub case_trigger: CaseTriggerConfig,
    pub providers: ProvidersConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transactions
    pub transaction_subject: String,
    /// Subject for outgoing verdicts
    pub verdict_subject: String,
}

/// Fusion engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FusionConfig {
    pub weights: ProviderWeights,
    /// Confidence at or above which a verdict is flagged as fraud
    pub fraud_threshold: f64,
    pub risk_tiers: RiskTierThresholds,
    pub actions: ActionTable,
    /// Added to the fused confidence when compliance asks for a SAR filing
    #[serde(default)]
    pub compliance_boost: f64,
}

/// Fixed weight of each signal provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderWeights {
    pub ensemble_inference: f64,
    pub pattern_anomaly: f64,
    pub similarity_search: f64,
    pub workflow_compliance: f64,
}

impl ProviderWeights {
    pub fn get(&self, provider: ProviderKind) -> f64 {
        match provider {
            ProviderKind::EnsembleInference => self.ensemble_inference,
            ProviderKind::PatternAnomaly => self.pattern_anomaly,
            ProviderKind::SimilaritySearch => self.similarity_search,
            ProviderKind::WorkflowCompliance => self.workflow_compliance,
        }
    }

    pub fn to_map(&self) -> BTreeMap<ProviderKind, f64> {
        ProviderKind::ALL.iter().map(|&p| (p, self.get(p))).collect()
    }
}

impl Default for ProviderWeights {
    fn default() -> Self {
        Self {
            ensemble_inference: 0.35,
            pattern_anomaly: 0.30,
            similarity_search: 0.20,
            workflow_compliance: 0.15,
        }
    }
}

/// Recommended actions per risk tier
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionTable {
    pub low: Vec<String>,
    pub medium: Vec<String>,
    pub high: Vec<String>,
    pub critical: Vec<String>,
}

impl ActionTable {
    pub fn for_tier(&self, tier: RiskTier) -> &[String] {
        match tier {
            RiskTier::Low => &self.low,
            RiskTier::Medium => &self.medium,
            RiskTier::High => &self.high,
            RiskTier::Critical => &self.critical,
        }
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        let owned = |actions: &[&str]| actions.iter().map(|a| a.to_string()).collect();
        Self {
            low: owned(&["approve"]),
            medium: owned(&["flag for monitoring"]),
            high: owned(&["manual review", "hold pending verification"]),
            critical: owned(&[
                "block transaction",
                "freeze account",
                "escalate to investigator",
            ]),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: ProviderWeights::default(),
            fraud_threshold: 0.75,
            risk_tiers: RiskTierThresholds::default(),
            actions: ActionTable::default(),
            compliance_boost: 0.0,
        }
    }
}

/// Case trigger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaseTriggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lowest risk tier that opens a case (fraud flag is also required)
    pub min_tier: RiskTier,
    /// Case creation timeout; the workflow provider's timeout when unset
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for CaseTriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_tier: RiskTier::High,
            timeout_ms: None,
        }
    }
}

/// How a provider is reached
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Call the collaborator's HTTP API
    Http,
    /// Answer with canned responses, no network
    #[default]
    Demo,
    /// Never called; always unavailable
    Disabled,
}

/// Per-provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub mode: ProviderMode,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-call timeout in milliseconds
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
    /// Ensemble only: models to poll
    #[serde(default)]
    pub models: Vec<String>,
    /// Ensemble only: per-model vote weights (equal when empty)
    #[serde(default)]
    pub model_weights: BTreeMap<String, f64>,
    /// Similarity only: maximum matches requested
    #[serde(default = "default_similarity_limit")]
    pub limit: usize,
    /// Similarity only: matches below this score are ignored
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
}

fn default_provider_timeout_ms() -> u64 {
    300
}

fn default_similarity_limit() -> usize {
    5
}

fn default_score_threshold() -> f64 {
    0.7
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Demo,
            base_url: None,
            api_key: None,
            timeout_ms: default_provider_timeout_ms(),
            models: Vec::new(),
            model_weights: BTreeMap::new(),
            limit: default_similarity_limit(),
            score_threshold: default_score_threshold(),
        }
    }
}

/// The four collaborators
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersConfig {
    pub ensemble: ProviderConfig,
    pub pattern: ProviderConfig,
    pub similarity: ProviderConfig,
    pub workflow: ProviderConfig,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum transactions analyzed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval")]
    pub metrics_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `FRAUD__SECTION__KEY`
    /// environment variables taking precedence.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FRAUD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app.validate().context("Invalid configuration")?;
        Ok(app)
    }

    /// Reject settings the fusion engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fusion = &self.fusion;

        for provider in ProviderKind::ALL {
            let weight = fusion.weights.get(provider);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    provider: provider.to_string(),
                    weight,
                });
            }
        }
        if ProviderKind::ALL.iter().all(|&p| fusion.weights.get(p) == 0.0) {
            return Err(ConfigError::AllWeightsZero);
        }

        check_unit("fusion.fraud_threshold", fusion.fraud_threshold)?;
        check_unit("fusion.compliance_boost", fusion.compliance_boost)?;

        let tiers = &fusion.risk_tiers;
        if !tiers.is_monotonic() {
            return Err(ConfigError::NonMonotonicTiers {
                medium: tiers.medium,
                high: tiers.high,
                critical: tiers.critical,
            });
        }

        let providers = [
            ("ensemble", &self.providers.ensemble),
            ("pattern", &self.providers.pattern),
            ("similarity", &self.providers.similarity),
            ("workflow", &self.providers.workflow),
        ];
        for (name, provider) in providers {
            if provider.mode == ProviderMode::Disabled {
                continue;
            }
            if provider.timeout_ms == 0 {
                return Err(ConfigError::ZeroTimeout(name.to_string()));
            }
            if provider.mode == ProviderMode::Http && provider.base_url.is_none() {
                return Err(ConfigError::MissingBaseUrl(name.to_string()));
            }
        }

        for (model, &weight) in &self.providers.ensemble.model_weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    provider: format!("ensemble model {model}"),
                    weight,
                });
            }
        }
        check_unit(
            "providers.similarity.score_threshold",
            self.providers.similarity.score_threshold,
        )?;

        if self.case_trigger.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout("case_trigger".to_string()));
        }

        if self.pipeline.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }

        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions".to_string(),
                verdict_subject: "fraud.verdicts".to_string(),
            },
            fusion: FusionConfig::default(),
            case_trigger: CaseTriggerConfig::default(),
            providers: ProvidersConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: default_report_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
