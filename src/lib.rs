//! Fraud Fusion Pipeline Library
//!
//! Routes each transaction through four independent signal providers,
//! fuses whichever signals arrive into a single verdict and opens an
//! investigation case when the verdict warrants one.

pub mod analyzer;
pub mod case_trigger;
pub mod config;
pub mod consumer;
pub mod error;
pub mod fusion;
pub mod metrics;
pub mod producer;
pub mod providers;
pub mod types;

pub use analyzer::FraudAnalyzer;
pub use case_trigger::CaseTrigger;
pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::{AnalysisError, ConfigError, ProviderError};
pub use fusion::FusionEngine;
pub use producer::VerdictProducer;
pub use providers::SignalProviders;
pub use types::{signal::SignalResult, transaction::Transaction, verdict::Verdict};
