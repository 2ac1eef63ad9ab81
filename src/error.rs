//! Error taxonomy for analysis requests and collaborator calls

use crate::types::transaction::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to an external collaborator.
///
/// Adapters recover from these locally: a signal provider that fails is
/// reported to fusion as unavailable and the case trigger annotates the
/// verdict. Neither surfaces as a request failure.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to the caller of `analyze`.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] ValidationError),
}

/// Configuration rejected at startup
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("weight for {provider} must be a non-negative finite number, got {weight}")]
    InvalidWeight { provider: String, weight: f64 },

    #[error("at least one provider weight must be positive")]
    AllWeightsZero,

    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error(
        "risk tier boundaries must be monotonic within [0, 1]: \
         medium={medium}, high={high}, critical={critical}"
    )]
    NonMonotonicTiers { medium: f64, high: f64, critical: f64 },

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(String),

    #[error("provider {0} is in http mode but has no base_url")]
    MissingBaseUrl(String),

    #[error("pipeline.workers must be greater than zero")]
    ZeroWorkers,
}
