//! Type definitions for the fraud fusion pipeline

pub mod signal;
pub mod transaction;
pub mod verdict;

pub use signal::{ProviderKind, SignalMetadata, SignalResult};
pub use transaction::{Transaction, TransactionCategory, ValidationError};
pub use verdict::{FraudType, RiskTier, RiskTierThresholds, Verdict};
