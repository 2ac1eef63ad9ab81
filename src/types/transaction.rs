//! Transaction data structures submitted for fraud analysis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Payment rail the transaction travelled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    #[serde(alias = "credit_card")]
    Card,
    #[serde(alias = "wire_transfer")]
    Wire,
    Ach,
    Crypto,
    CashWithdrawal,
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionCategory::Card => "card",
            TransactionCategory::Wire => "wire",
            TransactionCategory::Ach => "ach",
            TransactionCategory::Crypto => "crypto",
            TransactionCategory::CashWithdrawal => "cash_withdrawal",
        };
        f.write_str(name)
    }
}

/// Reasons a transaction is rejected before any provider is called.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("amount must be a non-negative finite number, got {0}")]
    InvalidAmount(f64),

    #[error("currency must be a three-letter ISO code, got {0:?}")]
    InvalidCurrency(String),

    #[error("timestamp {value:?} is not an RFC 3339 instant: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// A financial transaction submitted for fraud analysis.
///
/// The timestamp is kept as submitted so that an unparseable value can be
/// rejected as a validation failure instead of a deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Caller-supplied unique identifier
    pub transaction_id: String,

    /// Customer/account the transaction belongs to
    #[serde(alias = "user_id")]
    pub subject_id: String,

    /// Monetary amount in `currency` units
    pub amount: f64,

    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(alias = "transaction_type")]
    pub category: TransactionCategory,

    #[serde(default)]
    pub merchant_name: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    /// RFC 3339 instant, e.g. `2025-11-12T03:14:00Z`
    pub timestamp: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Transaction {
    /// Create a card transaction stamped with the current time
    pub fn new(
        transaction_id: impl Into<String>,
        subject_id: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            subject_id: subject_id.into(),
            amount,
            currency: default_currency(),
            category: TransactionCategory::Card,
            merchant_name: None,
            location: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_category(mut self, category: TransactionCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_merchant(mut self, merchant_name: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant_name.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Parse the submitted timestamp into an absolute instant
    pub fn occurred_at(&self) -> Result<DateTime<Utc>, ValidationError> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| ValidationError::InvalidTimestamp {
                value: self.timestamp.clone(),
                reason: e.to_string(),
            })
    }

    /// Check every field a provider call depends on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.transaction_id.trim().is_empty() {
            return Err(ValidationError::MissingField("transaction_id"));
        }
        if self.subject_id.trim().is_empty() {
            return Err(ValidationError::MissingField("subject_id"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ValidationError::InvalidAmount(self.amount));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        self.occurred_at()?;
        Ok(())
    }

    /// Plain-text rendering handed to text-based collaborators
    /// (ensemble inference and similarity search).
    pub fn to_text(&self) -> String {
        format!(
            "Transaction: {}\nAmount: {:.2} {}\nMerchant: {}\nLocation: {}\nTime: {}",
            self.category,
            self.amount,
            self.currency,
            self.merchant_name.as_deref().unwrap_or("Unknown"),
            self.location.as_deref().unwrap_or("Unknown"),
            self.timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::new("tx_123", "user_9", 250.0)
            .with_merchant("Electronics Store")
            .with_location("Tokyo, Japan")
            .with_timestamp("2025-11-12T03:14:00Z")
    }

    #[test]
    fn test_valid_transaction() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_negative_amount() {
        let mut tx = sample();
        tx.amount = -1.0;
        assert_eq!(tx.validate(), Err(ValidationError::InvalidAmount(-1.0)));
    }

    #[test]
    fn test_rejects_nan_amount() {
        let mut tx = sample();
        tx.amount = f64::NAN;
        assert!(matches!(tx.validate(), Err(ValidationError::InvalidAmount(_))));
    }

    #[test]
    fn test_rejects_unparseable_timestamp() {
        let tx = sample().with_timestamp("yesterday at noon");
        assert!(matches!(
            tx.validate(),
            Err(ValidationError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_ids() {
        let mut tx = sample();
        tx.transaction_id = "  ".to_string();
        assert_eq!(tx.validate(), Err(ValidationError::MissingField("transaction_id")));

        let mut tx = sample();
        tx.subject_id.clear();
        assert_eq!(tx.validate(), Err(ValidationError::MissingField("subject_id")));
    }

    #[test]
    fn test_rejects_bad_currency() {
        let mut tx = sample();
        tx.currency = "usd".to_string();
        assert!(matches!(tx.validate(), Err(ValidationError::InvalidCurrency(_))));
    }

    #[test]
    fn test_offset_timestamp_normalized_to_utc() {
        let tx = sample().with_timestamp("2025-11-12T12:14:00+09:00");
        let at = tx.occurred_at().unwrap();
        assert_eq!(at.to_rfc3339(), "2025-11-12T03:14:00+00:00");
    }

    #[test]
    fn test_deserialize_with_aliases() {
        let json = r#"{
            "transaction_id": "TEST-002",
            "user_id": "USER-123",
            "amount": 15000.0,
            "transaction_type": "credit_card",
            "merchant_name": "Electronics Store",
            "timestamp": "2025-11-12T03:00:00Z"
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.subject_id, "USER-123");
        assert_eq!(tx.category, TransactionCategory::Card);
        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.location, None);
    }

    #[test]
    fn test_text_rendering() {
        let text = sample().to_text();
        assert!(text.contains("Amount: 250.00 USD"));
        assert!(text.contains("Merchant: Electronics Store"));
        assert!(text.contains("Transaction: card"));
    }
}
