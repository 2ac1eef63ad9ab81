//! NATS publishing of verdicts

use crate::types::verdict::Verdict;
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Publishes every verdict, fraud or not, as JSON
#[derive(Clone)]
pub struct VerdictProducer {
    client: Client,
    subject: String,
}

impl VerdictProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    pub async fn publish(&self, verdict: &Verdict) -> Result<()> {
        let payload = serde_json::to_vec(verdict)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            transaction_id = %verdict.transaction_id,
            is_fraud = verdict.is_fraud,
            risk_tier = %verdict.risk_tier,
            "Published verdict"
        );

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
