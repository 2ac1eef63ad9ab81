//! Test Transaction Producer
//!
//! Publishes a mix of ordinary and suspicious transactions to NATS for
//! exercising the pipeline.
//!
//! Usage: test-producer [nats_url] [subject] [count] [fraud_rate] [delay_ms]

use chrono::{Duration as ChronoDuration, Timelike, Utc};
use fraud_fusion_pipeline::types::{Transaction, TransactionCategory};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const MERCHANTS: &[&str] = &[
    "Grocery Mart",
    "Corner Cafe",
    "City Fuel",
    "Online Books",
    "Pharmacy Plus",
];

const HOME_LOCATIONS: &[&str] = &["New York, USA", "Chicago, USA", "Toronto, Canada"];

const RISKY_LOCATIONS: &[&str] = &["Lagos, Nigeria", "Tokyo, Japan", "Unknown Proxy"];

struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Everyday card purchase during business hours
    fn generate_ordinary(&mut self) -> Transaction {
        let now = Utc::now();
        let at = now
            .with_hour(self.rng.gen_range(9..21))
            .unwrap_or(now);

        Transaction::new(
            format!("tx_{}", Uuid::new_v4().simple()),
            format!("user_{}", self.rng.gen_range(1..500)),
            (self.rng.gen_range(5.0..400.0_f64) * 100.0).round() / 100.0,
        )
        .with_category(TransactionCategory::Card)
        .with_merchant(self.random_choice(MERCHANTS))
        .with_location(self.random_choice(HOME_LOCATIONS))
        .with_timestamp(at.to_rfc3339())
    }

    /// Large, late-night, far-away or location-less transfer
    fn generate_suspicious(&mut self) -> Transaction {
        let now = Utc::now();
        let at = now
            .with_hour(self.rng.gen_range(0..6))
            .unwrap_or(now - ChronoDuration::hours(12));

        let category = if self.rng.gen_bool(0.5) {
            TransactionCategory::Wire
        } else {
            TransactionCategory::Crypto
        };

        let tx = Transaction::new(
            format!("tx_{}", Uuid::new_v4().simple()),
            format!("user_{}", self.rng.gen_range(1..500)),
            (self.rng.gen_range(10_000.0..50_000.0_f64) * 100.0).round() / 100.0,
        )
        .with_category(category)
        .with_merchant("Electronics Store")
        .with_timestamp(at.to_rfc3339());

        if self.rng.gen_bool(0.7) {
            let location = self.random_choice(RISKY_LOCATIONS);
            tx.with_location(location)
        } else {
            tx
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} transactions...", count);

    let mut ordinary_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            ordinary_count += 1;
            generator.generate_ordinary()
        };

        let payload = serde_json::to_vec(&transaction)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} transactions ({} ordinary, {} suspicious)",
                i + 1,
                count,
                ordinary_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    // Publishing is buffered; make sure everything reached the server.
    client.flush().await?;

    info!(
        "Completed! Published {} transactions ({} ordinary, {} suspicious)",
        count, ordinary_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_ordinary()
        };

        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
