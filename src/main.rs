//! Fraud Fusion Pipeline - Main Entry Point
//!
//! Consumes transactions from NATS, queries the four signal providers
//! concurrently, fuses their answers into a verdict and publishes it.

use anyhow::{Context, Result};
use fraud_fusion_pipeline::{
    analyzer::FraudAnalyzer,
    config::{AppConfig, LoggingConfig},
    consumer::{decode_transaction, TransactionConsumer},
    metrics::{MetricsReporter, PipelineMetrics},
    producer::VerdictProducer,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fraud_fusion_pipeline={}", logging.level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Fusion Pipeline");
    info!(
        "Fraud threshold: {:.2}, Risk tiers: medium>={:.2}, high>={:.2}, critical>={:.2}",
        config.fusion.fraud_threshold,
        config.fusion.risk_tiers.medium,
        config.fusion.risk_tiers.high,
        config.fusion.risk_tiers.critical
    );

    let metrics = Arc::new(PipelineMetrics::new());
    let analyzer = Arc::new(FraudAnalyzer::from_config(&config)?);

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(VerdictProducer::new(client.clone(), &config.nats.verdict_subject));

    let num_workers = config.pipeline.workers;
    info!(
        workers = num_workers,
        transactions = %consumer.subject(),
        verdicts = %producer.subject(),
        "Starting transaction processing loop"
    );

    // Bounds the number of analyses in flight
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let analyzer = analyzer.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let transaction = match decode_transaction(&message.payload) {
                Ok(transaction) => transaction,
                Err(e) => {
                    metrics.record_rejected();
                    warn!(error = %e, "Failed to deserialize transaction");
                    return;
                }
            };

            match analyzer.analyze(&transaction).await {
                Ok(verdict) => {
                    metrics.record_verdict(&verdict, start_time.elapsed());

                    if let Err(e) = producer.publish(&verdict).await {
                        error!(
                            transaction_id = %verdict.transaction_id,
                            error = %e,
                            "Failed to publish verdict"
                        );
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let latency = metrics.get_latency_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} tx/s", metrics.get_throughput()),
                            avg_latency_us = latency.mean_us,
                            "Processing milestone"
                        );
                    }
                }
                Err(e) => {
                    metrics.record_rejected();
                    warn!(
                        transaction_id = %transaction.transaction_id,
                        error = %e,
                        "Transaction rejected"
                    );
                }
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
