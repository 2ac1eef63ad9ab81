//! Pipeline statistics and periodic reporting.

use crate::case_trigger::CASE_CREATION_FAILED;
use crate::types::signal::ProviderKind;
use crate::types::verdict::{RiskTier, Verdict};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// How often each provider contributed a signal
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub answered: u64,
    pub unavailable: u64,
}

impl Availability {
    /// Share of analyses in which the provider answered, in percent
    pub fn rate(&self) -> f64 {
        let total = self.answered + self.unavailable;
        if total == 0 {
            0.0
        } else {
            self.answered as f64 / total as f64 * 100.0
        }
    }
}

/// Metrics collector for the pipeline
pub struct PipelineMetrics {
    /// Verdicts produced
    pub analyses: AtomicU64,
    /// Verdicts flagged as fraud
    pub fraud_verdicts: AtomicU64,
    /// Transactions rejected before analysis (malformed or invalid)
    pub rejected: AtomicU64,
    pub cases_opened: AtomicU64,
    pub cases_failed: AtomicU64,
    /// Verdicts where fusion failed closed
    pub insufficient_data: AtomicU64,
    verdicts_by_tier: RwLock<BTreeMap<RiskTier, u64>>,
    availability: RwLock<BTreeMap<ProviderKind, Availability>>,
    /// End-to-end analysis latency (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            analyses: AtomicU64::new(0),
            fraud_verdicts: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            cases_opened: AtomicU64::new(0),
            cases_failed: AtomicU64::new(0),
            insufficient_data: AtomicU64::new(0),
            verdicts_by_tier: RwLock::new(BTreeMap::new()),
            availability: RwLock::new(BTreeMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed analysis
    pub fn record_verdict(&self, verdict: &Verdict, latency: Duration) {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        if verdict.is_fraud {
            self.fraud_verdicts.fetch_add(1, Ordering::Relaxed);
        }
        if verdict.is_insufficient_data() {
            self.insufficient_data.fetch_add(1, Ordering::Relaxed);
        }

        if verdict.case_id.is_some() {
            self.cases_opened.fetch_add(1, Ordering::Relaxed);
        } else if verdict
            .reasons
            .iter()
            .any(|r| r.starts_with(CASE_CREATION_FAILED))
        {
            self.cases_failed.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut by_tier) = self.verdicts_by_tier.write() {
            *by_tier.entry(verdict.risk_tier).or_insert(0) += 1;
        }

        if let Ok(mut availability) = self.availability.write() {
            for provider in verdict.signal_scores.keys() {
                availability.entry(*provider).or_default().answered += 1;
            }
            for provider in &verdict.unavailable_providers {
                availability.entry(*provider).or_default().unavailable += 1;
            }
        }

        if let Ok(mut latencies) = self.latencies.write() {
            latencies.push(latency.as_micros() as u64);
            // Keep only the most recent samples
            if latencies.len() > 10000 {
                latencies.drain(0..5000);
            }
        }

        let bucket = (verdict.confidence * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a transaction that never reached the providers
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        let Ok(latencies) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if latencies.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = latencies.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn get_availability(&self) -> BTreeMap<ProviderKind, Availability> {
        self.availability
            .read()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn get_verdicts_by_tier(&self) -> BTreeMap<RiskTier, u64> {
        self.verdicts_by_tier
            .read()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets.read().map(|b| *b).unwrap_or_default()
    }

    /// Analyses per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.analyses.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let analyses = self.analyses.load(Ordering::Relaxed);
        let fraud = self.fraud_verdicts.load(Ordering::Relaxed);
        let fraud_rate = if analyses > 0 {
            (fraud as f64 / analyses as f64) * 100.0
        } else {
            0.0
        };

        let latency = self.get_latency_stats();
        let by_tier = self.get_verdicts_by_tier();
        let availability = self.get_availability();
        let distribution = self.get_confidence_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FRAUD FUSION PIPELINE - METRICS SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Analyses:        {:>8}  │  Throughput: {:>6.1} tx/s        ║",
            analyses,
            self.get_throughput()
        );
        info!(
            "║ Fraud Verdicts:  {:>8}  │  Fraud Rate: {:>6.1}%            ║",
            fraud, fraud_rate
        );
        info!(
            "║ Rejected:        {:>8}  │  No Signal:  {:>8}            ║",
            self.rejected.load(Ordering::Relaxed),
            self.insufficient_data.load(Ordering::Relaxed)
        );
        info!(
            "║ Cases Opened:    {:>8}  │  Case Failures: {:>5}            ║",
            self.cases_opened.load(Ordering::Relaxed),
            self.cases_failed.load(Ordering::Relaxed)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Latency (μs): mean={:>6} p50={:>6} p95={:>6} p99={:>6}  ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Provider Availability:                                       ║");
        for (provider, counts) in &availability {
            info!(
                "║   {:20}: {:>5.1}% ({} answered, {} unavailable)",
                provider.as_str(),
                counts.rate(),
                counts.answered,
                counts.unavailable
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Verdicts by Risk Tier:                                       ║");
        for tier in RiskTier::ALL {
            let count = by_tier.get(&tier).copied().unwrap_or(0);
            let pct = if analyses > 0 {
                (count as f64 / analyses as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)", tier.as_str(), count, pct);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Confidence Distribution:                                     ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// End-to-end latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Prints a metrics summary at a fixed interval
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
