//! End-to-end analysis with scripted providers.

use fraud_fusion_pipeline::case_trigger::{reference_key, CaseTrigger, CASE_CREATION_FAILED};
use fraud_fusion_pipeline::config::FusionConfig;
use fraud_fusion_pipeline::fusion::{FusionEngine, INSUFFICIENT_SIGNAL_DATA};
use fraud_fusion_pipeline::providers::fixture::{Fixture, FixtureWorkflow};
use fraud_fusion_pipeline::providers::{
    ComplianceOutput, EnsembleOutput, PatternOutput, SignalProviders,
};
use fraud_fusion_pipeline::types::signal::{ProviderKind, SimilarMatch};
use fraud_fusion_pipeline::types::verdict::{FraudType, RiskTier};
use fraud_fusion_pipeline::{AnalysisError, FraudAnalyzer, Transaction};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FAST: Duration = Duration::from_millis(500);

fn large_transaction() -> Transaction {
    Transaction::new("tx_large", "user_42", 15_000.0)
        .with_merchant("Electronics Store")
        .with_location("Tokyo, Japan")
        .with_timestamp("2025-11-12T03:14:00Z")
}

fn ensemble(p: f64) -> Arc<Fixture<EnsembleOutput>> {
    Arc::new(Fixture::ok(EnsembleOutput {
        probability: Some(p),
        votes: vec![],
        risk_factors: vec!["Unusual transaction amount".to_string()],
    }))
}

fn pattern(p: f64) -> Arc<Fixture<PatternOutput>> {
    Arc::new(Fixture::ok(PatternOutput {
        is_suspicious: true,
        confidence: p,
        anomalies: vec!["Transaction outside normal hours".to_string()],
        risk_factors: vec![],
        explanation: None,
    }))
}

fn similarity(score: f64) -> Arc<Fixture<Vec<SimilarMatch>>> {
    Arc::new(Fixture::ok(vec![SimilarMatch {
        pattern_id: "fraud_001".to_string(),
        fraud_type: FraudType::CardFraud,
        description: "Multiple transactions from different countries within 1 hour".to_string(),
        similarity_score: score,
    }]))
}

fn compliance(risk_score: f64) -> Fixture<ComplianceOutput> {
    Fixture::ok(ComplianceOutput {
        status: "passed".to_string(),
        requires_sar_filing: false,
        risk_score,
        findings: vec![],
    })
}

fn analyzer(
    providers: SignalProviders,
    fusion: &FusionConfig,
    workflow: Arc<FixtureWorkflow>,
    min_tier: RiskTier,
) -> FraudAnalyzer {
    FraudAnalyzer::new(
        providers,
        FusionEngine::new(fusion),
        CaseTrigger::new(workflow, FAST, min_tier),
    )
}

#[tokio::test]
async fn test_single_ensemble_signal_opens_critical_case() {
    let workflow = Arc::new(FixtureWorkflow::new(Fixture::failing()));
    let providers = SignalProviders::new()
        .with_ensemble(ensemble(0.89), FAST)
        .with_pattern(Arc::new(Fixture::<PatternOutput>::failing()), FAST)
        .with_similarity(Arc::new(Fixture::<Vec<SimilarMatch>>::failing()), FAST)
        .with_workflow(workflow.clone(), FAST);
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow.clone(), RiskTier::High);

    let verdict = analyzer.analyze(&large_transaction()).await.unwrap();

    assert!((verdict.confidence - 0.89).abs() < 1e-9);
    assert!(verdict.is_fraud);
    assert_eq!(verdict.risk_tier, RiskTier::Critical);
    assert!(verdict
        .recommended_actions
        .contains(&"block transaction".to_string()));
    assert_eq!(verdict.reasons[0], "Unusual transaction amount");
    assert_eq!(
        verdict.unavailable_providers,
        [
            ProviderKind::PatternAnomaly,
            ProviderKind::SimilaritySearch,
            ProviderKind::WorkflowCompliance
        ]
    );
    assert_eq!(verdict.case_id.as_deref(), Some("CASE-0001"));
    assert_eq!(workflow.case_requests()[0].reference_key, reference_key("tx_large"));
}

#[tokio::test]
async fn test_all_providers_down_fails_closed() {
    let workflow = Arc::new(FixtureWorkflow::new(Fixture::failing()));
    let providers = SignalProviders::new()
        .with_ensemble(Arc::new(Fixture::<EnsembleOutput>::failing()), FAST)
        .with_pattern(Arc::new(Fixture::<PatternOutput>::failing()), FAST)
        .with_similarity(Arc::new(Fixture::<Vec<SimilarMatch>>::failing()), FAST)
        .with_workflow(workflow.clone(), FAST);
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow.clone(), RiskTier::High);

    let verdict = analyzer.analyze(&large_transaction()).await.unwrap();

    assert_eq!(verdict.confidence, 0.0);
    assert!(!verdict.is_fraud);
    assert_eq!(verdict.risk_tier, RiskTier::Low);
    assert_eq!(verdict.reasons, [INSUFFICIENT_SIGNAL_DATA]);
    assert!(verdict.case_id.is_none());
    assert!(workflow.case_requests().is_empty());
}

#[tokio::test]
async fn test_two_signals_renormalized_to_medium() {
    let workflow = Arc::new(FixtureWorkflow::new(Fixture::failing()));
    let providers = SignalProviders::new()
        .with_pattern(pattern(0.40), FAST)
        .with_similarity(similarity(0.20), FAST)
        .with_similarity_filter(5, 0.0)
        .with_workflow(workflow.clone(), FAST);
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow, RiskTier::High);

    let verdict = analyzer.analyze(&large_transaction()).await.unwrap();

    assert!((verdict.confidence - 0.32).abs() < 1e-9);
    assert_eq!(verdict.risk_tier, RiskTier::Medium);
    assert!(!verdict.is_fraud);
    assert_eq!(verdict.signal_scores.len(), 2);
    assert_eq!(verdict.recommended_actions, ["flag for monitoring"]);
}

#[tokio::test]
async fn test_slow_provider_times_out_without_blocking() {
    let slow = Arc::new(
        Fixture::ok(EnsembleOutput {
            probability: Some(0.99),
            ..Default::default()
        })
        .delayed(Duration::from_secs(10)),
    );
    let workflow = Arc::new(FixtureWorkflow::new(compliance(0.1)));
    let providers = SignalProviders::new()
        .with_ensemble(slow.clone(), Duration::from_millis(50))
        .with_pattern(pattern(0.2), FAST)
        .with_workflow(workflow.clone(), FAST);
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow, RiskTier::High);

    let started = Instant::now();
    let verdict = analyzer.analyze(&large_transaction()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(slow.calls(), 1);
    assert!(!verdict.signal_scores.contains_key(&ProviderKind::EnsembleInference));
    assert!(verdict
        .unavailable_providers
        .contains(&ProviderKind::EnsembleInference));
    // (0.2 * 0.30 + 0.1 * 0.15) / 0.45
    assert!((verdict.confidence - 0.075 / 0.45).abs() < 1e-9);
}

#[tokio::test]
async fn test_latency_tracks_slowest_provider() {
    let delay = Duration::from_millis(200);
    let workflow = Arc::new(FixtureWorkflow::new(compliance(0.1).delayed(delay)));
    let providers = SignalProviders::new()
        .with_ensemble(
            Arc::new(Fixture::ok(EnsembleOutput::default()).delayed(delay)),
            Duration::from_secs(2),
        )
        .with_pattern(
            Arc::new(
                Fixture::ok(PatternOutput {
                    is_suspicious: false,
                    confidence: 0.9,
                    anomalies: vec![],
                    risk_factors: vec![],
                    explanation: None,
                })
                .delayed(delay),
            ),
            Duration::from_secs(2),
        )
        .with_similarity(
            Arc::new(Fixture::ok(Vec::<SimilarMatch>::new()).delayed(delay)),
            Duration::from_secs(2),
        )
        .with_workflow(workflow.clone(), Duration::from_secs(2));
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow, RiskTier::High);

    let started = Instant::now();
    analyzer.analyze(&large_transaction()).await.unwrap();

    // Four sequential calls would need at least 800ms.
    assert!(started.elapsed() < Duration::from_millis(600));
}

#[tokio::test]
async fn test_invalid_transaction_calls_no_provider() {
    let ensemble = ensemble(0.9);
    let pattern = pattern(0.9);
    let similarity = similarity(0.9);
    let workflow = Arc::new(FixtureWorkflow::new(compliance(0.9)));
    let providers = SignalProviders::new()
        .with_ensemble(ensemble.clone(), FAST)
        .with_pattern(pattern.clone(), FAST)
        .with_similarity(similarity.clone(), FAST)
        .with_workflow(workflow.clone(), FAST);
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow.clone(), RiskTier::High);

    let bad = large_transaction().with_timestamp("yesterday");
    let result = analyzer.analyze(&bad).await;

    assert!(matches!(result, Err(AnalysisError::InvalidTransaction(_))));
    assert_eq!(ensemble.calls(), 0);
    assert_eq!(pattern.calls(), 0);
    assert_eq!(similarity.calls(), 0);
    assert_eq!(workflow.compliance_calls(), 0);
    assert!(workflow.case_requests().is_empty());
}

#[tokio::test]
async fn test_case_failure_keeps_determination() {
    let build = |workflow: Arc<FixtureWorkflow>| {
        let providers = SignalProviders::new()
            .with_ensemble(ensemble(0.95), FAST)
            .with_pattern(pattern(0.9), FAST)
            .with_workflow(workflow.clone(), FAST);
        analyzer(providers, &FusionConfig::default(), workflow, RiskTier::High)
    };

    let healthy = build(Arc::new(FixtureWorkflow::new(compliance(0.8))));
    let broken = build(Arc::new(FixtureWorkflow::new(compliance(0.8)).failing_cases()));

    let opened = healthy.analyze(&large_transaction()).await.unwrap();
    let failed = broken.analyze(&large_transaction()).await.unwrap();

    assert!(opened.case_id.is_some());
    assert!(failed.case_id.is_none());
    assert_eq!(failed.is_fraud, opened.is_fraud);
    assert_eq!(failed.confidence, opened.confidence);
    assert_eq!(failed.risk_tier, opened.risk_tier);
    assert_eq!(failed.recommended_actions, opened.recommended_actions);
    assert_eq!(failed.reasons[..opened.reasons.len()], opened.reasons[..]);
    assert!(failed
        .reasons
        .last()
        .unwrap()
        .starts_with(CASE_CREATION_FAILED));
}

#[tokio::test]
async fn test_repeat_analysis_reuses_case() {
    let workflow = Arc::new(FixtureWorkflow::new(compliance(0.8)));
    let providers = SignalProviders::new()
        .with_ensemble(ensemble(0.95), FAST)
        .with_workflow(workflow.clone(), FAST);
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow.clone(), RiskTier::High);

    let first = analyzer.analyze(&large_transaction()).await.unwrap();
    let second = analyzer.analyze(&large_transaction()).await.unwrap();

    assert_eq!(first.case_id, second.case_id);
    assert_eq!(workflow.case_requests().len(), 2);
    assert_eq!(workflow.cases_opened(), 1);
}

#[tokio::test]
async fn test_high_tier_case_depends_on_min_tier() {
    // Fraud from 0.6 so that a high-tier verdict can be flagged.
    let fusion = FusionConfig {
        fraud_threshold: 0.6,
        ..FusionConfig::default()
    };
    let run = |min_tier: RiskTier| {
        let workflow = Arc::new(FixtureWorkflow::new(Fixture::failing()));
        let providers = SignalProviders::new()
            .with_ensemble(ensemble(0.7), FAST)
            .with_workflow(workflow.clone(), FAST);
        (analyzer(providers, &fusion, workflow.clone(), min_tier), workflow)
    };

    let (at_high, workflow) = run(RiskTier::High);
    let verdict = at_high.analyze(&large_transaction()).await.unwrap();
    assert_eq!(verdict.risk_tier, RiskTier::High);
    assert!(verdict.is_fraud);
    assert!(verdict.case_id.is_some());
    assert_eq!(workflow.cases_opened(), 1);

    let (at_critical, workflow) = run(RiskTier::Critical);
    let verdict = at_critical.analyze(&large_transaction()).await.unwrap();
    assert!(verdict.is_fraud);
    assert!(verdict.case_id.is_none());
    assert!(workflow.case_requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_analysis_opens_no_case() {
    let delay = Duration::from_millis(300);
    let workflow = Arc::new(FixtureWorkflow::new(compliance(0.9)));
    let providers = SignalProviders::new()
        .with_ensemble(
            Arc::new(
                Fixture::ok(EnsembleOutput {
                    probability: Some(0.99),
                    ..Default::default()
                })
                .delayed(delay),
            ),
            Duration::from_secs(2),
        )
        .with_workflow(workflow.clone(), Duration::from_secs(2));
    let analyzer = analyzer(providers, &FusionConfig::default(), workflow.clone(), RiskTier::High);

    let tx = large_transaction();
    let outcome = tokio::time::timeout(Duration::from_millis(50), analyzer.analyze(&tx)).await;
    assert!(outcome.is_err());

    tokio::time::sleep(delay * 2).await;
    assert!(workflow.case_requests().is_empty());
}
