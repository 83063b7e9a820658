//! End-to-end pipeline: storage snapshot -> analyzer -> trends -> dashboard,
//! exercised through the public API only.

use std::sync::Arc;

use chrono::{Duration, Utc};
use flakeview_core::testing::HistoryBuilder;
use flakeview_core::{
    AnalysisError, DashboardAggregator, FlakyCriteria, FlakyPatternType, FlakySeverity,
    FlakyTestAnalyzer, HealthStatus, MemoryResultStore, StabilityClass, TestExecutionResult,
    TrendInterval, analyze_results, calculate_stability, calculate_trends,
};

fn suite_snapshot() -> Vec<TestExecutionResult> {
    // A flaky login test, a stable checkout test, and a recording too thin
    // to analyze, all within the last two days.
    let start = Utc::now() - Duration::days(2);
    let mut results = HistoryBuilder::new("login")
        .recording("rec-login")
        .starting_at(start)
        .spaced_by(Duration::hours(1))
        .push_pattern("PPFPFPPFPP", 1000.0, 3000.0)
        .build();
    results.extend(
        HistoryBuilder::new("checkout")
            .recording("rec-checkout")
            .starting_at(start)
            .spaced_by(Duration::hours(1))
            .push_pattern("PPPPPPPPPP", 1000.0, 1000.0)
            .build(),
    );
    results.extend(
        HistoryBuilder::new("signup")
            .recording("rec-signup")
            .starting_at(start)
            .spaced_by(Duration::hours(1))
            .push_pattern("PFP", 1000.0, 3000.0)
            .build(),
    );
    results
}

#[tokio::test]
async fn full_pipeline_flags_the_flaky_test_only() {
    let store = Arc::new(MemoryResultStore::new(suite_snapshot()));
    let analyzer = FlakyTestAnalyzer::new(Arc::clone(&store));
    let criteria = FlakyCriteria::default();

    let flaky = analyzer.get_all_flaky(&criteria).await.unwrap();
    assert_eq!(flaky.len(), 1);
    assert_eq!(flaky[0].recording_session_id, "rec-login");
    assert!(
        flaky[0]
            .patterns
            .iter()
            .any(|p| p.pattern_type == FlakyPatternType::Intermittent)
    );

    // The thin recording yields a placeholder, not an error.
    let placeholder = analyzer.analyze_recording("rec-signup", &criteria).await.unwrap();
    assert_eq!(placeholder.severity, FlakySeverity::None);
    assert_eq!(placeholder.analysis_confidence, 0.0);
}

#[tokio::test]
async fn dashboard_reflects_analyzer_and_trends() {
    let store = Arc::new(MemoryResultStore::new(suite_snapshot()));
    let dashboard = DashboardAggregator::new(store)
        .build_dashboard(&FlakyCriteria::default())
        .await
        .unwrap();

    assert_eq!(dashboard.total_executions, 23);
    assert_eq!(dashboard.total_tests, 3);
    assert_eq!(dashboard.flaky_test_count, 1);
    assert_eq!(dashboard.stable_test_count, 2);
    assert_ne!(dashboard.health, HealthStatus::Unknown);

    let bucketed: usize = dashboard
        .recent_trends
        .iter()
        .map(|t| t.total_executions)
        .sum();
    assert_eq!(bucketed, 23);
}

#[test]
fn analysis_stability_and_trends_agree_on_one_history() {
    let history = HistoryBuilder::new("login")
        .recording("rec-login")
        .spaced_by(Duration::hours(1))
        .push_pattern("PPFPFPPFPP", 1000.0, 3000.0)
        .build();
    let criteria = FlakyCriteria::default();

    let analysis = analyze_results(&history, &criteria).unwrap();
    assert_eq!(analysis.pass_rate, 70.0);
    assert!(analysis.is_flaky());

    let start = history[0].started_at;
    let end = history[9].started_at;
    let stability = calculate_stability(&history, start, end, &criteria);
    assert_eq!(stability.pass_rate, 70.0);
    assert_ne!(stability.stability_class, StabilityClass::Stable);
    assert_eq!(stability.total_executions, analysis.total_executions);

    let trends = calculate_trends(&history, TrendInterval::Hourly, start, end, Some("rec-login"));
    let total: usize = trends.iter().map(|t| t.total_executions).sum();
    assert_eq!(total, analysis.total_executions);
}

#[test]
fn empty_input_is_an_explicit_error() {
    let err = analyze_results(&[], &FlakyCriteria::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyResults));
}
