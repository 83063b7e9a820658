//! Suite-wide dashboard snapshot.
//!
//! Composes the analyzer and the trend aggregator into a single
//! health-classified summary: totals, windowed pass rates, top-N lists, and
//! recent daily trends.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::analyzer::{FlakyTestAnalyzer, HISTORY_SCAN_LIMIT};
use crate::error::AnalysisError;
use crate::model::{
    DashboardStatistics, FlakyCriteria, HealthStatus, TestExecutionResult, TestExecutionSummary,
    TrendInterval, pass_rate,
};
use crate::storage::ResultStore;
use crate::trends::calculate_trends;

/// Length of the top-executed, top-failing, and slowest lists.
pub const TOP_N: usize = 10;

/// Trailing window for the top-N lists and recent trends, in days.
pub const TRAILING_WINDOW_DAYS: i64 = 30;

/// Builds [`DashboardStatistics`] snapshots from the storage collaborator.
pub struct DashboardAggregator<S: ResultStore> {
    store: Arc<S>,
    analyzer: FlakyTestAnalyzer<S>,
}

impl<S: ResultStore> DashboardAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        let analyzer = FlakyTestAnalyzer::new(Arc::clone(&store));
        Self { store, analyzer }
    }

    /// Computes a full dashboard snapshot over the complete history.
    pub async fn build_dashboard(
        &self,
        criteria: &FlakyCriteria,
    ) -> Result<DashboardStatistics, AnalysisError> {
        let history = self.fetch_full_history().await?;
        let now = Utc::now();

        let total_executions = history.len();
        let total_tests = history
            .iter()
            .map(|r| r.test_name.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();

        let overall_pass_rate = pass_rate(&history);
        let pass_rate_last_24_hours = windowed_pass_rate(&history, now, Duration::hours(24));
        let pass_rate_last_7_days = windowed_pass_rate(&history, now, Duration::days(7));
        let pass_rate_last_30_days = windowed_pass_rate(&history, now, Duration::days(30));

        let flaky = self.analyzer.get_all_flaky(criteria).await?;
        let flaky_test_count = flaky.len();
        let stable_test_count = total_tests.saturating_sub(flaky_test_count);

        let total_duration_ms: f64 = history.iter().map(|r| r.duration_ms).sum();
        let average_duration_ms = if history.is_empty() {
            0.0
        } else {
            total_duration_ms / history.len() as f64
        };

        let window_start = now - Duration::days(TRAILING_WINDOW_DAYS);
        let trailing: Vec<TestExecutionResult> = history
            .iter()
            .filter(|r| r.started_at >= window_start)
            .cloned()
            .collect();
        let summaries = summarize_per_test(&trailing);

        let recent_trends =
            calculate_trends(&trailing, TrendInterval::Daily, window_start, now, None);

        Ok(DashboardStatistics {
            total_executions,
            total_tests,
            overall_pass_rate,
            pass_rate_last_24_hours,
            pass_rate_last_7_days,
            pass_rate_last_30_days,
            flaky_test_count,
            stable_test_count,
            average_duration_ms,
            total_duration_ms,
            most_executed: top_executed(&summaries),
            most_failing: top_failing(&summaries),
            slowest: top_slowest(&summaries),
            recent_trends,
            health: classify_health(total_executions, total_tests, overall_pass_rate, flaky_test_count),
            generated_at: now,
        })
    }

    /// Pages through `get_execution_history` until a short page signals the
    /// end. Suite-wide totals and pass rates cover every stored result, not
    /// just the first page.
    async fn fetch_full_history(&self) -> Result<Vec<TestExecutionResult>, AnalysisError> {
        let mut history = Vec::new();
        loop {
            let page = self
                .store
                .get_execution_history(history.len(), HISTORY_SCAN_LIMIT)
                .await?;
            let exhausted = page.len() < HISTORY_SCAN_LIMIT;
            history.extend(page);
            if exhausted {
                break;
            }
        }
        Ok(history)
    }
}

fn windowed_pass_rate(
    history: &[TestExecutionResult],
    now: DateTime<Utc>,
    window: Duration,
) -> f64 {
    let cutoff = now - window;
    let windowed: Vec<TestExecutionResult> = history
        .iter()
        .filter(|r| r.started_at >= cutoff)
        .cloned()
        .collect();
    pass_rate(&windowed)
}

/// Per-test rollups over the trailing window, one summary per test name.
fn summarize_per_test(results: &[TestExecutionResult]) -> Vec<TestExecutionSummary> {
    struct Rollup {
        executions: usize,
        failures: usize,
        duration_sum: f64,
        last_executed_at: Option<DateTime<Utc>>,
    }
    let mut rollups: BTreeMap<&str, Rollup> = BTreeMap::new();
    for result in results {
        let rollup = rollups.entry(result.test_name.as_str()).or_insert(Rollup {
            executions: 0,
            failures: 0,
            duration_sum: 0.0,
            last_executed_at: None,
        });
        rollup.executions += 1;
        if result.is_failed() {
            rollup.failures += 1;
        }
        rollup.duration_sum += result.duration_ms;
        if rollup.last_executed_at.is_none_or(|t| result.started_at > t) {
            rollup.last_executed_at = Some(result.started_at);
        }
    }
    rollups
        .into_iter()
        .map(|(name, rollup)| TestExecutionSummary {
            test_name: name.to_string(),
            execution_count: rollup.executions,
            failure_count: rollup.failures,
            pass_rate: (rollup.executions - rollup.failures) as f64 / rollup.executions as f64
                * 100.0,
            average_duration_ms: rollup.duration_sum / rollup.executions as f64,
            last_executed_at: rollup.last_executed_at,
        })
        .collect()
}

fn top_executed(summaries: &[TestExecutionSummary]) -> Vec<TestExecutionSummary> {
    let mut ranked = summaries.to_vec();
    ranked.sort_by(|a, b| {
        b.execution_count
            .cmp(&a.execution_count)
            .then_with(|| a.test_name.cmp(&b.test_name))
    });
    ranked.truncate(TOP_N);
    ranked
}

/// Highest failure count first; equal counts break toward the lower pass
/// rate.
fn top_failing(summaries: &[TestExecutionSummary]) -> Vec<TestExecutionSummary> {
    let mut ranked: Vec<TestExecutionSummary> = summaries
        .iter()
        .filter(|s| s.failure_count > 0)
        .cloned()
        .collect();
    ranked.sort_by(|a, b| {
        b.failure_count
            .cmp(&a.failure_count)
            .then_with(|| a.pass_rate.total_cmp(&b.pass_rate))
            .then_with(|| a.test_name.cmp(&b.test_name))
    });
    ranked.truncate(TOP_N);
    ranked
}

fn top_slowest(summaries: &[TestExecutionSummary]) -> Vec<TestExecutionSummary> {
    let mut ranked = summaries.to_vec();
    ranked.sort_by(|a, b| {
        b.average_duration_ms
            .total_cmp(&a.average_duration_ms)
            .then_with(|| a.test_name.cmp(&b.test_name))
    });
    ranked.truncate(TOP_N);
    ranked
}

fn classify_health(
    total_executions: usize,
    total_tests: usize,
    pass_rate: f64,
    flaky_test_count: usize,
) -> HealthStatus {
    if total_executions == 0 || total_tests == 0 {
        return HealthStatus::Unknown;
    }
    let flaky_pct = flaky_test_count as f64 / total_tests as f64 * 100.0;
    if pass_rate > 95.0 && flaky_pct < 5.0 {
        HealthStatus::Excellent
    } else if (85.0..=95.0).contains(&pass_rate) && flaky_pct < 10.0 {
        HealthStatus::Good
    } else if (70.0..85.0).contains(&pass_rate) && flaky_pct < 20.0 {
        HealthStatus::Fair
    } else {
        HealthStatus::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryResultStore;
    use crate::testing::HistoryBuilder;

    fn recent(test_name: &str, recording: &str, pattern: &str) -> Vec<TestExecutionResult> {
        HistoryBuilder::new(test_name)
            .recording(recording)
            .starting_at(Utc::now() - Duration::days(2))
            .spaced_by(Duration::hours(1))
            .push_pattern(pattern, 1000.0, 3000.0)
            .build()
    }

    fn aggregator(results: Vec<TestExecutionResult>) -> DashboardAggregator<MemoryResultStore> {
        DashboardAggregator::new(Arc::new(MemoryResultStore::new(results)))
    }

    #[tokio::test]
    async fn empty_store_is_unknown_health() {
        let dashboard = aggregator(Vec::new())
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        assert_eq!(dashboard.health, HealthStatus::Unknown);
        assert_eq!(dashboard.total_executions, 0);
        assert_eq!(dashboard.total_tests, 0);
        assert!(dashboard.most_executed.is_empty());
        assert!(dashboard.recent_trends.is_empty());
    }

    #[tokio::test]
    async fn all_passing_suite_is_excellent() {
        let mut results = recent("login", "rec-login", "PPPPPPPPPP");
        results.extend(recent("checkout", "rec-checkout", "PPPPPPPPPP"));
        let dashboard = aggregator(results)
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        assert_eq!(dashboard.health, HealthStatus::Excellent);
        assert_eq!(dashboard.total_tests, 2);
        assert_eq!(dashboard.flaky_test_count, 0);
        assert_eq!(dashboard.stable_test_count, 2);
        assert_eq!(dashboard.overall_pass_rate, 100.0);
        assert!(!dashboard.recent_trends.is_empty());
    }

    #[tokio::test]
    async fn flaky_heavy_suite_is_poor() {
        let mut results = recent("login", "rec-login", "PFPFPFPFPF");
        results.extend(recent("checkout", "rec-checkout", "PPPPPPPPPP"));
        let dashboard = aggregator(results)
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        // Half the suite is flaky: no ladder rung tolerates 50%.
        assert_eq!(dashboard.flaky_test_count, 1);
        assert_eq!(dashboard.health, HealthStatus::Poor);
    }

    #[tokio::test]
    async fn top_failing_breaks_ties_toward_lower_pass_rate() {
        // Both fail twice; "checkout" has fewer total runs, so a lower
        // pass rate, and must rank first.
        let mut results = recent("login", "rec-login", "PPPPPPPPFF");
        results.extend(recent("checkout", "rec-checkout", "PPFF"));
        let dashboard = aggregator(results)
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        let names: Vec<_> = dashboard
            .most_failing
            .iter()
            .map(|s| s.test_name.as_str())
            .collect();
        assert_eq!(names, vec!["checkout", "login"]);
    }

    #[tokio::test]
    async fn top_lists_rank_executions_and_duration() {
        let mut results = recent("busy", "rec-busy", "PPPPPPPPPPPP");
        results.extend(recent("slow", "rec-slow", "FFFF"));
        let dashboard = aggregator(results)
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        assert_eq!(dashboard.most_executed[0].test_name, "busy");
        // Failures run at 3000ms against 1000ms passes.
        assert_eq!(dashboard.slowest[0].test_name, "slow");
        assert_eq!(dashboard.slowest[0].average_duration_ms, 3000.0);
    }

    #[tokio::test]
    async fn totals_cover_history_beyond_one_page() {
        // 1500 stored results span two history pages; suite-wide totals
        // must count all of them.
        let pattern = "P".repeat(HISTORY_SCAN_LIMIT + 500);
        let results = HistoryBuilder::new("login")
            .recording("rec-login")
            .starting_at(Utc::now() - Duration::days(2))
            .spaced_by(Duration::minutes(1))
            .push_pattern(&pattern, 1000.0, 3000.0)
            .build();
        let dashboard = aggregator(results)
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        assert_eq!(dashboard.total_executions, HISTORY_SCAN_LIMIT + 500);
        assert_eq!(dashboard.total_tests, 1);
        assert_eq!(dashboard.overall_pass_rate, 100.0);
    }

    #[tokio::test]
    async fn windowed_pass_rates_exclude_old_failures() {
        // Failures five days back, passes within the last few hours.
        let mut results = HistoryBuilder::new("login")
            .recording("rec-login")
            .starting_at(Utc::now() - Duration::days(5))
            .spaced_by(Duration::minutes(30))
            .push_pattern("FFFF", 1000.0, 3000.0)
            .build();
        results.extend(
            HistoryBuilder::new("login")
                .recording("rec-login")
                .starting_at(Utc::now() - Duration::hours(6))
                .spaced_by(Duration::minutes(30))
                .push_pattern("PPPPPP", 1000.0, 3000.0)
                .build(),
        );
        let dashboard = aggregator(results)
            .build_dashboard(&FlakyCriteria::default())
            .await
            .unwrap();
        assert_eq!(dashboard.pass_rate_last_24_hours, 100.0);
        assert_eq!(dashboard.overall_pass_rate, 60.0);
        assert!(dashboard.pass_rate_last_7_days < 100.0);
    }

    #[test]
    fn health_ladder_boundaries() {
        assert_eq!(classify_health(0, 0, 0.0, 0), HealthStatus::Unknown);
        assert_eq!(classify_health(100, 10, 96.0, 0), HealthStatus::Excellent);
        assert_eq!(classify_health(100, 10, 95.0, 0), HealthStatus::Good);
        assert_eq!(classify_health(100, 10, 85.0, 0), HealthStatus::Good);
        assert_eq!(classify_health(100, 10, 84.9, 1), HealthStatus::Fair);
        assert_eq!(classify_health(100, 10, 70.0, 1), HealthStatus::Fair);
        assert_eq!(classify_health(100, 10, 69.9, 0), HealthStatus::Poor);
        assert_eq!(classify_health(100, 10, 96.0, 1), HealthStatus::Poor);
        assert_eq!(classify_health(100, 20, 90.0, 1), HealthStatus::Good);
    }
}
