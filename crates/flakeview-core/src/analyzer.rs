//! Flaky-test analysis orchestration.
//!
//! Wires the scorer and the pattern detectors together for a single test's
//! history, and runs the cancellable bulk scan across every recording in
//! recent history. The bulk scan treats each recording group as an
//! independent unit of work: one group failing is logged and skipped, never
//! fatal to the scan.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::model::{
    FlakyCriteria, FlakyPatternType, FlakySeverity, FlakyTestAnalysis, TestExecutionResult,
};
use crate::patterns::detect_all;
use crate::scoring::score_executions;
use crate::stats::{mean, standard_deviation};
use crate::storage::ResultStore;

/// History page size. The bulk scan works from a single page of this size;
/// the dashboard pages through history in steps of it.
pub const HISTORY_SCAN_LIMIT: usize = 1000;

/// How much execution history backs an analysis, 0-100.
///
/// 50 points at `minimum_executions`, a 25-point bonus at 3x the minimum and
/// another at 5x.
pub fn analysis_confidence(execution_count: usize, criteria: &FlakyCriteria) -> f64 {
    if criteria.minimum_executions == 0 {
        return 100.0;
    }
    let mut confidence =
        (execution_count as f64 / criteria.minimum_executions as f64 * 50.0).min(100.0);
    if execution_count >= 3 * criteria.minimum_executions {
        confidence += 25.0;
    }
    if execution_count >= 5 * criteria.minimum_executions {
        confidence += 25.0;
    }
    confidence.min(100.0)
}

/// Analyzes one test's execution history.
///
/// Pure: fixed input always produces the identical analysis. Accepts results
/// in any order and sorts chronologically before running the detectors.
/// An empty history is a caller contract violation, not insufficient data.
pub fn analyze_results(
    results: &[TestExecutionResult],
    criteria: &FlakyCriteria,
) -> Result<FlakyTestAnalysis, AnalysisError> {
    if results.is_empty() {
        return Err(AnalysisError::EmptyResults);
    }
    let mut sorted: Vec<TestExecutionResult> = results.to_vec();
    sorted.sort_by_key(|r| r.started_at);

    let scored = score_executions(&sorted, criteria);
    let patterns = detect_all(&sorted);

    let mut recommendations = Vec::new();
    if scored.score > 50.0 {
        recommendations
            .push("Quarantine this test until the flakiness source is fixed".to_string());
    }
    if scored.pass_rate < 70.0 {
        recommendations
            .push("Review the test's assertions and preconditions; it fails more often than it passes cleanly".to_string());
    }
    if scored.flaky_failures > 3 {
        recommendations.push(
            "Add a bounded retry while the underlying cause is investigated".to_string(),
        );
        recommendations
            .push("Audit the test and system under test for race conditions".to_string());
    }
    for pattern in &patterns {
        push_unique(&mut recommendations, pattern.suggested_fix.clone());
    }

    let mut root_causes = Vec::new();
    for pattern in &patterns {
        push_unique(&mut root_causes, root_cause_for(pattern.pattern_type));
    }
    scan_error_messages(&sorted, &mut root_causes);

    let durations: Vec<f64> = sorted.iter().map(|r| r.duration_ms).collect();
    let execution_duration_std_dev = if durations.len() >= 2 {
        Some(standard_deviation(&durations))
    } else {
        None
    };

    let first = &sorted[0];
    let last = &sorted[sorted.len() - 1];

    Ok(FlakyTestAnalysis {
        recording_session_id: first.recording_session_id.clone(),
        test_name: first.test_name.clone(),
        flakiness_score: scored.score,
        severity: scored.severity,
        total_executions: sorted.len(),
        flaky_failure_count: scored.flaky_failures,
        consistent_pass_count: scored.longest_pass_run,
        consistent_failure_count: scored.consecutive_failures,
        pass_rate: scored.pass_rate,
        duration_variability: scored.duration_variability,
        patterns,
        recommendations,
        root_causes,
        analysis_confidence: analysis_confidence(sorted.len(), criteria),
        average_time_to_failure: average_time_to_failure(&sorted, first.started_at),
        execution_duration_std_dev,
        last_execution_at: Some(last.started_at),
    })
}

/// Mean hours from the start of the history to each failure; `None` when
/// the history contains no failures.
fn average_time_to_failure(
    sorted: &[TestExecutionResult],
    history_start: DateTime<Utc>,
) -> Option<f64> {
    let hours: Vec<f64> = sorted
        .iter()
        .filter(|r| r.is_failed())
        .map(|r| (r.started_at - history_start).num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    if hours.is_empty() { None } else { Some(mean(&hours)) }
}

fn root_cause_for(pattern_type: FlakyPatternType) -> String {
    match pattern_type {
        FlakyPatternType::Intermittent => {
            "Race condition between the test and the system under test".to_string()
        }
        FlakyPatternType::Temporal => {
            "Environment load or scheduled activity at specific times of day".to_string()
        }
        FlakyPatternType::TimingDependent => {
            "Latency variance with waits or timeouts tuned too tight".to_string()
        }
        FlakyPatternType::Sequential => {
            "State leaking between executions on a fixed cadence".to_string()
        }
        FlakyPatternType::Degrading => {
            "Progressive resource exhaustion or accumulating data".to_string()
        }
    }
}

/// Mines failure messages for well-known flakiness signatures.
fn scan_error_messages(sorted: &[TestExecutionResult], root_causes: &mut Vec<String>) {
    for result in sorted.iter().filter(|r| r.is_failed()) {
        let Some(message) = &result.error_message else {
            continue;
        };
        let message = message.to_lowercase();
        if message.contains("timeout") {
            push_unique(
                root_causes,
                "Operations exceed their timeouts under load".to_string(),
            );
        }
        if message.contains("element not found") || message.contains("selector") {
            push_unique(
                root_causes,
                "Unstable selectors or DOM rendering races".to_string(),
            );
        }
        if message.contains("stale element") {
            push_unique(
                root_causes,
                "DOM re-renders invalidating held element references".to_string(),
            );
        }
    }
}

fn push_unique(list: &mut Vec<String>, entry: String) {
    if !list.contains(&entry) {
        list.push(entry);
    }
}

/// Orchestrates analysis over the storage collaborator.
pub struct FlakyTestAnalyzer<S: ResultStore> {
    store: Arc<S>,
}

impl<S: ResultStore> FlakyTestAnalyzer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Analyzes one recording session's history.
    ///
    /// Fewer results than `criteria.minimum_executions` is an expected
    /// state, not an error: it yields a zero-confidence placeholder whose
    /// only recommendation is to gather more executions.
    pub async fn analyze_recording(
        &self,
        recording_id: &str,
        criteria: &FlakyCriteria,
    ) -> Result<FlakyTestAnalysis, AnalysisError> {
        let results = self.store.get_results_by_recording(recording_id).await?;
        if results.len() < criteria.minimum_executions {
            debug!(
                recording_id,
                executions = results.len(),
                minimum = criteria.minimum_executions,
                "insufficient data, returning placeholder analysis"
            );
            return Ok(placeholder_analysis(recording_id, &results, criteria));
        }
        analyze_results(&results, criteria)
    }

    /// Scans recent history for flaky tests.
    ///
    /// Equivalent to [`Self::get_all_flaky_with_cancel`] with a token that
    /// never cancels.
    pub async fn get_all_flaky(
        &self,
        criteria: &FlakyCriteria,
    ) -> Result<Vec<FlakyTestAnalysis>, AnalysisError> {
        self.get_all_flaky_with_cancel(criteria, &CancellationToken::new())
            .await
    }

    /// Scans the most recent [`HISTORY_SCAN_LIMIT`] results, groups them by
    /// recording session, and analyzes each sufficiently large group
    /// independently.
    ///
    /// Returns only analyses judged flaky, sorted by score descending. A
    /// failure analyzing one group is logged and that group skipped; the
    /// scan still succeeds with whatever groups analyzed cleanly.
    /// Cancellation stops issuing further group analyses without discarding
    /// results already gathered.
    pub async fn get_all_flaky_with_cancel(
        &self,
        criteria: &FlakyCriteria,
        cancel: &CancellationToken,
    ) -> Result<Vec<FlakyTestAnalysis>, AnalysisError> {
        let page = self
            .store
            .get_execution_history(0, HISTORY_SCAN_LIMIT)
            .await?;

        let mut groups: BTreeMap<String, Vec<TestExecutionResult>> = BTreeMap::new();
        for result in page {
            groups
                .entry(result.recording_session_id.clone())
                .or_default()
                .push(result);
        }
        groups.retain(|_, results| results.len() >= criteria.minimum_executions);

        Ok(scan_groups(groups, criteria, cancel))
    }
}

/// Analyzes each recording group, isolating per-group failures.
fn scan_groups(
    groups: BTreeMap<String, Vec<TestExecutionResult>>,
    criteria: &FlakyCriteria,
    cancel: &CancellationToken,
) -> Vec<FlakyTestAnalysis> {
    let mut flaky = Vec::new();
    for (recording_id, results) in groups {
        if cancel.is_cancelled() {
            debug!("bulk flaky scan cancelled, returning partial results");
            break;
        }
        match analyze_results(&results, criteria) {
            Ok(analysis) => {
                if analysis.is_flaky() {
                    flaky.push(analysis);
                }
            }
            Err(err) => {
                warn!(
                    recording_id = %recording_id,
                    error = %err,
                    "skipping recording group during bulk flaky scan"
                );
            }
        }
    }
    flaky.sort_by(|a, b| {
        b.flakiness_score
            .total_cmp(&a.flakiness_score)
            .then_with(|| a.recording_session_id.cmp(&b.recording_session_id))
    });
    flaky
}

/// Well-formed zero-confidence analysis for a recording with too little
/// history.
fn placeholder_analysis(
    recording_id: &str,
    results: &[TestExecutionResult],
    criteria: &FlakyCriteria,
) -> FlakyTestAnalysis {
    FlakyTestAnalysis {
        recording_session_id: recording_id.to_string(),
        test_name: results
            .first()
            .map_or_else(String::new, |r| r.test_name.clone()),
        flakiness_score: 0.0,
        severity: FlakySeverity::None,
        total_executions: results.len(),
        flaky_failure_count: 0,
        consistent_pass_count: 0,
        consistent_failure_count: 0,
        pass_rate: crate::model::pass_rate(results),
        duration_variability: 0.0,
        patterns: Vec::new(),
        recommendations: vec![format!(
            "Run more executions before drawing conclusions: {} of {} required are recorded",
            results.len(),
            criteria.minimum_executions
        )],
        root_causes: Vec::new(),
        analysis_confidence: 0.0,
        average_time_to_failure: None,
        execution_duration_std_dev: None,
        last_execution_at: results.last().map(|r| r.started_at),
    }
}
