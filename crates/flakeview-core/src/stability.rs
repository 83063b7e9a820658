//! Stability assessment over a time window.
//!
//! Where the flakiness scorer asks "does this test lie?", the stability
//! calculator asks "is it getting better or worse?": streaks, MTBF/MTTR,
//! rolling pass-rate variance, and quarter-over-quarter trend direction.

use chrono::{DateTime, Duration, Utc};

use crate::analyzer::analysis_confidence;
use crate::model::{
    FlakyCriteria, StabilityClass, TestExecutionResult, TestStabilityMetrics, pass_rate,
};
use crate::stats::{coefficient_of_variation, mean, standard_deviation};

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Assesses stability over the trailing `days` ending now.
pub fn stability_over_trailing_days(
    results: &[TestExecutionResult],
    days: i64,
    criteria: &FlakyCriteria,
) -> TestStabilityMetrics {
    let window_end = Utc::now();
    calculate_stability(results, window_end - Duration::days(days), window_end, criteria)
}

/// Assesses stability of one test over `[window_start, window_end]`.
///
/// Results outside the window are ignored; the remainder is sorted
/// chronologically before any streak or transition math. An empty window
/// yields a well-formed `Unknown` assessment rather than an error.
pub fn calculate_stability(
    results: &[TestExecutionResult],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    criteria: &FlakyCriteria,
) -> TestStabilityMetrics {
    let mut windowed: Vec<&TestExecutionResult> = results
        .iter()
        .filter(|r| r.started_at >= window_start && r.started_at <= window_end)
        .collect();
    windowed.sort_by_key(|r| r.started_at);

    let exemplar = windowed.first().copied().or_else(|| results.first());
    let (recording_session_id, test_name) = exemplar.map_or_else(
        || (String::new(), String::new()),
        |r| (r.recording_session_id.clone(), r.test_name.clone()),
    );

    if windowed.is_empty() {
        return TestStabilityMetrics {
            recording_session_id,
            test_name,
            stability_class: StabilityClass::Unknown,
            stability_score: 0.0,
            pass_rate: 0.0,
            pass_rate_last_7_days: 0.0,
            longest_pass_streak: 0,
            current_pass_streak: 0,
            current_failure_streak: 0,
            mean_time_between_failures_hours: None,
            mean_time_to_recovery_hours: None,
            pass_rate_std_dev: 0.0,
            trend_direction: 0,
            stability_change_rate: 0.0,
            average_duration_ms: 0.0,
            duration_std_dev_ms: 0.0,
            window_start,
            window_end,
            total_executions: 0,
            failure_count: 0,
            assessment_confidence: 0.0,
        };
    }

    let owned: Vec<TestExecutionResult> = windowed.iter().map(|r| (*r).clone()).collect();
    let rate = pass_rate(&owned);

    let last_7_start = window_end - Duration::days(7);
    let last_7: Vec<TestExecutionResult> = owned
        .iter()
        .filter(|r| r.started_at >= last_7_start)
        .cloned()
        .collect();
    let pass_rate_last_7_days = pass_rate(&last_7);

    let durations: Vec<f64> = owned.iter().map(|r| r.duration_ms).collect();
    let cv = coefficient_of_variation(&durations);
    let flaky_failures = owned
        .windows(2)
        .filter(|pair| pair[0].is_failed() && pair[1].is_passed())
        .count();

    let stability_score = (0.5 * rate
        + 0.3 * (100.0 - cv * 100.0).max(0.0)
        + 0.2 * (100.0 - flaky_failures as f64 * 10.0).max(0.0))
    .clamp(0.0, 100.0);

    let stability_class = classify(stability_score, rate);

    TestStabilityMetrics {
        recording_session_id,
        test_name,
        stability_class,
        stability_score,
        pass_rate: rate,
        pass_rate_last_7_days,
        longest_pass_streak: longest_pass_streak(&owned),
        current_pass_streak: trailing_streak(&owned, |r| r.is_passed()),
        current_failure_streak: trailing_streak(&owned, |r| r.is_failed()),
        mean_time_between_failures_hours: mean_time_between_failures(&owned),
        mean_time_to_recovery_hours: mean_time_to_recovery(&owned),
        pass_rate_std_dev: rolling_pass_rate_std_dev(&owned),
        trend_direction: trend_direction(&owned),
        stability_change_rate: stability_change_rate(&owned, window_start, window_end),
        average_duration_ms: mean(&durations),
        duration_std_dev_ms: standard_deviation(&durations),
        window_start,
        window_end,
        total_executions: owned.len(),
        failure_count: owned.iter().filter(|r| r.is_failed()).count(),
        assessment_confidence: analysis_confidence(owned.len(), criteria),
    }
}

fn classify(score: f64, rate: f64) -> StabilityClass {
    if score >= 95.0 && rate >= 95.0 {
        StabilityClass::Stable
    } else if score >= 85.0 && rate >= 85.0 {
        StabilityClass::MostlyStable
    } else if score >= 70.0 && rate >= 70.0 {
        StabilityClass::Unstable
    } else {
        StabilityClass::HighlyUnstable
    }
}

/// Longest run of consecutive passes anywhere in the window.
fn longest_pass_streak(sorted: &[TestExecutionResult]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for result in sorted {
        if result.is_passed() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Run of results matching `pred` ending at the most recent result.
fn trailing_streak<F>(sorted: &[TestExecutionResult], pred: F) -> usize
where
    F: Fn(&TestExecutionResult) -> bool,
{
    sorted.iter().rev().take_while(|&r| pred(r)).count()
}

/// Mean hours between consecutive failure timestamps; `None` below 2
/// failures.
fn mean_time_between_failures(sorted: &[TestExecutionResult]) -> Option<f64> {
    let failure_times: Vec<DateTime<Utc>> = sorted
        .iter()
        .filter(|r| r.is_failed())
        .map(|r| r.started_at)
        .collect();
    if failure_times.len() < 2 {
        return None;
    }
    let gaps: Vec<f64> = failure_times
        .windows(2)
        .map(|pair| hours_between(pair[0], pair[1]))
        .collect();
    Some(mean(&gaps))
}

/// Mean hours from a failure to the immediately following pass; `None` when
/// no adjacent (Failed, Passed) pair exists.
fn mean_time_to_recovery(sorted: &[TestExecutionResult]) -> Option<f64> {
    let recoveries: Vec<f64> = sorted
        .windows(2)
        .filter(|pair| pair[0].is_failed() && pair[1].is_passed())
        .map(|pair| hours_between(pair[0].started_at, pair[1].started_at))
        .collect();
    if recoveries.is_empty() {
        None
    } else {
        Some(mean(&recoveries))
    }
}

/// Quarter-over-quarter trend: +1 improving, -1 degrading, 0 flat or fewer
/// than 4 results. Quarters are compared as pass-rate fractions, so the 0.1
/// threshold is 10 percentage points.
fn trend_direction(sorted: &[TestExecutionResult]) -> i8 {
    if sorted.len() < 4 {
        return 0;
    }
    let quarter = sorted.len() / 4;
    let first = pass_rate(&sorted[..quarter]) / 100.0;
    let last = pass_rate(&sorted[sorted.len() - quarter..]) / 100.0;
    let diff = last - first;
    if diff > 0.1 {
        1
    } else if diff < -0.1 {
        -1
    } else {
        0
    }
}

/// Std-dev of rolling-window pass rates. Needs at least 10 results; the
/// window is `max(5, n/5)` results wide and advances by half its width.
fn rolling_pass_rate_std_dev(sorted: &[TestExecutionResult]) -> f64 {
    if sorted.len() < 10 {
        return 0.0;
    }
    let width = (sorted.len() / 5).max(5);
    let step = (width / 2).max(1);
    let mut rates = Vec::new();
    let mut start = 0;
    while start + width <= sorted.len() {
        rates.push(pass_rate(&sorted[start..start + width]));
        start += step;
    }
    standard_deviation(&rates)
}

/// Percentage-point pass-rate change from the first 7 days of the window to
/// the last 7. 0 when the window spans less than 7 days or either sub-window
/// is empty.
fn stability_change_rate(
    sorted: &[TestExecutionResult],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> f64 {
    if window_end - window_start < Duration::days(7) {
        return 0.0;
    }
    let first_7: Vec<TestExecutionResult> = sorted
        .iter()
        .filter(|r| r.started_at <= window_start + Duration::days(7))
        .cloned()
        .collect();
    let last_7: Vec<TestExecutionResult> = sorted
        .iter()
        .filter(|r| r.started_at >= window_end - Duration::days(7))
        .cloned()
        .collect();
    if first_7.is_empty() || last_7.is_empty() {
        return 0.0;
    }
    pass_rate(&last_7) - pass_rate(&first_7)
}

fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}
