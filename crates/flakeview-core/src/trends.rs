//! Time-bucketed trend aggregation.
//!
//! Pure function over a supplied snapshot: buckets execution results into
//! hourly, daily, weekly (ISO, Monday start), or monthly intervals and
//! computes per-bucket aggregates. Buckets with no results produce no row.
//!
//! Flakiness is deliberately not computed here: it is a cross-execution
//! computation owned by the analyzer, so `flaky_test_count` and
//! `retried_tests` stay 0 in every bucket.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::model::{TestExecutionResult, TestExecutionStatus, TestTrend, TrendInterval};
use crate::stats::{mean, standard_deviation};

/// Buckets `results` within `[start, end]` into `interval`-sized trends,
/// optionally restricted to one recording session.
///
/// Returns one `TestTrend` per non-empty bucket, sorted by bucket start.
pub fn calculate_trends(
    results: &[TestExecutionResult],
    interval: TrendInterval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    recording_id: Option<&str>,
) -> Vec<TestTrend> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&TestExecutionResult>> = BTreeMap::new();
    for result in results {
        if result.started_at < start || result.started_at > end {
            continue;
        }
        if let Some(id) = recording_id
            && result.recording_session_id != id
        {
            continue;
        }
        buckets
            .entry(bucket_start(result.started_at, interval))
            .or_default()
            .push(result);
    }

    buckets
        .into_iter()
        .map(|(timestamp, bucket)| aggregate_bucket(timestamp, interval, recording_id, &bucket))
        .collect()
}

/// Truncates a timestamp to its bucket boundary.
fn bucket_start(ts: DateTime<Utc>, interval: TrendInterval) -> DateTime<Utc> {
    let date = ts.date_naive();
    let naive = match interval {
        TrendInterval::Hourly => date.and_hms_opt(ts.hour(), 0, 0),
        TrendInterval::Daily => date.and_hms_opt(0, 0, 0),
        TrendInterval::Weekly => {
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            monday.and_hms_opt(0, 0, 0)
        }
        TrendInterval::Monthly => date.with_day(1).and_then(|d| d.and_hms_opt(0, 0, 0)),
    };
    // Truncation of a valid timestamp always lands on a valid timestamp.
    Utc.from_utc_datetime(&naive.unwrap_or_else(|| ts.naive_utc()))
}

fn aggregate_bucket(
    timestamp: DateTime<Utc>,
    interval: TrendInterval,
    recording_id: Option<&str>,
    bucket: &[&TestExecutionResult],
) -> TestTrend {
    let total = bucket.len();
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    let mut compilation_errors = 0;
    for result in bucket {
        match result.status {
            TestExecutionStatus::Passed => passed += 1,
            TestExecutionStatus::Failed => failed += 1,
            TestExecutionStatus::Skipped => skipped += 1,
            TestExecutionStatus::CompilationError => compilation_errors += 1,
        }
    }

    let durations: Vec<f64> = bucket.iter().map(|r| r.duration_ms).collect();
    let min_duration_ms = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max_duration_ms = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let unique_test_count = bucket
        .iter()
        .map(|r| r.test_name.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let steps: Vec<f64> = bucket.iter().filter_map(|r| r.step_count()).collect();

    TestTrend {
        recording_session_id: recording_id.map(str::to_string),
        timestamp,
        interval,
        total_executions: total,
        passed,
        failed,
        skipped,
        compilation_errors,
        pass_rate: (total - failed) as f64 / total as f64 * 100.0,
        min_duration_ms,
        average_duration_ms: mean(&durations),
        max_duration_ms,
        duration_std_dev_ms: standard_deviation(&durations),
        unique_test_count,
        average_steps_per_test: mean(&steps),
        flaky_test_count: 0,
        retried_tests: 0,
    }
}
