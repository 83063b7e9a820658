//! Flaky-behavior pattern detectors.
//!
//! Five independent, stateless detectors. Each takes an execution history
//! ordered by `started_at` ascending (the caller sorts) and returns at most
//! one detected pattern with a confidence score and a suggested fix. Fewer
//! than [`MIN_RESULTS`] executions never produce a pattern.

use chrono::Timelike;

use crate::model::{FlakyPatternType, FlakyTestPattern, TestExecutionResult, pass_rate};
use crate::stats::{mean, standard_deviation};

/// Minimum history length any detector will consider.
pub const MIN_RESULTS: usize = 3;

/// Runs every detector and collects whichever fire.
pub fn detect_all(results: &[TestExecutionResult]) -> Vec<FlakyTestPattern> {
    [
        detect_intermittent(results),
        detect_temporal(results),
        detect_timing_dependent(results),
        detect_sequential(results),
        detect_degrading(results),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Intermittent: frequent alternation between outcomes.
///
/// Counts adjacent pairs whose status differs; fires when there are at least
/// 3 transitions and transitions cover at least 30% of the history.
pub fn detect_intermittent(results: &[TestExecutionResult]) -> Option<FlakyTestPattern> {
    if results.len() < MIN_RESULTS {
        return None;
    }
    let transitions = results
        .windows(2)
        .filter(|pair| pair[0].status != pair[1].status)
        .count();
    if transitions < 3 || (transitions as f64) < 0.3 * results.len() as f64 {
        return None;
    }
    Some(FlakyTestPattern {
        pattern_type: FlakyPatternType::Intermittent,
        description: format!(
            "Outcome alternated {transitions} times across {} executions",
            results.len()
        ),
        confidence: (transitions as f64 * 10.0).min(100.0),
        occurrences: transitions,
        first_detected_at: results[0].started_at,
        last_observed_at: results[results.len() - 1].started_at,
        suggested_fix: "Look for shared state or race conditions between runs; isolate test data \
                        and add explicit synchronization"
            .to_string(),
    })
}

/// Temporal: failures cluster at a particular hour of day.
///
/// Groups failures by UTC hour, considers hours with at least 2 failures,
/// and fires when the busiest such hour saw at least 3.
pub fn detect_temporal(results: &[TestExecutionResult]) -> Option<FlakyTestPattern> {
    if results.len() < MIN_RESULTS {
        return None;
    }
    let mut failures_by_hour = [0usize; 24];
    for result in results.iter().filter(|r| r.is_failed()) {
        failures_by_hour[result.started_at.hour() as usize] += 1;
    }
    let mut peak_hour = None;
    let mut peak_count = 0;
    for (hour, &count) in failures_by_hour.iter().enumerate() {
        if count >= 2 && count > peak_count {
            peak_hour = Some(hour as u32);
            peak_count = count;
        }
    }
    let hour = peak_hour?;
    if peak_count < 3 {
        return None;
    }
    let in_peak_hour: Vec<_> = results
        .iter()
        .filter(|r| r.is_failed() && r.started_at.hour() == hour)
        .collect();
    Some(FlakyTestPattern {
        pattern_type: FlakyPatternType::Temporal,
        description: format!("{peak_count} failures cluster around {hour:02}:00 UTC"),
        confidence: (peak_count as f64 * 15.0).min(100.0),
        occurrences: peak_count,
        first_detected_at: in_peak_hour[0].started_at,
        last_observed_at: in_peak_hour[in_peak_hour.len() - 1].started_at,
        suggested_fix: format!(
            "Check scheduled jobs, backups, or load peaks around {hour:02}:00 UTC and remove \
             wall-clock dependence from the test"
        ),
    })
}

/// TimingDependent: outcome correlates with execution duration.
///
/// Fires when duration variability is high (std-dev above half the mean)
/// and failing runs take meaningfully longer or shorter than passing runs.
pub fn detect_timing_dependent(results: &[TestExecutionResult]) -> Option<FlakyTestPattern> {
    if results.len() < MIN_RESULTS {
        return None;
    }
    let durations: Vec<f64> = results.iter().map(|r| r.duration_ms).collect();
    let avg = mean(&durations);
    let std_dev = standard_deviation(&durations);
    if avg == 0.0 || std_dev <= 0.5 * avg {
        return None;
    }
    let failure_durations: Vec<f64> = results
        .iter()
        .filter(|r| r.is_failed())
        .map(|r| r.duration_ms)
        .collect();
    let pass_durations: Vec<f64> = results
        .iter()
        .filter(|r| r.is_passed())
        .map(|r| r.duration_ms)
        .collect();
    if failure_durations.is_empty() || pass_durations.is_empty() {
        return None;
    }
    let separation = (mean(&failure_durations) - mean(&pass_durations)).abs();
    if separation <= 0.3 * avg {
        return None;
    }
    Some(FlakyTestPattern {
        pattern_type: FlakyPatternType::TimingDependent,
        description: format!(
            "Failing runs average {:.0}ms against {:.0}ms for passing runs",
            mean(&failure_durations),
            mean(&pass_durations)
        ),
        confidence: ((std_dev / avg) * 100.0).min(100.0),
        occurrences: failure_durations.len(),
        first_detected_at: results[0].started_at,
        last_observed_at: results[results.len() - 1].started_at,
        suggested_fix: "Replace fixed sleeps with explicit waits and review timeout margins; \
                        failures correlate with run duration"
            .to_string(),
    })
}

/// Sequential: failures land on a periodic execution index.
///
/// For periods 2 through 5, counts failures at every nth position
/// (0-indexed positions n-1, 2n-1, ...); fires on the first period with at
/// least 3 matches.
pub fn detect_sequential(results: &[TestExecutionResult]) -> Option<FlakyTestPattern> {
    if results.len() < MIN_RESULTS {
        return None;
    }
    for period in 2..=5usize {
        let matching: Vec<_> = results
            .iter()
            .enumerate()
            .filter(|(i, r)| i % period == period - 1 && r.is_failed())
            .map(|(_, r)| r)
            .collect();
        if matching.len() >= 3 {
            return Some(FlakyTestPattern {
                pattern_type: FlakyPatternType::Sequential,
                description: format!(
                    "{} failures recur with period {period}",
                    matching.len()
                ),
                confidence: (matching.len() as f64 * 20.0).min(100.0),
                occurrences: matching.len(),
                first_detected_at: matching[0].started_at,
                last_observed_at: matching[matching.len() - 1].started_at,
                suggested_fix: format!(
                    "Reset shared state between runs; something accumulates on a {period}-run \
                     cadence"
                ),
            });
        }
    }
    None
}

/// Degrading: pass rate deteriorates between the first and second half of
/// the window by at least 20 percentage points.
pub fn detect_degrading(results: &[TestExecutionResult]) -> Option<FlakyTestPattern> {
    if results.len() < MIN_RESULTS {
        return None;
    }
    let midpoint = results.len() / 2;
    let first_half_rate = pass_rate(&results[..midpoint]);
    let second_half_rate = pass_rate(&results[midpoint..]);
    let drop = first_half_rate - second_half_rate;
    if drop < 20.0 {
        return None;
    }
    let second_half_failures = results[midpoint..].iter().filter(|r| r.is_failed()).count();
    Some(FlakyTestPattern {
        pattern_type: FlakyPatternType::Degrading,
        description: format!(
            "Pass rate fell from {first_half_rate:.0}% to {second_half_rate:.0}% over the window"
        ),
        confidence: (drop * 2.0).min(100.0),
        occurrences: second_half_failures,
        first_detected_at: results[0].started_at,
        last_observed_at: results[results.len() - 1].started_at,
        suggested_fix: "Investigate progressive resource exhaustion or growing fixture data; \
                        the failure rate is trending up"
            .to_string(),
    })
}
