//! Weighted flakiness scoring and severity classification.

use crate::model::{FlakyCriteria, FlakySeverity, TestExecutionResult, pass_rate};
use crate::stats::coefficient_of_variation;

/// Breakdown of a single flakiness-score computation.
#[derive(Debug, Clone)]
pub struct FlakinessScore {
    /// Weighted flakiness measure, clamped to 0-100.
    pub score: f64,
    pub severity: FlakySeverity,

    /// Percentage pass rate, 0-100.
    pub pass_rate: f64,
    /// Chronologically-adjacent Failed -> Passed transitions.
    pub flaky_failures: usize,
    /// Longest run of consecutive passes.
    pub longest_pass_run: usize,
    /// Longest run of consecutive failures.
    pub consecutive_failures: usize,
    /// Contribution of the consecutive-failure factor after the
    /// consistently-broken tie-break; 0 at or beyond the threshold.
    pub consecutive_failure_score: f64,
    /// Coefficient of variation of durations.
    pub duration_variability: f64,
}

/// Scores one test's execution history.
///
/// Accepts results in any order; transition and run counting happen on a
/// chronologically sorted copy. A test failing in an unbroken run at or
/// beyond `criteria.consistent_failure_threshold` is consistently broken,
/// not flaky: its consecutive-failure factor contributes nothing.
pub fn score_executions(
    results: &[TestExecutionResult],
    criteria: &FlakyCriteria,
) -> FlakinessScore {
    let mut sorted: Vec<&TestExecutionResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.started_at);

    let rate = pass_rate(results);
    let pass_rate_score = (100.0 - rate).max(0.0);

    let flaky_failures = sorted
        .windows(2)
        .filter(|pair| pair[0].is_failed() && pair[1].is_passed())
        .count();
    let flaky_score = (flaky_failures as f64 * 10.0).min(100.0);

    let durations: Vec<f64> = sorted.iter().map(|r| r.duration_ms).collect();
    let duration_variability = coefficient_of_variation(&durations);
    let variability_score = (duration_variability * 100.0).min(100.0);

    let longest_pass_run = longest_run(&sorted, |r| r.is_passed());
    let consecutive_failures = longest_run(&sorted, |r| r.is_failed());
    let consecutive_failure_score = if consecutive_failures >= criteria.consistent_failure_threshold
    {
        0.0
    } else {
        (consecutive_failures as f64 * 5.0).min(50.0)
    };

    let score = (0.3 * pass_rate_score
        + 0.4 * flaky_score
        + 0.2 * variability_score
        + 0.1 * consecutive_failure_score)
        .clamp(0.0, 100.0);

    FlakinessScore {
        score,
        severity: severity_for(score, rate, flaky_failures),
        pass_rate: rate,
        flaky_failures,
        longest_pass_run,
        consecutive_failures,
        consecutive_failure_score,
        duration_variability,
    }
}

/// Severity ladder; the first matching rule wins. `retry_count` is the
/// flaky-failure (Failed -> Passed transition) count.
pub fn severity_for(score: f64, pass_rate: f64, retry_count: usize) -> FlakySeverity {
    if score >= 60.0 || pass_rate < 40.0 {
        FlakySeverity::Critical
    } else if score >= 40.0 || retry_count >= 5 {
        FlakySeverity::High
    } else if score >= 20.0 || retry_count >= 3 {
        FlakySeverity::Medium
    } else if score >= 10.0 || retry_count >= 1 {
        FlakySeverity::Low
    } else {
        FlakySeverity::None
    }
}

fn longest_run<F>(sorted: &[&TestExecutionResult], matches: F) -> usize
where
    F: Fn(&TestExecutionResult) -> bool,
{
    let mut longest = 0;
    let mut current = 0;
    for &result in sorted {
        if matches(result) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::history;

    #[test]
    fn all_passing_scores_zero() {
        let runs = history("login", "PPPPPPPPPPPPPPPPPPPP");
        let scored = score_executions(&runs, &FlakyCriteria::default());
        assert_eq!(scored.score, 0.0);
        assert_eq!(scored.severity, FlakySeverity::None);
        assert_eq!(scored.flaky_failures, 0);
        assert_eq!(scored.longest_pass_run, 20);
    }

    #[test]
    fn mixed_login_history_scores_moderately_flaky() {
        // P P F P F P P F P P: pass rate 70%, three Failed -> Passed
        // transitions, failures 3x slower than passes.
        let runs = history("login", "PPFPFPPFPP");
        let scored = score_executions(&runs, &FlakyCriteria::default());
        assert_eq!(scored.pass_rate, 70.0);
        assert_eq!(scored.flaky_failures, 3);
        assert!(scored.duration_variability > 0.0);
        assert!(scored.score > 30.0 && scored.score < 40.0);
        assert!(matches!(
            scored.severity,
            FlakySeverity::Medium | FlakySeverity::High
        ));
    }

    #[test]
    fn score_is_deterministic() {
        let runs = history("login", "PPFPFPPFPP");
        let criteria = FlakyCriteria::default();
        let first = score_executions(&runs, &criteria);
        let second = score_executions(&runs, &criteria);
        assert_eq!(first.score, second.score);
        assert_eq!(first.severity, second.severity);
    }

    #[test]
    fn score_handles_unsorted_input() {
        let mut runs = history("login", "PPFPFPPFPP");
        runs.reverse();
        let scored = score_executions(&runs, &FlakyCriteria::default());
        assert_eq!(scored.flaky_failures, 3);
    }

    #[test]
    fn more_transitions_never_score_lower() {
        // Same status multiset and duration multiset, different ordering:
        // only transition structure changes.
        let clustered = history("login", "PPPPPFFFPP");
        let alternating = history("login", "PFPFPFPPPP");
        let criteria = FlakyCriteria::default();
        let low = score_executions(&clustered, &criteria);
        let high = score_executions(&alternating, &criteria);
        assert!(high.flaky_failures > low.flaky_failures);
        assert!(high.score >= low.score);
    }

    #[test]
    fn consistently_failing_is_not_flaky_by_that_factor() {
        // Five trailing failures at the default threshold: the
        // consecutive-failure factor is zeroed out.
        let runs = history("login", "PPPPPFFFFF");
        let scored = score_executions(&runs, &FlakyCriteria::default());
        assert_eq!(scored.consecutive_failures, 5);
        assert_eq!(scored.consecutive_failure_score, 0.0);

        // One fewer failure sits below the threshold and contributes.
        let shorter = history("login", "PPPPPPFFFF");
        let scored = score_executions(&shorter, &FlakyCriteria::default());
        assert_eq!(scored.consecutive_failures, 4);
        assert_eq!(scored.consecutive_failure_score, 20.0);
    }

    #[test]
    fn score_stays_in_bounds() {
        let histories = [
            "FFFFFFFFFF",
            "PFPFPFPFPFPFPFPFPFPF",
            "P",
            "F",
            "PPPPPPPPPP",
        ];
        for pattern in histories {
            let runs = history("login", pattern);
            let scored = score_executions(&runs, &FlakyCriteria::default());
            assert!(
                (0.0..=100.0).contains(&scored.score),
                "score {} out of bounds for {pattern}",
                scored.score
            );
        }
    }

    #[test]
    fn severity_ladder_rules() {
        assert_eq!(severity_for(60.0, 80.0, 0), FlakySeverity::Critical);
        assert_eq!(severity_for(10.0, 39.0, 0), FlakySeverity::Critical);
        assert_eq!(severity_for(45.0, 80.0, 0), FlakySeverity::High);
        assert_eq!(severity_for(5.0, 80.0, 5), FlakySeverity::High);
        assert_eq!(severity_for(25.0, 80.0, 0), FlakySeverity::Medium);
        assert_eq!(severity_for(5.0, 80.0, 3), FlakySeverity::Medium);
        assert_eq!(severity_for(12.0, 80.0, 0), FlakySeverity::Low);
        assert_eq!(severity_for(5.0, 80.0, 1), FlakySeverity::Low);
        assert_eq!(severity_for(5.0, 80.0, 0), FlakySeverity::None);
    }
}
