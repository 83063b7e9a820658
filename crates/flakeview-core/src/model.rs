//! Value objects exchanged with callers and the storage collaborator.
//!
//! Everything here is a plain data carrier: inputs (`TestExecutionResult`,
//! `FlakyCriteria`) are read-only to the core, and outputs
//! (`FlakyTestAnalysis`, `TestStabilityMetrics`, `TestTrend`,
//! `DashboardStatistics`) are recomputed from scratch on every call — no
//! identity beyond what a persistence layer assigns, no back-references to
//! the input records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestExecutionStatus {
    Passed,
    Failed,
    Skipped,
    CompilationError,
}

/// One recorded test run. Owned and persisted externally; the core only
/// reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionResult {
    /// Name of the test that ran.
    pub test_name: String,

    /// Recording session this run belongs to.
    pub recording_session_id: String,

    /// Outcome of the run.
    pub status: TestExecutionStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: f64,

    /// Failure message, when the run did not pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Free-form metadata attached by the recorder (step counts, tags, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TestExecutionResult {
    pub fn is_passed(&self) -> bool {
        self.status == TestExecutionStatus::Passed
    }

    pub fn is_failed(&self) -> bool {
        self.status == TestExecutionStatus::Failed
    }

    /// Step count recorded by the runner, if the `step_count` metadata key
    /// is present and numeric.
    pub fn step_count(&self) -> Option<f64> {
        self.metadata.get("step_count").and_then(|v| v.as_f64())
    }
}

/// Tunables for flakiness analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyCriteria {
    /// Fewer executions than this produce a zero-confidence placeholder
    /// analysis instead of a real one.
    pub minimum_executions: usize,

    /// Number of consecutive failures after which a test is considered
    /// broken rather than flaky.
    pub consistent_failure_threshold: usize,
}

impl Default for FlakyCriteria {
    fn default() -> Self {
        Self {
            minimum_executions: 5,
            consistent_failure_threshold: 5,
        }
    }
}

impl FlakyCriteria {
    pub fn with_minimum_executions(mut self, minimum: usize) -> Self {
        self.minimum_executions = minimum;
        self
    }

    pub fn with_consistent_failure_threshold(mut self, threshold: usize) -> Self {
        self.consistent_failure_threshold = threshold;
        self
    }
}

/// Kinds of flaky behavior the detectors can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlakyPatternType {
    /// Frequent pass/fail alternation with no obvious trigger.
    Intermittent,
    /// Failures cluster at a particular hour of day.
    Temporal,
    /// Outcome correlates with execution duration.
    TimingDependent,
    /// Failures land on a periodic execution index.
    Sequential,
    /// Pass rate deteriorates over the observed window.
    Degrading,
}

impl fmt::Display for FlakyPatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Intermittent => "intermittent",
            Self::Temporal => "temporal",
            Self::TimingDependent => "timing_dependent",
            Self::Sequential => "sequential",
            Self::Degrading => "degrading",
        };
        f.write_str(name)
    }
}

/// A behavior pattern detected in one test's execution history.
///
/// Produced fresh on every analysis; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyTestPattern {
    #[serde(rename = "type")]
    pub pattern_type: FlakyPatternType,

    /// Human-readable description of what was observed.
    pub description: String,

    /// Detector confidence, 0-100.
    pub confidence: f64,

    /// How many executions exhibited the pattern.
    pub occurrences: usize,

    /// Timestamp of the earliest execution involved in the pattern.
    pub first_detected_at: DateTime<Utc>,

    /// Timestamp of the latest execution involved in the pattern.
    pub last_observed_at: DateTime<Utc>,

    /// Suggested remediation.
    pub suggested_fix: String,
}

/// Severity bucket derived from the flakiness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlakySeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for FlakySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Full flakiness analysis for one test's execution history.
///
/// Persistence is the caller's job. Recommended write policy: supersede a
/// stored analysis for the same `(recording_session_id, test_name)` only when
/// `flakiness_score` moved by at least 5 points; otherwise skip the write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyTestAnalysis {
    pub recording_session_id: String,
    pub test_name: String,

    /// Weighted flakiness measure, 0-100.
    pub flakiness_score: f64,
    pub severity: FlakySeverity,

    pub total_executions: usize,
    /// Count of chronologically-adjacent Failed -> Passed transitions.
    pub flaky_failure_count: usize,
    pub consistent_pass_count: usize,
    pub consistent_failure_count: usize,

    /// Percentage of non-failed executions, 0-100.
    pub pass_rate: f64,
    /// Coefficient of variation of execution durations.
    pub duration_variability: f64,

    pub patterns: Vec<FlakyTestPattern>,
    pub recommendations: Vec<String>,
    pub root_causes: Vec<String>,

    /// How much execution history backs this analysis, 0-100.
    pub analysis_confidence: f64,

    /// Mean hours from the first execution to each failure; `None` when the
    /// history contains no failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_time_to_failure: Option<f64>,

    /// Population standard deviation of durations, `None` below 2 samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_duration_std_dev: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution_at: Option<DateTime<Utc>>,
}

impl FlakyTestAnalysis {
    /// Whether this analysis marks the test as flaky at all.
    pub fn is_flaky(&self) -> bool {
        self.flakiness_score > 0.0 && self.severity != FlakySeverity::None
    }
}

/// Coarse stability bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityClass {
    Stable,
    MostlyStable,
    Unstable,
    HighlyUnstable,
    Unknown,
}

impl fmt::Display for StabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stable => "stable",
            Self::MostlyStable => "mostly_stable",
            Self::Unstable => "unstable",
            Self::HighlyUnstable => "highly_unstable",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Stability assessment of one test over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStabilityMetrics {
    pub recording_session_id: String,
    pub test_name: String,

    pub stability_class: StabilityClass,
    /// Weighted stability measure, 0-100.
    pub stability_score: f64,

    /// Percentage pass rate over the whole window, 0-100.
    pub pass_rate: f64,
    /// Percentage pass rate over the trailing 7 days of the window.
    pub pass_rate_last_7_days: f64,

    /// Longest run of consecutive passes anywhere in the window.
    pub longest_pass_streak: usize,
    /// Run of consecutive passes ending at the most recent result; 0 when
    /// the most recent result did not pass.
    pub current_pass_streak: usize,
    /// Run of consecutive failures ending at the most recent result.
    pub current_failure_streak: usize,

    /// Mean hours between consecutive failures; `None` below 2 failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_time_between_failures_hours: Option<f64>,

    /// Mean hours from a failure to the immediately following pass; `None`
    /// when no such adjacent pair exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_time_to_recovery_hours: Option<f64>,

    /// Std-dev of rolling-window pass rates; 0 below 10 results.
    pub pass_rate_std_dev: f64,

    /// +1 improving, -1 degrading, 0 flat or not enough data.
    pub trend_direction: i8,

    /// Percentage-point change from the first 7 days of the window to the
    /// last 7 days; 0 when the window spans less than 7 days.
    pub stability_change_rate: f64,

    pub average_duration_ms: f64,
    pub duration_std_dev_ms: f64,

    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_executions: usize,
    pub failure_count: usize,

    /// How much execution history backs this assessment, 0-100.
    pub assessment_confidence: f64,
}

/// Bucketing granularity for trend aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendInterval {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

/// Aggregated execution statistics for one time bucket.
///
/// Buckets are independent; callers persisting trends should skip inserting
/// a row when one already exists with identical
/// `(timestamp, interval, recording_session_id, test_name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestTrend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_session_id: Option<String>,

    /// Bucket start (truncated to the interval boundary).
    pub timestamp: DateTime<Utc>,
    pub interval: TrendInterval,

    pub total_executions: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub compilation_errors: usize,

    /// Percentage pass rate within the bucket, 0-100.
    pub pass_rate: f64,

    pub min_duration_ms: f64,
    pub average_duration_ms: f64,
    pub max_duration_ms: f64,
    pub duration_std_dev_ms: f64,

    pub unique_test_count: usize,
    pub average_steps_per_test: f64,

    /// Not computed per bucket; flakiness is a cross-execution computation
    /// owned by the analyzer.
    pub flaky_test_count: usize,
    /// Not computed per bucket; see `flaky_test_count`.
    pub retried_tests: usize,
}

/// Per-test rollup used by the dashboard top-N lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionSummary {
    pub test_name: String,
    pub execution_count: usize,
    pub failure_count: usize,
    /// Percentage pass rate, 0-100.
    pub pass_rate: f64,
    pub average_duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Overall suite health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Unknown,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        };
        f.write_str(name)
    }
}

/// Single health-classified snapshot of the whole suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStatistics {
    pub total_executions: usize,
    pub total_tests: usize,

    /// Percentage pass rates, 0-100.
    pub overall_pass_rate: f64,
    pub pass_rate_last_24_hours: f64,
    pub pass_rate_last_7_days: f64,
    pub pass_rate_last_30_days: f64,

    pub flaky_test_count: usize,
    pub stable_test_count: usize,

    pub average_duration_ms: f64,
    pub total_duration_ms: f64,

    pub most_executed: Vec<TestExecutionSummary>,
    pub most_failing: Vec<TestExecutionSummary>,
    pub slowest: Vec<TestExecutionSummary>,

    pub recent_trends: Vec<TestTrend>,

    pub health: HealthStatus,
    pub generated_at: DateTime<Utc>,
}

/// Percentage of executions that did not fail, 0-100. 0 for an empty slice.
///
/// Skipped and compilation-error runs count toward the numerator: a run only
/// drags the rate down when it actually failed.
pub fn pass_rate(results: &[TestExecutionResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let failed = results.iter().filter(|r| r.is_failed()).count();
    (results.len() - failed) as f64 / results.len() as f64 * 100.0
}
