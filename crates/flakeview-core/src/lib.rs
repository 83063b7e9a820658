//! # flakeview-core
//!
//! Test-reliability analytics over historical execution records.
//!
//! This crate provides:
//! - Flakiness scoring: a weighted 0-100 score and severity classification
//!   for a single test's execution history
//! - Pattern detection: five stateless detectors for intermittent, temporal,
//!   timing-dependent, sequential, and degrading failure behavior
//! - Stability metrics: streaks, MTBF/MTTR, rolling pass-rate variance, and
//!   trend direction over a time window
//! - Trend aggregation: hourly/daily/weekly/monthly bucketed execution
//!   statistics
//! - Dashboard snapshots: suite-wide totals, top-N lists, and a health
//!   classification
//!
//! Every analysis is a pure computation over an in-memory snapshot. The only
//! I/O is reading raw results through the [`ResultStore`] collaborator;
//! persisting the produced value objects is the caller's job.

pub mod analyzer;
pub mod dashboard;
mod error;
mod model;
pub mod patterns;
pub mod scoring;
pub mod stability;
mod stats;
pub mod storage;
pub mod testing;
pub mod trends;

pub use analyzer::{FlakyTestAnalyzer, HISTORY_SCAN_LIMIT, analysis_confidence, analyze_results};
pub use dashboard::{DashboardAggregator, TOP_N, TRAILING_WINDOW_DAYS};
pub use error::AnalysisError;
pub use model::{
    DashboardStatistics, FlakyCriteria, FlakyPatternType, FlakySeverity, FlakyTestAnalysis,
    FlakyTestPattern, HealthStatus, StabilityClass, TestExecutionResult, TestExecutionStatus,
    TestExecutionSummary, TestStabilityMetrics, TestTrend, TrendInterval, pass_rate,
};
pub use stability::{DEFAULT_WINDOW_DAYS, calculate_stability, stability_over_trailing_days};
pub use stats::{coefficient_of_variation, mean, standard_deviation};
pub use storage::{MemoryResultStore, ResultStore};
pub use trends::calculate_trends;
