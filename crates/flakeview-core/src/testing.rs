//! Fixture builders for execution histories.
//!
//! Used by this crate's own tests and available to embedders who want to
//! exercise the analytics against synthetic histories.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::model::{TestExecutionResult, TestExecutionStatus};

/// A fixed, round origin so fixture timestamps are stable across runs.
pub fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
}

/// Builds evenly-spaced execution histories for a single test.
pub struct HistoryBuilder {
    test_name: String,
    recording_session_id: String,
    next_start: DateTime<Utc>,
    spacing: Duration,
    entries: Vec<TestExecutionResult>,
}

impl HistoryBuilder {
    pub fn new(test_name: &str) -> Self {
        Self {
            test_name: test_name.to_string(),
            recording_session_id: "rec-default".to_string(),
            next_start: origin(),
            spacing: Duration::hours(1),
            entries: Vec::new(),
        }
    }

    pub fn recording(mut self, recording_session_id: &str) -> Self {
        self.recording_session_id = recording_session_id.to_string();
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.next_start = start;
        self
    }

    pub fn spaced_by(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    /// Appends one execution with the given outcome and duration.
    pub fn push(mut self, status: TestExecutionStatus, duration_ms: f64) -> Self {
        let started_at = self.next_start;
        self.next_start += self.spacing;
        self.entries.push(TestExecutionResult {
            test_name: self.test_name.clone(),
            recording_session_id: self.recording_session_id.clone(),
            status,
            started_at,
            completed_at: Some(started_at + Duration::milliseconds(duration_ms as i64)),
            duration_ms,
            error_message: match status {
                TestExecutionStatus::Failed => Some("assertion failed".to_string()),
                _ => None,
            },
            metadata: Default::default(),
        });
        self
    }

    /// Appends a failed execution carrying a specific error message.
    pub fn push_failure(mut self, error_message: &str, duration_ms: f64) -> Self {
        self = self.push(TestExecutionStatus::Failed, duration_ms);
        if let Some(last) = self.entries.last_mut() {
            last.error_message = Some(error_message.to_string());
        }
        self
    }

    /// Appends one execution per character: `P` passed, `F` failed,
    /// `S` skipped, `C` compilation error.
    pub fn push_pattern(mut self, pattern: &str, pass_ms: f64, fail_ms: f64) -> Self {
        for ch in pattern.chars() {
            let (status, duration) = match ch {
                'P' => (TestExecutionStatus::Passed, pass_ms),
                'F' => (TestExecutionStatus::Failed, fail_ms),
                'S' => (TestExecutionStatus::Skipped, pass_ms),
                'C' => (TestExecutionStatus::CompilationError, fail_ms),
                other => panic!("unknown status character {other:?} in fixture pattern"),
            };
            self = self.push(status, duration);
        }
        self
    }

    pub fn build(self) -> Vec<TestExecutionResult> {
        self.entries
    }
}

/// Shorthand: evenly-spaced history from a `P`/`F`/`S`/`C` pattern string,
/// passes at 1000ms and failures at 3000ms.
pub fn history(test_name: &str, pattern: &str) -> Vec<TestExecutionResult> {
    HistoryBuilder::new(test_name)
        .push_pattern(pattern, 1000.0, 3000.0)
        .build()
}
