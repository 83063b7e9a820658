//! Result-storage collaborator boundary.
//!
//! The core never persists anything itself; it reads execution history
//! through [`ResultStore`] and hands value objects back to the caller.
//! [`MemoryResultStore`] backs tests and embedders that already hold a
//! snapshot in memory.

use async_trait::async_trait;

use crate::model::TestExecutionResult;

/// Read access to persisted execution results.
///
/// Fetching through this trait is the core's only I/O. Implementations may
/// be backed by anything; errors are opaque to the core and surface to
/// callers unmodified.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// All results recorded for one recording session.
    async fn get_results_by_recording(
        &self,
        recording_id: &str,
    ) -> anyhow::Result<Vec<TestExecutionResult>>;

    /// A page of execution history. Ordering is implementation-defined but
    /// must be stable enough that paging does not split a recording's
    /// results unpredictably; most-recent-first is conventional.
    async fn get_execution_history(
        &self,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<TestExecutionResult>>;
}

/// In-memory store over a fixed snapshot of results.
///
/// History pages are served most-recent-first.
#[derive(Debug, Default, Clone)]
pub struct MemoryResultStore {
    results: Vec<TestExecutionResult>,
}

impl MemoryResultStore {
    pub fn new(mut results: Vec<TestExecutionResult>) -> Self {
        results.sort_by_key(|r| std::cmp::Reverse(r.started_at));
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn get_results_by_recording(
        &self,
        recording_id: &str,
    ) -> anyhow::Result<Vec<TestExecutionResult>> {
        Ok(self
            .results
            .iter()
            .filter(|r| r.recording_session_id == recording_id)
            .cloned()
            .collect())
    }

    async fn get_execution_history(
        &self,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<TestExecutionResult>> {
        Ok(self
            .results
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::history;

    #[tokio::test]
    async fn memory_store_filters_by_recording() {
        let mut results = history("login", "PPF");
        for r in &mut results {
            r.recording_session_id = "rec-a".to_string();
        }
        results.extend(history("checkout", "PP"));
        let store = MemoryResultStore::new(results);

        let fetched = store.get_results_by_recording("rec-a").await.unwrap();
        assert_eq!(fetched.len(), 3);
        assert!(fetched.iter().all(|r| r.recording_session_id == "rec-a"));
    }

    #[tokio::test]
    async fn memory_store_pages_most_recent_first() {
        let store = MemoryResultStore::new(history("login", "PPPPP"));
        let page = store.get_execution_history(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].started_at > page[1].started_at);

        let rest = store.get_execution_history(2, 10).await.unwrap();
        assert_eq!(rest.len(), 3);
    }
}
