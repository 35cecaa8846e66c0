//! Step outcomes recorded as memory items.
//!
//! Each executed step writes one item of kind [`SNAPSHOT_KIND`] tagged with
//! `pipeline`, `step`, `agent` and `status`; resume reads those tags back
//! from the recency index.

use std::env;
use std::sync::Arc;

use tracing::debug;
use waymark_core::{MemoryItem, MemoryStore, PipelineResult, StoreResult};

use crate::error::PipelineError;

/// Item kind used for step outcomes.
pub const SNAPSHOT_KIND: &str = "pipeline_snapshot";

/// Recent items scanned when looking for prior progress.
pub const DEFAULT_SCAN_WINDOW: usize = 100;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// Reads and writes per-step progress for pipelines.
#[derive(Clone)]
pub struct StepProgress {
    store: Arc<dyn MemoryStore>,
    scan_window: usize,
}

impl StepProgress {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }

    /// Scan window from `WAYMARK_RESUME_SCAN_WINDOW`, defaulting to 100.
    pub fn from_env(store: Arc<dyn MemoryStore>) -> Result<Self, PipelineError> {
        const KEY: &str = "WAYMARK_RESUME_SCAN_WINDOW";
        let progress = Self::new(store);
        match env::var(KEY) {
            Ok(raw) => {
                let window = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|w| *w > 0)
                    .ok_or_else(|| PipelineError::InvalidEnvVar {
                        key: KEY.to_string(),
                        message: format!("expected a positive integer, got '{}'", raw),
                    })?;
                Ok(progress.with_scan_window(window))
            }
            Err(_) => Ok(progress),
        }
    }

    pub fn with_scan_window(mut self, window: usize) -> Self {
        self.scan_window = window.max(1);
        self
    }

    pub fn scan_window(&self) -> usize {
        self.scan_window
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Highest step recorded as successful for `pipeline` among recent items.
    pub async fn last_completed_step(&self, pipeline: &str) -> StoreResult<Option<u32>> {
        let recent = self.store.query_recent(self.scan_window).await?;
        let last = recent
            .iter()
            .filter(|item| {
                is_outcome(item, pipeline) && item.meta("status") == Some(STATUS_SUCCESS)
            })
            .filter_map(step_of)
            .max();
        debug!(pipeline = %pipeline, last_completed = ?last, "Read pipeline progress");
        Ok(last)
    }

    /// Output of the most recent successful record of `step` in `pipeline`.
    pub async fn step_output(&self, pipeline: &str, step: u32) -> StoreResult<Option<String>> {
        let recent = self.store.query_recent(self.scan_window).await?;
        Ok(recent
            .into_iter()
            .find(|item| {
                is_outcome(item, pipeline)
                    && step_of(item) == Some(step)
                    && item.meta("status") == Some(STATUS_SUCCESS)
            })
            .map(|item| item.content().to_string()))
    }

    /// Record one step outcome.
    pub async fn save_step_result(
        &self,
        pipeline: &str,
        step: u32,
        agent: &str,
        result: &PipelineResult,
    ) -> StoreResult<()> {
        let status = if result.is_error() {
            STATUS_ERROR
        } else {
            STATUS_SUCCESS
        };
        let item = MemoryItem::new(SNAPSHOT_KIND, result.message())
            .with_metadata("pipeline", pipeline)
            .with_metadata("step", step.to_string())
            .with_metadata("agent", agent)
            .with_metadata("status", status);
        self.store.save_memory(&item, None).await?;
        debug!(pipeline = %pipeline, step, status, "Recorded step outcome");
        Ok(())
    }
}

fn is_outcome(item: &MemoryItem, pipeline: &str) -> bool {
    item.kind() == SNAPSHOT_KIND && item.meta("pipeline") == Some(pipeline)
}

fn step_of(item: &MemoryItem) -> Option<u32> {
    item.meta("step")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::InMemoryStore;

    fn progress() -> StepProgress {
        StepProgress::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_no_records_means_no_progress() {
        let progress = progress();
        assert_eq!(progress.last_completed_step("p").await.unwrap(), None);
        assert_eq!(progress.step_output("p", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_completed_ignores_errors_and_other_pipelines() {
        let progress = progress();
        progress
            .save_step_result("p", 1, "a", &PipelineResult::success("one"))
            .await
            .unwrap();
        progress
            .save_step_result("p", 2, "a", &PipelineResult::error("nope"))
            .await
            .unwrap();
        progress
            .save_step_result("other", 5, "a", &PipelineResult::success("x"))
            .await
            .unwrap();

        assert_eq!(progress.last_completed_step("p").await.unwrap(), Some(1));
        assert_eq!(progress.step_output("p", 1).await.unwrap().as_deref(), Some("one"));
        assert_eq!(progress.step_output("p", 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_outcome_item_tags() {
        let store = Arc::new(InMemoryStore::new());
        let progress = StepProgress::new(store.clone());
        progress
            .save_step_result("release", 3, "writer", &PipelineResult::success("notes"))
            .await
            .unwrap();

        let items = store.query_recent(1).await.unwrap();
        let item = &items[0];
        assert_eq!(item.kind(), SNAPSHOT_KIND);
        assert_eq!(item.content(), "notes");
        assert_eq!(item.meta("pipeline"), Some("release"));
        assert_eq!(item.meta("step"), Some("3"));
        assert_eq!(item.meta("agent"), Some("writer"));
        assert_eq!(item.meta("status"), Some("success"));
    }

    #[tokio::test]
    async fn test_scan_window_bounds_lookup() {
        let store = Arc::new(InMemoryStore::new());
        let progress = StepProgress::new(store.clone()).with_scan_window(1);
        progress
            .save_step_result("p", 1, "a", &PipelineResult::success("one"))
            .await
            .unwrap();
        store
            .save_memory(&MemoryItem::new("note", "noise").with_created_at(i64::MAX), None)
            .await
            .unwrap();

        assert_eq!(progress.last_completed_step("p").await.unwrap(), None);
    }
}
