use async_trait::async_trait;

use crate::{
    domain::{Capture, NewCapture},
    errors::AppError,
};

pub mod memory;
pub mod pg;

/// Optional listing filters. Both are independently combinable (AND).
#[derive(Debug, Clone, Default)]
pub struct CaptureFilter {
    /// Case-sensitive infix match on `path`.
    pub path_contains: Option<String>,
    /// Exact match on `webhook_type`.
    pub webhook_type: Option<String>,
}

impl CaptureFilter {
    pub(crate) fn matches(&self, capture: &Capture) -> bool {
        let path_ok = self
            .path_contains
            .as_deref()
            .map_or(true, |needle| capture.path.contains(needle));
        let type_ok = self
            .webhook_type
            .as_deref()
            .map_or(true, |wanted| capture.webhook_type.as_deref() == Some(wanted));
        path_ok && type_ok
    }
}

#[async_trait]
pub trait CaptureStore: Send + Sync {
    /// Persist a capture; the store assigns `id` and `created_at`.
    async fn insert(&self, capture: NewCapture) -> Result<Capture, AppError>;

    /// Page of captures, newest first.
    async fn list(
        &self,
        filter: &CaptureFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Capture>, AppError>;

    /// Total captures matching `filter`.
    async fn count(&self, filter: &CaptureFilter) -> Result<i64, AppError>;

    async fn get(&self, id: i64) -> Result<Capture, AppError>;

    async fn delete(&self, id: i64) -> Result<Capture, AppError>;

    /// Delete captures strictly older than `days` days; returns the number
    /// removed.
    async fn delete_older_than(&self, days: i64) -> Result<u64, AppError>;

    /// Distinct non-null labels, lexicographically sorted.
    async fn distinct_types(&self) -> Result<Vec<String>, AppError>;
}
