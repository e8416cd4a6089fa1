use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::{
    db::{CaptureFilter, CaptureStore},
    domain::{Capture, NewCapture},
    errors::AppError,
};

/// In-memory store used by the test suite.
#[derive(Clone, Default)]
pub struct MemoryCaptureStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    captures: Vec<Capture>,
}

impl Inner {
    fn push(&mut self, capture: NewCapture, created_at: chrono::DateTime<Utc>) -> Capture {
        self.next_id += 1;
        let stored = Capture {
            id: self.next_id,
            path: capture.path,
            method: capture.method,
            headers: capture.headers,
            body: capture.body,
            query_params: capture.query_params,
            source_ip: capture.source_ip,
            webhook_type: Some(capture.webhook_type),
            created_at,
        };
        self.captures.push(stored.clone());
        stored
    }
}

#[cfg(test)]
impl MemoryCaptureStore {
    /// Insert with an explicit `created_at`, for aging-sensitive tests.
    pub(crate) async fn insert_at(
        &self,
        capture: NewCapture,
        created_at: chrono::DateTime<Utc>,
    ) -> Capture {
        self.inner.write().await.push(capture, created_at)
    }
}

#[async_trait]
impl CaptureStore for MemoryCaptureStore {
    async fn insert(&self, capture: NewCapture) -> Result<Capture, AppError> {
        Ok(self.inner.write().await.push(capture, Utc::now()))
    }

    async fn list(
        &self,
        filter: &CaptureFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Capture>, AppError> {
        let mut matched: Vec<Capture> = self
            .inner
            .read()
            .await
            .captures
            .iter()
            .filter(|capture| filter.matches(capture))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = usize::try_from(offset).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &CaptureFilter) -> Result<i64, AppError> {
        let total = self
            .inner
            .read()
            .await
            .captures
            .iter()
            .filter(|capture| filter.matches(capture))
            .count();
        Ok(total as i64)
    }

    async fn get(&self, id: i64) -> Result<Capture, AppError> {
        self.inner
            .read()
            .await
            .captures
            .iter()
            .find(|capture| capture.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<Capture, AppError> {
        let mut inner = self.inner.write().await;
        let position = inner.captures.iter().position(|capture| capture.id == id);
        position
            .map(|index| inner.captures.remove(index))
            .ok_or(AppError::NotFound)
    }

    async fn delete_older_than(&self, days: i64) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut inner = self.inner.write().await;
        let before = inner.captures.len();
        inner.captures.retain(|capture| capture.created_at >= cutoff);
        Ok((before - inner.captures.len()) as u64)
    }

    async fn distinct_types(&self) -> Result<Vec<String>, AppError> {
        let mut types: Vec<String> = self
            .inner
            .read()
            .await
            .captures
            .iter()
            .filter_map(|capture| capture.webhook_type.clone())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}
