//! Periodic deletion of captures past the retention age.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{db::CaptureStore, errors::AppError};

/// How often the sweep runs once the process is up.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RetentionSweeper {
    store: Arc<dyn CaptureStore>,
    retention_days: i64,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn CaptureStore>, retention_days: i64) -> Self {
        Self {
            store,
            retention_days,
            interval: SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run a single sweep. Public so callers (and tests) can trigger one
    /// deterministically instead of waiting on the timer.
    pub async fn sweep_once(&self) -> Result<u64, AppError> {
        let deleted = self.store.delete_older_than(self.retention_days).await?;
        if deleted > 0 {
            tracing::info!(
                deleted,
                retention_days = self.retention_days,
                "removed expired webhooks"
            );
        }
        Ok(deleted)
    }

    /// Spawn the sweep loop: once immediately, then on every interval tick
    /// until `shutdown` is cancelled. A failed sweep is logged and the loop
    /// keeps going; the next tick is the retry.
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                retention_days = self.retention_days,
                "retention sweeper scheduled"
            );
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once().await {
                            tracing::error!(error = ?err, "retention sweep failed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio_util::sync::CancellationToken;

    use super::RetentionSweeper;
    use crate::{
        db::{memory::MemoryCaptureStore, CaptureFilter, CaptureStore},
        domain::{Body, Capture, JsonMap, NewCapture},
        errors::AppError,
    };

    fn capture(path: &str) -> NewCapture {
        NewCapture {
            path: path.to_owned(),
            method: "POST".to_owned(),
            headers: JsonMap::new(),
            body: Body::Absent,
            query_params: JsonMap::new(),
            source_ip: "127.0.0.1".to_owned(),
            webhook_type: "t".to_owned(),
        }
    }

    #[tokio::test]
    async fn sweep_once_deletes_only_expired_records() {
        let store = MemoryCaptureStore::default();
        let now = Utc::now();
        for days in [1, 89, 91, 200] {
            store
                .insert_at(capture(&format!("age-{days}")), now - chrono::Duration::days(days))
                .await;
        }

        let sweeper = RetentionSweeper::new(Arc::new(store.clone()), 90);
        assert_eq!(sweeper.sweep_once().await.unwrap(), 2);
        assert_eq!(store.count(&CaptureFilter::default()).await.unwrap(), 2);

        // Nothing left to remove on a repeat run.
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_sweeper_runs_immediately_and_stops_on_cancel() {
        let store = MemoryCaptureStore::default();
        store
            .insert_at(capture("stale"), Utc::now() - chrono::Duration::days(120))
            .await;

        let shutdown = CancellationToken::new();
        let handle =
            RetentionSweeper::new(Arc::new(store.clone()), 90).spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.count(&CaptureFilter::default()).await.unwrap(), 0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    /// Store whose bulk delete always fails, counting attempts.
    #[derive(Default)]
    struct FailingStore {
        attempts: AtomicU64,
    }

    #[async_trait]
    impl CaptureStore for FailingStore {
        async fn insert(&self, _capture: NewCapture) -> Result<Capture, AppError> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn list(
            &self,
            _filter: &CaptureFilter,
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<Capture>, AppError> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn count(&self, _filter: &CaptureFilter) -> Result<i64, AppError> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn get(&self, _id: i64) -> Result<Capture, AppError> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn delete(&self, _id: i64) -> Result<Capture, AppError> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn delete_older_than(&self, _days: i64) -> Result<u64, AppError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn distinct_types(&self) -> Result<Vec<String>, AppError> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_failures_do_not_stop_the_loop() {
        let store = Arc::new(FailingStore::default());
        let shutdown = CancellationToken::new();
        let handle = RetentionSweeper::new(store.clone(), 90)
            .with_interval(Duration::from_secs(60))
            .spawn(shutdown.clone());

        // Immediate tick plus two scheduled ones.
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert!(store.attempts.load(Ordering::SeqCst) >= 3);
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
