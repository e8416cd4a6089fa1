use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use crate::{
    db::{CaptureFilter, CaptureStore},
    domain::{Body, Capture, NewCapture},
    errors::AppError,
};

#[derive(Clone)]
pub struct PgCaptureStore {
    pool: PgPool,
}

/// Raw row shape; `body` is converted to [`Body`] after the fetch since the
/// tagged union is not a sqlx type.
#[derive(sqlx::FromRow)]
struct CaptureRow {
    id: i64,
    path: String,
    method: String,
    headers: serde_json::Value,
    body: Option<serde_json::Value>,
    query_params: serde_json::Value,
    source_ip: String,
    webhook_type: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CaptureRow> for Capture {
    fn from(row: CaptureRow) -> Self {
        Self {
            id: row.id,
            path: row.path,
            method: row.method,
            headers: row.headers.as_object().cloned().unwrap_or_default(),
            body: Body::from_stored(row.body),
            query_params: row.query_params.as_object().cloned().unwrap_or_default(),
            source_ip: row.source_ip,
            webhook_type: row.webhook_type,
            created_at: row.created_at,
        }
    }
}

const CAPTURE_COLUMNS: &str =
    "id, path, method, headers, body, query_params, source_ip, webhook_type, created_at";

impl PgCaptureStore {
    pub async fn connect(database_url: &str, require_tls: bool) -> Result<Self, AppError> {
        let ssl_mode = if require_tls {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        let options = PgConnectOptions::from_str(database_url)?.ssl_mode(ssl_mode);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CaptureStore for PgCaptureStore {
    async fn insert(&self, capture: NewCapture) -> Result<Capture, AppError> {
        let created = sqlx::query_as::<_, CaptureRow>(
            r#"
            INSERT INTO captures (path, method, headers, body, query_params, source_ip, webhook_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, path, method, headers, body, query_params, source_ip, webhook_type, created_at
            "#,
        )
        .bind(capture.path)
        .bind(capture.method)
        .bind(serde_json::Value::Object(capture.headers))
        .bind(capture.body.into_stored())
        .bind(serde_json::Value::Object(capture.query_params))
        .bind(capture.source_ip)
        .bind(capture.webhook_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(created.into())
    }

    async fn list(
        &self,
        filter: &CaptureFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Capture>, AppError> {
        let rows = sqlx::query_as::<_, CaptureRow>(&format!(
            r#"
            SELECT {CAPTURE_COLUMNS}
            FROM captures
            WHERE ($1::text IS NULL OR path LIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR webhook_type = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.path_contains.as_deref())
        .bind(filter.webhook_type.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Capture::from).collect())
    }

    async fn count(&self, filter: &CaptureFilter) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM captures
            WHERE ($1::text IS NULL OR path LIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR webhook_type = $2)
            "#,
        )
        .bind(filter.path_contains.as_deref())
        .bind(filter.webhook_type.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn get(&self, id: i64) -> Result<Capture, AppError> {
        let row = sqlx::query_as::<_, CaptureRow>(&format!(
            r#"
            SELECT {CAPTURE_COLUMNS}
            FROM captures
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Capture::from).ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<Capture, AppError> {
        let row = sqlx::query_as::<_, CaptureRow>(&format!(
            r#"
            DELETE FROM captures
            WHERE id = $1
            RETURNING {CAPTURE_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Capture::from).ok_or(AppError::NotFound)
    }

    async fn delete_older_than(&self, days: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM captures
            WHERE created_at < now() - make_interval(days => $1::int)
            "#,
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn distinct_types(&self) -> Result<Vec<String>, AppError> {
        let types = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT webhook_type
            FROM captures
            WHERE webhook_type IS NOT NULL
            ORDER BY webhook_type ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }
}
