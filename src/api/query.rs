use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    db::CaptureFilter,
    domain::{Capture, CaptureList, DeleteAck, Pagination, TypeList},
    errors::AppError,
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    path: Option<String>,
}

/// Invalid or non-positive values coerce to `default`, never an error.
fn lenient_positive(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) async fn list_captures(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CaptureList>, AppError> {
    let limit = lenient_positive(params.limit.as_deref(), DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let page = lenient_positive(params.page.as_deref(), 1);
    let offset = (page - 1) * limit;

    let filter = CaptureFilter {
        path_contains: params.path.filter(|path| !path.is_empty()),
        webhook_type: None,
    };

    // Two independent calls, not one snapshot: a write landing between them
    // can make the page and the total disagree for one response.
    let (webhooks, total) = tokio::try_join!(
        state.store.list(&filter, limit, offset),
        state.store.count(&filter),
    )?;

    let total_pages = if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    };

    Ok(Json(CaptureList {
        webhooks,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }))
}

pub(crate) async fn get_capture(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Capture>, AppError> {
    Ok(Json(state.store.get(id).await?))
}

pub(crate) async fn delete_capture(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteAck>, AppError> {
    state.store.delete(id).await?;
    Ok(Json(DeleteAck {
        success: true,
        message: "Webhook deleted".to_owned(),
    }))
}

pub(crate) async fn list_types(State(state): State<AppState>) -> Result<Json<TypeList>, AppError> {
    Ok(Json(TypeList {
        types: state.store.distinct_types().await?,
    }))
}
