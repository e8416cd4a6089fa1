use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::CaptureStore;

mod ingest;
mod query;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CaptureStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", any(ingest::capture_root))
        .route("/webhook/*sub_path", any(ingest::capture))
        .route("/api/webhooks", get(query::list_captures))
        .route(
            "/api/webhooks/:id",
            get(query::get_capture).delete(query::delete_capture),
        )
        .route("/api/webhook-types", get(query::list_types))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
