use std::{net::SocketAddr, sync::Arc};

use tokio_util::sync::CancellationToken;
use webhook_inspector::{
    api,
    cleanup::RetentionSweeper,
    config::AppConfig,
    db::{pg::PgCaptureStore, CaptureStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhook_inspector=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().map_err(anyhow::Error::msg)?;
    let store = PgCaptureStore::connect(&config.database_url, config.database_tls).await?;
    sqlx::migrate!("./migrations").run(store.pool()).await?;

    let shared: Arc<dyn CaptureStore> = Arc::new(store.clone());
    let shutdown = CancellationToken::new();
    let sweeper =
        RetentionSweeper::new(Arc::clone(&shared), config.retention_days).spawn(shutdown.clone());

    let app = api::router(api::AppState { store: shared });
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "webhook inspector listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown.cancel();
    let _ = sweeper.await;
    store.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
