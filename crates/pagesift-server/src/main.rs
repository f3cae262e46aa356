use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pagesift_client::ReqwestFetcher;
use pagesift_core::batch::BatchOrchestrator;
use pagesift_core::pipeline::ExtractService;
use pagesift_core::quota::store::{MemoryQuotaStore, QuotaStore};
use pagesift_core::quota::QuotaGovernor;
use pagesift_db::{DatabaseConfig, PostgresQuotaStore};
use pagesift_server::routes;
use pagesift_server::settings::{QuotaBackend, Settings};
use pagesift_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagesift=info".parse()?))
        .with_target(false)
        .init();

    let settings = Settings::from_env()?;
    let addr = format!("0.0.0.0:{}", settings.port);

    let store: Arc<dyn QuotaStore> = match settings.quota_backend {
        QuotaBackend::Memory => Arc::new(MemoryQuotaStore::new()),
        QuotaBackend::Postgres => {
            let store = PostgresQuotaStore::connect(&DatabaseConfig::from_env()?).await?;
            store.migrate().await?;
            spawn_window_purger(store.clone());
            Arc::new(store)
        }
    };

    let governor = Arc::new(QuotaGovernor::new(
        store,
        settings.quota_rules.clone(),
        settings.api_keys.clone(),
        settings.quota_enabled(),
    ));

    let fetcher = ReqwestFetcher::with_timeout(settings.crawler_timeout)?;
    let service = ExtractService::new(fetcher, settings.crawler_timeout);
    let batch = BatchOrchestrator::new(service.clone());

    tracing::info!(
        environment = settings.environment.as_str(),
        quota_enabled = settings.quota_enabled(),
        "Starting server on {addr}"
    );

    let state = Arc::new(AppState {
        service,
        batch,
        governor,
        settings,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Hourly cleanup of long-expired quota windows. Counters reset in place on
/// the next hit regardless; this only keeps the table from growing.
fn spawn_window_purger(store: PostgresQuotaStore) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(3600));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(error) = store.purge_expired().await {
                tracing::warn!(%error, "quota window purge failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to install CTRL+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
