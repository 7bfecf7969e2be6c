//! Showvault - TV-show catalog ingestion service
//!
//! Wires configuration, tracing, the database, the upstream catalog client,
//! the background ingestion worker and the read-only HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showvault::api::{self, AppState};
use showvault::config::Config;
use showvault::db::Database;
use showvault::jobs::IngestScheduler;
use showvault::services::CatalogClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showvault=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);
    tracing::info!("Starting showvault");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("Database connected");

    let catalog = Arc::new(CatalogClient::new(&config.catalog_base_url, config.retry));

    // Single background worker; fetches run strictly sequentially.
    let cancel = CancellationToken::new();
    let scheduler = IngestScheduler::new(catalog, Arc::new(db.clone()), &config, cancel.clone());
    let worker = tokio::spawn(scheduler.run());
    tracing::info!("Ingestion worker started");

    let state = AppState {
        config: config.clone(),
        db,
    };
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cooperative shutdown: the worker observes the token at its next
    // suspension point and runs finalization before exiting.
    cancel.cancel();
    worker.await?;

    tracing::info!("Shut down complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
