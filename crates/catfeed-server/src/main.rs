//! Catfeed Server - Main entry point

use anyhow::Result;
use axum::Router;
use catfeed_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use catfeed_server::api::{self, AppState};
use catfeed_server::config::Config;
use catfeed_server::db::SkuStore;
use catfeed_server::ingest::{IngestPipeline, ProgressRegistry};
use catfeed_server::search::SearchIndex;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("catfeed-server".to_string())
        .filter_directives("catfeed_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Catfeed Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Feed directory must exist before the first listing or upload
    tokio::fs::create_dir_all(&config.feeds.data_dir).await?;

    let store = SkuStore::new(db_pool.clone());
    let search = SearchIndex::new(&config.elastic)?;
    let progress = Arc::new(ProgressRegistry::new());
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        search,
        Arc::clone(&progress),
    ));

    // Periodically drop progress entries for long-finished jobs
    let retention = Duration::from_secs(config.feeds.progress_retention_secs);
    let eviction_registry = Arc::clone(&progress);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(retention.max(Duration::from_secs(60)));
        tick.tick().await;
        loop {
            tick.tick().await;
            let evicted = eviction_registry.evict_finished(retention);
            if evicted > 0 {
                info!(evicted, "Evicted finished job progress entries");
            }
        }
    });

    let state = AppState {
        db: db_pool,
        store,
        pipeline,
        progress,
        data_dir: config.feeds.data_dir.clone().into(),
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState) -> Router {
    api::router(state)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
