//! # SoftDesk API Server
//!
//! REST API for projects, issues and comments, with contributor-gated
//! access.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p softdesk-api
//! ```
//!
//! Set `STORAGE_BACKEND=memory` to run without PostgreSQL and
//! `LOG_FORMAT=json` for structured log output.

use std::sync::Arc;

use anyhow::Context;
use softdesk_api::app::{build_router, AppState};
use softdesk_api::config::{Config, StorageBackend};
use softdesk_shared::db::migrations::{ensure_database_exists, run_migrations};
use softdesk_shared::db::pool::create_pool;
use softdesk_shared::store::memory::MemoryStore;
use softdesk_shared::store::postgres::PgStore;
use softdesk_shared::store::Store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "softdesk_api=debug,softdesk_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let pool_config = config
                .pool_config()
                .context("DATABASE_URL is required for the postgres backend")?;

            if config.storage.run_migrations {
                ensure_database_exists(&pool_config.url)
                    .await
                    .context("Failed to create database")?;
            }

            let pool = create_pool(pool_config).await.context("Failed to connect to database")?;

            if config.storage.run_migrations {
                run_migrations(&pool).await.context("Failed to run migrations")?;
            }

            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("SoftDesk API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    tracing::info!(backend = store.backend(), "Store ready");

    let address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
