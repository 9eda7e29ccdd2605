//! RealmHub Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realmhub_engine::api::http;
use realmhub_engine::app::{App, Repositories};
use realmhub_engine::infrastructure::{
    clock::SystemClock,
    config::{AppConfig, StoreBackend},
    memory::MemoryStore,
    ports::ClockPort,
    sqlite::SqliteRepositories,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realmhub_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RealmHub Engine");

    let config = AppConfig::from_env()?;
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    let mut sqlite_pool = None;
    let repositories = match config.store.backend {
        StoreBackend::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.store.sqlite_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("creating database directory {}", parent.display())
                    })?;
                }
            }
            let repos = SqliteRepositories::open(&config.store.sqlite_path, clock.clone())
                .await
                .context("opening SQLite store")?;
            sqlite_pool = Some(repos.pool().clone());
            Repositories::sqlite(&repos)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; all state is lost on shutdown");
            Repositories::memory(Arc::new(MemoryStore::new(clock.clone())))
        }
    };

    let app = Arc::new(App::new(repositories, clock, config));

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let retention_worker = app.use_cases.retention.clone().map(|retention| {
        let interval = app.config.retention.interval;
        tokio::spawn(retention.run(interval, cancel_token.clone()))
    });

    let mut router = http::routes()
        .with_state(app.clone())
        .layer(TraceLayer::new_for_http());
    if let Some(cors) = build_cors_layer(&app.config.cors_allowed_origins) {
        router = router.layer(cors);
    }

    let addr: SocketAddr = app
        .config
        .bind_address()
        .parse()
        .context("SERVER_HOST/SERVER_PORT do not form a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel_token.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    cancel_token.cancel();
    if let Some(worker) = retention_worker {
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Retention worker ended abnormally");
        }
    }
    if let Some(pool) = sqlite_pool {
        pool.close().await;
    }
    tracing::info!("RealmHub Engine stopped");
    Ok(())
}

/// Cancels `cancel_token` on Ctrl+C or SIGTERM.
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

fn build_cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        // Clients send X-User-Id and JSON content types which trigger CORS preflights.
        .allow_headers([
            HeaderName::from_static("x-user-id"),
            axum::http::header::CONTENT_TYPE,
        ]);

    if allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, CORS disabled");
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
