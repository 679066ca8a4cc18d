//! Marginalia Server
//!
//! Serves reviewed content blocks together with their comments and edit
//! suggestions.

use std::path::Path;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marginalia_server::annotations::ContentBlock;
use marginalia_server::config::Config;
use marginalia_server::routes;
use marginalia_server::service::{default_blocks, load_seed, ContentService};
use marginalia_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marginalia_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Marginalia Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("{} editor(s) configured", config.review.editors.len());

    let blocks = match config.review.seed_path.as_deref() {
        Some(path) => seed_from(path).await?,
        None => default_blocks(),
    };
    tracing::info!("Content initialized with {} blocks", blocks.len());

    let service = ContentService::new(blocks, config.review.editors.iter().copied());
    let app = routes::app(AppState::new(config.clone(), service));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Marginalia Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn seed_from(path: &Path) -> anyhow::Result<Vec<ContentBlock>> {
    let blocks = load_seed(path).await?;
    tracing::info!("Loaded seed content from {}", path.display());
    Ok(blocks)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
