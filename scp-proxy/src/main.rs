//! scp-proxy - Catalog proxy entry point
//!
//! Serves `/api/search` and `/api/stream` for the player front end and keeps the
//! catalog client id out of the browser.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use scp_proxy::config::{Args, ProxyConfig, TomlConfig};
use scp_proxy::services::CatalogClient;
use scp_proxy::AppState;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // TOML is read before logging starts so its level can seed the filter
    let config_path = args.config_path();
    let toml_config: TomlConfig =
        scp_common::config::load_toml_or_default(config_path.as_deref())
            .context("Failed to load configuration file")?;
    let config = ProxyConfig::resolve(&args, toml_config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "scp_proxy={level},scp_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        git_hash = env!("GIT_HASH"),
        profile = env!("BUILD_PROFILE"),
        "Starting scp-proxy v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        config_file = %config_path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "none".to_string()),
        api_base_url = %config.api_base_url,
        search_limit = config.search_limit,
        "Configuration resolved"
    );

    let catalog = CatalogClient::new(&config.api_base_url, &config.client_id, config.http_timeout)
        .context("Failed to create catalog client")?
        .with_search_limit(config.search_limit);

    let app = scp_proxy::build_router(AppState::new(catalog));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
