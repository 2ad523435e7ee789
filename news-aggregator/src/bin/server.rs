//! HTTPS JSON service exposing the aggregation pipeline.

use axum_server::tls_rustls::RustlsConfig;
use news_aggregator::config::ServerConfig;
use news_aggregator::server::{router, AppState};
use news_aggregator::FeedManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(?config, "starting news aggregator service");

    let manager = FeedManager::new(&config.storage_path, &config.manager_config_path)?;
    let state = AppState {
        manager: Arc::new(RwLock::new(manager)),
        started: Instant::now(),
    };

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match config.tls_paths() {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            info!(%addr, "listening with TLS");
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, "listening without TLS (no cert/key configured)");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
