mod api;
mod middleware;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use vitrine_catalog::Catalog;

use crate::api::{build_app, AppState};
use crate::middleware::RateLimitState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = vitrine_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(config.env.ansi_logs())
        .init();

    let catalog = Catalog::from_app_config(&config)?;
    tracing::info!(
        env = %config.env,
        source = %config.source,
        bind_addr = %config.bind_addr,
        rate_limit = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        "starting vitrine-server"
    );

    // Warm the cache so the first request does not pay for the fetch. A
    // failure here is not fatal; requests keep retrying lazily.
    let warm = catalog.clone();
    tokio::spawn(async move {
        match warm.warm().await {
            Ok(products) => tracing::info!(products, "catalog warmed"),
            Err(e) => tracing::warn!(error = %e, "catalog warm-up failed"),
        }
    });

    let limiter = RateLimitState::from_settings(&config.rate_limit);
    let app = build_app(AppState { catalog }, limiter);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
