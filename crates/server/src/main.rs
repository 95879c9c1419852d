//! student-report server entry point.
//!
//! Boots the HTTP API that serves cached PDF reports for students fetched
//! from the backend. Logs go to stderr; JSON in production.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use strep_client::{BackendClient, BackendConfig, PdfReportRenderer};
use strep_core::AppConfig;
use strep_core::cache::Sweeper;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod error;
mod middleware;
mod report;
mod routes;
mod state;
mod validation;

/// How long in-flight requests may take to finish after a shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config);
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    tracing::info!(
        environment = %config.environment,
        port = config.port,
        backend_url = %config.backend_url,
        "starting student report service"
    );

    let backend = BackendClient::new(BackendConfig::from_app_config(&config)?)?;
    let shutdown = CancellationToken::new();

    let (cache, file_cache) = state::build_cache(&config).await;
    let sweeper = file_cache
        .map(|cache| Sweeper::new(cache, config.cache_sweep_interval(), shutdown.child_token()).spawn());

    let port = config.port;
    let state = state::AppState::new(config, Arc::new(backend), Arc::new(PdfReportRenderer::new()), cache);
    let app = routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await.with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    tokio::select! {
        () = shutdown_signal() => tracing::info!("shutting down server"),
        result = &mut server => {
            shutdown.cancel();
            result??;
            anyhow::bail!("server exited unexpectedly");
        }
    }
    shutdown.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result??,
        Err(_) => tracing::error!(timeout_secs = SHUTDOWN_TIMEOUT.as_secs(), "server forced to shutdown"),
    }

    if let Some(sweeper) = sweeper
        && let Err(e) = sweeper.await
    {
        tracing::warn!(error = %e, "cache sweeper task failed");
    }

    tracing::info!("server exited");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
}
