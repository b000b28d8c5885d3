use std::{
    net::{Ipv4Addr, SocketAddr},
    process::ExitCode,
};

use anyhow::{Context, Result};
use hook_proxy_core::config::Config;
use hook_proxy_web::{AppState, app};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    tracing::info!("Loading configuration");
    let config = Config::load()?;
    let state = AppState::new(&config)?;
    let router = app(state).into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server: Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;
    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = shutdown_signal_io().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal_io() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}
