//! Keyboard lighting keep-alive daemon for GameSense-style engines
//!
//! Accepts key/region lighting requests over a local HTTP surface and keeps
//! the requested effects alive against the engine's auto-expiry by
//! re-triggering them in the background.
//!
//! There is no public code API for you to use! However, the command line
//! and HTTP interfaces should be stable.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use crate::color::Rgb;
use crate::engine::EngineClient;
use crate::session::{Session, SessionConfig};

mod cache;
mod color;
mod discovery;
mod engine;
mod errors;
mod flags;
mod regions;
mod scheduler;
mod server;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = flags::Cli::parse();
    run_daemon(&cli).await
}

/// Set up collaborators and serve until shutdown.
async fn run_daemon(config: &flags::Cli) -> anyhow::Result<()> {
    let address = discovery::engine_address(config.core_props.as_deref())?;
    let engine = EngineClient::new(
        &address,
        &config.game,
        Duration::from_millis(config.request_timeout),
    )
    .context("Failed to create engine client")?;
    discovery::wait_for_engine(&engine, Duration::from_secs(config.retry_interval)).await;
    engine
        .register_game(&config.game_display_name, "keyglowd")
        .await
        .context("Failed to register with the engine")?;

    let prebind_color = if config.no_prebind {
        None
    } else {
        Some(
            config
                .prebind_color
                .parse::<Rgb>()
                .context("Invalid --prebind-color")?,
        )
    };
    let session = Arc::new(
        Session::new(
            engine.clone(),
            SessionConfig {
                refresh_interval: Duration::from_millis(config.refresh_interval),
                prebind_color,
            },
        )
        .await
        .context("Failed to initialize lighting session")?,
    );

    let app = server::router(session.clone());
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, config.port))
        .await
        .with_context(|| format!("Failed to bind 127.0.0.1:{}", config.port))?;
    info!("listening on 127.0.0.1:{}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Best-effort cleanup; the engine expires whatever is left on its own.
    if let Err(err) = session.all_off().await {
        warn!("all-off during shutdown failed: {err}");
    }
    if let Err(err) = engine.remove_game().await {
        warn!("failed to deregister from the engine: {err}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        return std::future::pending().await;
    }
    info!("shutting down");
}
