//! pinlink board emulator
//!
//! Runs the board dispatcher against emulated pins and a NeoPixel strip,
//! reachable over TCP, a serial port and a WebSocket.

mod config;
mod session;
mod state;
mod web;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    let state = Arc::new(AppState::new(&config));
    info!(
        "Emulating {} pins ({}-bit ADC)",
        config.board.pins, config.board.analog_bits
    );

    // Start read schedule loop
    let poll_state = state.clone();
    let poll_interval = Duration::from_millis(config.poll.max(1));
    tokio::spawn(async move {
        poll_loop(poll_state, poll_interval).await;
    });

    if config.tcp.enable {
        let addr: SocketAddr = config
            .tcp
            .listen
            .parse()
            .context("Invalid TCP listen address")?;
        let listener = TcpListener::bind(addr).await?;
        info!("TCP transport listening on {}", addr);
        let tcp_state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = session::serve_tcp(tcp_state, listener).await {
                warn!("TCP transport stopped: {:#}", e);
            }
        });
    }

    if config.serial.enable {
        let serial_state = state.clone();
        let device = config.serial.device.clone();
        let baud = config.serial.baud;
        tokio::spawn(async move {
            session::serve_serial(serial_state, device, baud).await;
        });
    }

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    if config.web.enable {
        let app = web::create_router(state.clone());
        let addr: SocketAddr = config
            .web
            .listen
            .parse()
            .context("Invalid listen address")?;
        let listener = TcpListener::bind(addr).await?;
        info!("Web server listening on http://{}", addr);

        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    } else {
        info!("Web server disabled");
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    }

    Ok(())
}

async fn poll_loop(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        state.poll();
    }
}
