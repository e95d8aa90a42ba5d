//! Drone Arena - headless simulation host
//!
//! Runs one match at the simulation rate:
//! - connects to a relay when `RELAY_ADDR` is set, otherwise plays offline
//! - logs match events as they happen
//! - logs a JSON summary when the match settles or the process is stopped

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drone_arena::config::Config;
use drone_arena::game::{AvatarId, GameMatch, NoInput, World};
use drone_arena::net::client;

/// Outbound updates buffered for the relay writer
const OUTBOUND_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Drone Arena");
    info!(seed = config.seed, local = config.local_avatar, "Simulation configured");

    let world = World::new(config.arena.clone(), config.seed, AvatarId(config.local_avatar));
    let join = world.join_message();
    let (mut game_match, handle) = GameMatch::new(world, Box::new(NoInput));

    // Connect the relay transport if configured
    if let Some(addr) = config.relay_addr {
        let stream = client::connect(addr).await?;
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        if let Some(join) = join {
            outbound_tx.send(join).await?;
        }
        game_match = game_match.with_outbound(outbound_tx);

        let inbound_tx = handle.inbound_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = client::run_tcp_session(stream, inbound_tx, outbound_rx).await {
                error!(error = %e, "Relay session failed");
            }
        });
    } else {
        info!("No relay configured, running offline");
    }

    // Log events as they happen
    let mut events = handle.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event = ?event, "Match event");
        }
    });

    let summary = game_match.run_until(shutdown_signal()).await;
    info!(summary = %serde_json::to_string(&summary)?, "Match summary");

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping match");
        }
        _ = terminate => {
            info!("Received terminate signal, stopping match");
        }
    }
}
