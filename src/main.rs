mod bus;
mod command;
mod config;
mod controller;
mod device;
mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bus::mqtt::MqttSession;
use command::CommandExecutor;
use config::AppConfig;
use controller::DeviceController;
use lifecycle::Shutdown;

/// MQTT switch agent: maps bus control topics to host shell commands.
#[derive(Debug, Parser)]
#[command(name = "switch-agent", version)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    info!("Switch agent starting: {}", config.mqtt.client_id);
    info!("  broker: {}", config.mqtt.broker);
    info!("  devices: {}", config.devices.len());
    if config.devices.is_empty() {
        warn!("No devices configured");
    }

    let session = MqttSession::new(&config.mqtt)?;
    let controller = Arc::new(DeviceController::new(
        config.devices,
        config.mqtt.base_topic.clone(),
        session.handle(),
        CommandExecutor::new(),
    ));

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());

    session.run(controller, shutdown).await;

    info!("Switch agent stopped");
    Ok(())
}

/// Translate SIGINT/SIGTERM into a shutdown request. Repeated signals hit
/// the idempotent request and do nothing further.
fn spawn_signal_listener(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {e}");
                    return;
                }
            };

        loop {
            let name = tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            };
            if shutdown.request() {
                info!("Received {name}, shutting down");
            }
        }
    });
}
