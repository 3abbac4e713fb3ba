use anyhow::Result;
use soc_switcher::Config;
use soc_switcher::growatt::GrowattClient;
use soc_switcher::scheduler::Scheduler;
use soc_switcher::shelly::ShellyRelay;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        e
    })?;

    soc_switcher::logging::init_logging(&config.logging)?;
    info!("soc-switcher {} starting up", env!("CARGO_PKG_VERSION"));

    let timeout = Duration::from_secs(config.schedule.http_timeout_seconds);
    let monitor = GrowattClient::new(config.growatt.clone(), timeout);
    let relay = ShellyRelay::new(&config.shelly, timeout)?;
    let mut scheduler = Scheduler::new(&config, Box::new(monitor), Box::new(relay))?;

    if let Err(e) = scheduler.initial_login().await {
        error!("Initial login failed, giving up: {}", e);
        return Err(anyhow::anyhow!("Startup failed: {}", e));
    }

    let shutdown = scheduler.shutdown_handle();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.send(()).ok();
    });

    match scheduler.run().await {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Control loop failed with error: {}", e);
            Err(anyhow::anyhow!("Control loop error: {}", e))
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                _ = term.recv() => info!("Received SIGTERM"),
            }
        }
        Err(e) => {
            error!("Cannot listen for SIGTERM: {}", e);
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Received Ctrl-C");
}
