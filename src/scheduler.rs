//! Periodic control loop
//!
//! One tick at a time: check the night window, otherwise read relay and
//! battery, decide and switch. Errors never leave a tick; the loop always
//! reaches its sleep. A status decode failure gets exactly one session
//! renewal followed by one retry of the whole update.

use crate::config::Config;
use crate::controls::{Decision, LoadController};
use crate::error::{Result, SwitcherError};
use crate::growatt::{PowerMonitor, SessionInfo};
use crate::logging::get_logger;
use crate::night::{NightWindow, WallClock};
use crate::shelly::RelayClient;
use chrono::NaiveTime;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of a single tick
#[derive(Debug)]
pub enum TickOutcome {
    /// The decision was carried out (`HoldOff` needs no relay call)
    Completed(Decision),
    /// The tick ended early; the relay was left as it was
    Aborted(SwitcherError),
}

impl TickOutcome {
    pub fn decision(&self) -> Option<Decision> {
        match self {
            TickOutcome::Completed(d) => Some(*d),
            TickOutcome::Aborted(_) => None,
        }
    }
}

/// Drives the monitor, controller and relay
pub struct Scheduler {
    monitor: Box<dyn PowerMonitor>,
    relay: Box<dyn RelayClient>,
    controller: LoadController,
    night: NightWindow,
    clock: WallClock,
    interval: Duration,
    logger: crate::logging::StructuredLogger,
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,
}

impl Scheduler {
    pub fn new(
        config: &Config,
        monitor: Box<dyn PowerMonitor>,
        relay: Box<dyn RelayClient>,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        Ok(Self {
            monitor,
            relay,
            controller: LoadController::from_config(config)?,
            night: NightWindow::from_config(&config.night)?,
            clock: WallClock::from_name(&config.schedule.timezone)?,
            interval: Duration::from_secs(config.schedule.check_interval_seconds),
            logger: get_logger("scheduler"),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Handle that stops [`Scheduler::run`] at its next sleep
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    /// Request shutdown
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send(()).ok();
    }

    /// First login at startup; the caller decides whether failure is fatal
    pub async fn initial_login(&mut self) -> Result<SessionInfo> {
        self.monitor.login().await
    }

    /// Run ticks until shutdown is requested
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info(&format!(
            "Starting control loop, checking every {}s",
            self.interval.as_secs()
        ));

        loop {
            let now = self.clock.now();
            self.tick(now).await;

            self.logger
                .info(&format!("Sleeping for {} seconds...", self.interval.as_secs()));
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown requested, leaving control loop");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Execute one tick for wall-clock time `now`
    pub async fn tick(&mut self, now: NaiveTime) -> TickOutcome {
        if self.night.is_night(now) {
            self.logger.info(&format!(
                "Nighttime mode is enabled between {} and {} - ensuring the load is OFF",
                self.night.start().format("%H:%M"),
                self.night.end().format("%H:%M")
            ));
            return match self.relay.set_state(false, None).await {
                Ok(()) => TickOutcome::Completed(Decision::ForceOff),
                Err(e) => {
                    self.logger
                        .error(&format!("Switching off for nighttime failed: {}", e));
                    TickOutcome::Aborted(e)
                }
            };
        }

        self.logger.info("Starting update job");
        match self.update().await {
            Ok(decision) => {
                self.logger
                    .info(&format!("Update job finished successfully: {}", decision));
                TickOutcome::Completed(decision)
            }
            Err(e) if e.is_session_expired() => {
                self.logger.warn(&format!(
                    "Update job failed, could not decode response from server ({}). Assuming expired session, trying to renew...",
                    e
                ));
                match self.renew_and_update().await {
                    Ok(decision) => {
                        self.logger
                            .info(&format!("Update job finished successfully: {}", decision));
                        TickOutcome::Completed(decision)
                    }
                    Err(e) => {
                        self.logger
                            .error(&format!("Renewing expired session failed: {}", e));
                        TickOutcome::Aborted(e)
                    }
                }
            }
            Err(e) => {
                self.logger.error(&format!("Update job failed: {}", e));
                TickOutcome::Aborted(e)
            }
        }
    }

    async fn renew_and_update(&mut self) -> Result<Decision> {
        self.monitor.login().await?;
        self.update().await
    }

    /// Read relay and battery, decide, act
    async fn update(&mut self) -> Result<Decision> {
        let relay = self.relay.get_state().await?;
        let reading = self.monitor.battery_reading().await?;
        let decision = self.controller.decide(reading, relay);

        if let Some((on, timer)) = decision.relay_command() {
            self.relay.set_state(on, timer).await?;
            self.verify_relay().await;
        }
        Ok(decision)
    }

    /// Re-read the relay after switching, for the log only
    async fn verify_relay(&self) {
        match self.relay.get_state().await {
            Ok(state) => self.logger.debug(&format!(
                "Load is {} after switching",
                if state.is_on { "ON" } else { "OFF" }
            )),
            Err(e) => self
                .logger
                .warn(&format!("Could not verify load status after switching: {}", e)),
        }
    }
}
