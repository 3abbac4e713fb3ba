//! Load switching decisions
//!
//! The controller holds no state between ticks. Every decision is derived
//! from the current battery reading and the relay state as last reported by
//! the device, so a relay that switched itself off when its timer ran out is
//! picked up on the next tick without any bookkeeping here.

use crate::error::{Result, SwitcherError};
use crate::logging::get_logger;
use std::fmt;

/// Battery state of charge snapshot, 0-100 percent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    pub soc_percent: u8,
}

impl BatteryReading {
    /// Build a reading, rejecting values outside 0-100
    pub fn new(soc_percent: i64) -> Option<Self> {
        u8::try_from(soc_percent)
            .ok()
            .filter(|v| *v <= 100)
            .map(|soc_percent| Self { soc_percent })
    }
}

/// Relay state as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayState {
    pub is_on: bool,
}

/// Switching thresholds; `on_percent` is always above `off_percent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    on_percent: u8,
    off_percent: u8,
}

impl Thresholds {
    pub fn new(on_percent: u8, off_percent: u8) -> Result<Self> {
        if on_percent <= off_percent {
            return Err(SwitcherError::invalid(
                "battery.threshold_on_percent",
                &format!(
                    "Must be greater than threshold_off_percent ({} <= {})",
                    on_percent, off_percent
                ),
            ));
        }
        Ok(Self {
            on_percent,
            off_percent,
        })
    }
}

/// What the relay should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Switch on (or keep on) and restart the relay timer
    TurnOnWithTimer(u32),

    /// Switch off
    TurnOff,

    /// Relay is off and the battery is in the dead band; no call
    HoldOff,

    /// Nighttime window is active; switch off without looking at the battery
    ForceOff,
}

impl Decision {
    /// Target relay state and timer, or `None` when no call is needed
    pub fn relay_command(&self) -> Option<(bool, Option<u32>)> {
        match self {
            Decision::TurnOnWithTimer(seconds) => Some((true, Some(*seconds))),
            Decision::TurnOff | Decision::ForceOff => Some((false, None)),
            Decision::HoldOff => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::TurnOnWithTimer(s) => write!(f, "turn on with timer ({}s)", s),
            Decision::TurnOff => write!(f, "turn off"),
            Decision::HoldOff => write!(f, "hold off"),
            Decision::ForceOff => write!(f, "force off (nighttime)"),
        }
    }
}

/// Hysteresis controller for the load relay
pub struct LoadController {
    thresholds: Thresholds,
    turnon_seconds: u32,
    logger: crate::logging::StructuredLogger,
}

impl LoadController {
    pub fn new(thresholds: Thresholds, turnon_seconds: u32) -> Self {
        Self {
            thresholds,
            turnon_seconds,
            logger: get_logger("controls"),
        }
    }

    /// Build the controller from validated configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let thresholds = Thresholds::new(
            config.battery.threshold_on_percent,
            config.battery.threshold_off_percent,
        )?;
        Ok(Self::new(thresholds, config.shelly.turnon_seconds))
    }

    /// Decide the relay action; first matching rule wins
    pub fn decide(&self, reading: BatteryReading, relay: RelayState) -> Decision {
        let soc = reading.soc_percent;
        let on = self.thresholds.on_percent;
        let off = self.thresholds.off_percent;

        if soc >= on {
            self.logger.info(&format!(
                "Battery at {}% is equal or above threshold of {}% - switching ON the load with timer ({}s)",
                soc, on, self.turnon_seconds
            ));
            Decision::TurnOnWithTimer(self.turnon_seconds)
        } else if soc <= off {
            self.logger.info(&format!(
                "Battery at {}% is equal or below threshold of {}% - switching OFF the load",
                soc, off
            ));
            Decision::TurnOff
        } else if relay.is_on {
            self.logger.info(&format!(
                "Battery at {}% is between thresholds of {}% and {}% - load is ON, refreshing timer ({}s)",
                soc, off, on, self.turnon_seconds
            ));
            Decision::TurnOnWithTimer(self.turnon_seconds)
        } else {
            self.logger.info(&format!(
                "Battery at {}% is between thresholds of {}% and {}% - load is OFF, doing nothing",
                soc, off, on
            ));
            Decision::HoldOff
        }
    }
}
