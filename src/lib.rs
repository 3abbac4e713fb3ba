//! # soc-switcher - battery-aware load switching
//!
//! Periodically reads the battery state of charge of a Growatt solar plant
//! and switches a load connected to a Shelly relay. The relay is switched on
//! with a timer that runs on the device and is refreshed every tick while the
//! load should stay on, so a crashed controller can never leave the load
//! running indefinitely. During a configurable night window the load is
//! always switched off.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `logging`: Structured logging and tracing
//! - `growatt`: Growatt server session and battery readings
//! - `shelly`: Shelly relay HTTP client
//! - `night`: Nighttime window evaluation
//! - `controls`: Hysteresis decision logic
//! - `scheduler`: The periodic control loop

pub mod config;
pub mod controls;
pub mod error;
pub mod growatt;
pub mod logging;
pub mod night;
pub mod scheduler;
pub mod shelly;


// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SwitcherError};
pub use scheduler::Scheduler;
