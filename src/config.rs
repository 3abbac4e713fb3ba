//! Configuration management for the switcher
//!
//! This module handles loading and validation of the application
//! configuration from YAML files, with environment variable overrides for
//! the two service passwords. The structure is built once at startup and
//! handed to the components by reference; nothing reads it globally.

use crate::error::{Result, SwitcherError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "SOC_SWITCHER_CONFIG";

/// Environment override for the Growatt password
pub const GROWATT_PASSWORD_ENV: &str = "SOC_SWITCHER_GROWATT_PASSWORD";

/// Environment override for the Shelly password
pub const SHELLY_PASSWORD_ENV: &str = "SOC_SWITCHER_SHELLY_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Growatt server connection and login behaviour
    pub growatt: GrowattConfig,

    /// Shelly relay connection and timer
    pub shelly: ShellyConfig,

    /// Battery switching thresholds
    pub battery: BatteryConfig,

    /// Tick interval and HTTP timeouts
    pub schedule: ScheduleConfig,

    /// Nighttime window during which the load is forced off
    pub night: NightConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Growatt server parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowattConfig {
    /// Base URL of the Growatt server, with trailing slash
    pub server_url: String,

    /// Account name
    pub username: String,

    /// Plain-text password; hashed before it is sent
    pub password: String,

    /// Number of login attempts before giving up
    pub login_tries: u32,

    /// Pause between failed login attempts
    pub login_retry_wait_seconds: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

/// Shelly relay parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellyConfig {
    /// Base URL of the relay, e.g. http://192.168.1.50
    pub base_url: String,

    /// Basic auth user; empty disables authentication
    pub username: String,

    /// Basic auth password
    pub password: String,

    /// Timer handed to the relay on every switch-on
    pub turnon_seconds: u32,

    /// Relay channel on multi-channel devices
    pub relay_index: u8,
}

/// Battery thresholds in percent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// At or above this SOC the load is switched on
    pub threshold_on_percent: u8,

    /// At or below this SOC the load is switched off
    pub threshold_off_percent: u8,
}

/// Scheduler timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Pause between two ticks
    pub check_interval_seconds: u64,

    /// Upper bound for a single HTTP request
    pub http_timeout_seconds: u64,

    /// IANA timezone for the night window; empty uses the system local time
    pub timezone: String,
}

/// Nighttime window, may wrap past midnight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NightConfig {
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file or directory
    pub file: String,

    /// Number of rolled files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SwitcherError::config(format!(
                "Cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an explicit path, the environment, or the default locations
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let path = Self::locate(explicit).ok_or_else(|| {
            SwitcherError::config(
                "No configuration file found; pass a path or set SOC_SWITCHER_CONFIG",
            )
        })?;
        Self::from_file(path)
    }

    /// Resolve the configuration file to use
    fn locate(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }

        let default_paths = [
            "soc_switcher.yaml",
            "conf/config.yaml",
            "/etc/soc-switcher/config.yaml",
        ];
        default_paths
            .into_iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }

    /// Replace file passwords with non-empty environment values
    fn apply_env_overrides(&mut self) {
        if let Ok(pw) = std::env::var(GROWATT_PASSWORD_ENV)
            && !pw.is_empty()
        {
            self.growatt.password = pw;
        }
        if let Ok(pw) = std::env::var(SHELLY_PASSWORD_ENV)
            && !pw.is_empty()
        {
            self.shelly.password = pw;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.growatt.server_url.trim().is_empty() {
            return Err(SwitcherError::invalid(
                "growatt.server_url",
                "URL cannot be empty",
            ));
        }
        if self.growatt.username.trim().is_empty() {
            return Err(SwitcherError::invalid(
                "growatt.username",
                "Username cannot be empty",
            ));
        }
        if self.growatt.login_tries == 0 {
            return Err(SwitcherError::invalid(
                "growatt.login_tries",
                "Must be at least 1",
            ));
        }

        if self.shelly.base_url.trim().is_empty() {
            return Err(SwitcherError::invalid(
                "shelly.base_url",
                "URL cannot be empty",
            ));
        }
        if self.shelly.turnon_seconds == 0 {
            return Err(SwitcherError::invalid(
                "shelly.turnon_seconds",
                "Must be greater than 0",
            ));
        }

        if self.battery.threshold_on_percent > 100 {
            return Err(SwitcherError::invalid(
                "battery.threshold_on_percent",
                "Must be at most 100",
            ));
        }
        crate::controls::Thresholds::new(
            self.battery.threshold_on_percent,
            self.battery.threshold_off_percent,
        )?;

        if self.schedule.check_interval_seconds == 0 {
            return Err(SwitcherError::invalid(
                "schedule.check_interval_seconds",
                "Must be greater than 0",
            ));
        }
        if self.schedule.http_timeout_seconds == 0 {
            return Err(SwitcherError::invalid(
                "schedule.http_timeout_seconds",
                "Must be greater than 0",
            ));
        }
        crate::night::WallClock::from_name(&self.schedule.timezone)?;
        crate::night::NightWindow::from_config(&self.night)?;

        Ok(())
    }
}
