//! Growatt server integration
//!
//! Logs in to the Growatt cloud, resolves the first plant and inverter of the
//! account and reads the battery state of charge. The server does not report
//! session expiry explicitly; an expired session shows up as a status
//! response that does not decode, which is surfaced as
//! [`SwitcherError::StatusDecode`](crate::error::SwitcherError).

pub mod client;
pub mod types;

pub use client::GrowattClient;

use crate::controls::BatteryReading;
use crate::error::Result;
use md5::{Digest, Md5};

/// Identifiers resolved during login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub account_name: String,
    pub user_id: String,
    pub plant_id: String,
    pub plant_name: String,
    pub inverter_sn: String,
}

/// Battery monitoring session
#[async_trait::async_trait]
pub trait PowerMonitor: Send + Sync {
    /// Authenticate and resolve plant and inverter, replacing any previous session
    async fn login(&mut self) -> Result<SessionInfo>;

    /// Fetch the current state of charge with the active session
    async fn battery_reading(&self) -> Result<BatteryReading>;
}

/// Growatt's password digest: lowercase hex MD5 where every `0` at an
/// even position is replaced by `c`
pub fn hash_password(password: &str) -> String {
    let digest = Md5::digest(password.as_bytes());
    digest
        .iter()
        .flat_map(|byte| {
            let hex = format!("{:02x}", byte);
            let mut chars = hex.chars();
            let high = chars.next().unwrap_or('0');
            let low = chars.next().unwrap_or('0');
            [if high == '0' { 'c' } else { high }, low]
        })
        .collect()
}
