//! Shelly relay HTTP client
//!
//! Reads and switches one relay channel through the Gen1 HTTP API
//! (`/relay/{index}`). A timer passed along with "turn on" is counted down by
//! the device itself; sending a new timer while the relay is on restarts the
//! countdown. Each call is a single attempt.

use crate::config::ShellyConfig;
use crate::controls::RelayState;
use crate::error::{Result, SwitcherError};
use crate::logging::{LogContext, get_logger_with_context};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

/// Relay device operations
#[async_trait::async_trait]
pub trait RelayClient: Send + Sync {
    /// Current relay state
    async fn get_state(&self) -> Result<RelayState>;

    /// Switch the relay, optionally with an auto-off timer in seconds
    async fn set_state(&self, on: bool, timer_seconds: Option<u32>) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct RelayStatus {
    ison: bool,
    #[serde(default)]
    has_timer: Option<bool>,
    #[serde(default)]
    timer_remaining: Option<u64>,
}

/// Shelly Gen1 relay
pub struct ShellyRelay {
    base_url: String,
    relay_index: u8,
    username: String,
    password: String,
    client: Client,
    logger: crate::logging::StructuredLogger,
}

impl ShellyRelay {
    pub fn new(config: &ShellyConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let logger = get_logger_with_context(
            LogContext::new("shelly").with_field("relay", config.relay_index.to_string()),
        );
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            relay_index: config.relay_index,
            username: config.username.clone(),
            password: config.password.clone(),
            client,
            logger,
        })
    }

    fn relay_url(&self) -> String {
        format!("{}/relay/{}", self.base_url, self.relay_index)
    }

    fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            req
        } else {
            req.basic_auth(&self.username, Some(&self.password))
        }
    }
}

#[async_trait::async_trait]
impl RelayClient for ShellyRelay {
    async fn get_state(&self) -> Result<RelayState> {
        let resp = self
            .with_auth(self.client.get(self.relay_url()))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                self.logger.error("Getting load status failed");
                SwitcherError::from(e)
            })?;
        let status: RelayStatus = resp.json().await.map_err(|e| {
            SwitcherError::transport(format!("Unreadable relay status: {}", e))
        })?;
        self.logger.debug(&format!(
            "Current load status: ison={}, has_timer={:?}, timer_remaining={:?}",
            status.ison, status.has_timer, status.timer_remaining
        ));
        Ok(RelayState { is_on: status.ison })
    }

    async fn set_state(&self, on: bool, timer_seconds: Option<u32>) -> Result<()> {
        let mut query: Vec<(&str, String)> =
            vec![("turn", if on { "on" } else { "off" }.to_string())];
        if on && let Some(timer) = timer_seconds {
            query.push(("timer", timer.to_string()));
        }

        self.with_auth(self.client.get(self.relay_url()).query(&query))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                self.logger.error("Setting load status failed");
                SwitcherError::from(e)
            })?;
        Ok(())
    }
}
