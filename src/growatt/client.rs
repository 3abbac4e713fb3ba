use crate::config::GrowattConfig;
use crate::controls::BatteryReading;
use crate::error::{Result, SwitcherError};
use crate::growatt::types::{
    DeviceListResponse, LoginBack, LoginEnvelope, PlantListEnvelope, SystemStatusEnvelope,
};
use crate::growatt::{PowerMonitor, SessionInfo, hash_password};
use crate::logging::get_logger;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// An authenticated session: the cookie jar lives inside `client`
struct Session {
    client: Client,
    info: SessionInfo,
}

/// Growatt server client owning the monitoring session
pub struct GrowattClient {
    config: GrowattConfig,
    timeout: Duration,
    session: Option<Session>,
    logger: crate::logging::StructuredLogger,
}

impl GrowattClient {
    /// Create a client; no request is made until [`PowerMonitor::login`]
    pub fn new(config: GrowattConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            session: None,
            logger: get_logger("growatt"),
        }
    }

    /// Identifiers of the active session, if logged in
    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session.as_ref().map(|s| &s.info)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.server_url.trim_end_matches('/'), path)
    }

    /// Fresh HTTP client with an empty cookie jar
    fn build_client(&self) -> Result<Client> {
        Ok(Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()?)
    }

    /// Single login request; any transport or protocol failure is retryable
    async fn login_once(&self, client: &Client) -> Result<LoginBack> {
        let password = hash_password(&self.config.password);
        let resp = client
            .post(self.url("newTwoLoginAPI.do"))
            .form(&[
                ("userName", self.config.username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let envelope: LoginEnvelope = read_json(resp).await?;
        Ok(envelope.back)
    }

    async fn first_plant(&self, client: &Client, user_id: &str) -> Result<(String, String)> {
        let resp = client
            .get(self.url("PlantListAPI.do"))
            .query(&[("userId", user_id)])
            .send()
            .await?
            .error_for_status()?;
        let plants: PlantListEnvelope = read_json(resp).await?;
        let plant = plants
            .back
            .data
            .into_iter()
            .next()
            .ok_or_else(|| SwitcherError::status_decode("Plant list is empty"))?;
        Ok((plant.plant_id.to_string(), plant.plant_name))
    }

    async fn first_inverter(&self, client: &Client, plant_id: &str) -> Result<String> {
        let resp = client
            .get(self.url("newTwoPlantAPI.do"))
            .query(&[
                ("op", "getAllDeviceList"),
                ("plantId", plant_id),
                ("pageNum", "1"),
                ("pageSize", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;
        let devices: DeviceListResponse = read_json(resp).await?;
        devices
            .device_list
            .into_iter()
            .next()
            .map(|d| d.device_sn)
            .ok_or_else(|| SwitcherError::status_decode("Device list is empty"))
    }
}

#[async_trait::async_trait]
impl PowerMonitor for GrowattClient {
    async fn login(&mut self) -> Result<SessionInfo> {
        let tries = self.config.login_tries.max(1);
        let wait = Duration::from_secs(self.config.login_retry_wait_seconds);
        self.logger.debug(&format!(
            "Logging in to Growatt server at '{}' with user agent '{}'",
            self.config.server_url, self.config.user_agent
        ));

        let client = self.build_client()?;
        let mut attempt = 1;
        let back = loop {
            match self.login_once(&client).await {
                Ok(back) => break back,
                Err(e) if attempt >= tries => {
                    self.logger.error(&format!(
                        "Login to Growatt server failed - retries exhausted (attempt {}/{}): {}",
                        attempt, tries, e
                    ));
                    return Err(SwitcherError::auth(format!(
                        "Login failed after {} attempts: {}",
                        tries, e
                    )));
                }
                Err(e) => {
                    self.logger.warn(&format!(
                        "Login to Growatt server failed - retrying in {}s (attempt {}/{}): {}",
                        wait.as_secs(),
                        attempt,
                        tries,
                        e
                    ));
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        };

        // A rejected credential will not improve with retries
        if !back.success {
            let reason = back.reason();
            self.logger
                .error(&format!("Login to Growatt server rejected: {}", reason));
            return Err(SwitcherError::auth(format!("Login rejected: {}", reason)));
        }
        let user = back
            .user
            .ok_or_else(|| SwitcherError::auth("Login response carries no user"))?;
        let user_id = user.id.to_string();
        self.logger.info(&format!(
            "Logged in to Growatt server with user '{}' (ID '{}')",
            user.account_name, user_id
        ));

        let (plant_id, plant_name) = self.first_plant(&client, &user_id).await?;
        let inverter_sn = self.first_inverter(&client, &plant_id).await?;
        self.logger.debug(&format!(
            "Using plant '{}' with ID '{}' and inverter with ID '{}'",
            plant_name, plant_id, inverter_sn
        ));

        let info = SessionInfo {
            account_name: user.account_name,
            user_id,
            plant_id,
            plant_name,
            inverter_sn,
        };
        // Only a complete session replaces the previous one
        self.session = Some(Session {
            client,
            info: info.clone(),
        });
        Ok(info)
    }

    async fn battery_reading(&self) -> Result<BatteryReading> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| SwitcherError::status_decode("No active Growatt session"))?;

        let resp = session
            .client
            .post(self.url("newMixApi.do"))
            .query(&[
                ("op", "getSystemStatus_KW"),
                ("plantId", session.info.plant_id.as_str()),
                ("mixId", session.info.inverter_sn.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let status: SystemStatusEnvelope = read_json(resp).await?;
        self.logger
            .debug(&format!("Current inverter status: {:?}", status.obj));

        let soc = status
            .obj
            .soc
            .as_i64()
            .and_then(BatteryReading::new)
            .ok_or_else(|| {
                SwitcherError::status_decode(format!("SOC value '{}' is not a percentage", status.obj.soc))
            })?;
        self.logger
            .info(&format!("Current battery percentage: {}%", soc.soc_percent));
        Ok(soc)
    }
}

/// Decode a JSON body; an unexpected body is a decode error, not a transport error
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(120).collect();
        SwitcherError::status_decode(format!("{} (body: '{}')", e, preview))
    })
}
