use super::*;

impl Default for GrowattConfig {
    fn default() -> Self {
        Self {
            server_url: "https://openapi.growatt.com/".to_string(),
            username: String::new(),
            password: String::new(),
            login_tries: 3,
            login_retry_wait_seconds: 30,
            user_agent: concat!("soc-switcher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for ShellyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.1.50".to_string(),
            username: String::new(),
            password: String::new(),
            turnon_seconds: 900,
            relay_index: 0,
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            threshold_on_percent: 90,
            threshold_off_percent: 60,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 300,
            http_timeout_seconds: 30,
            timezone: String::new(),
        }
    }
}

impl Default for NightConfig {
    fn default() -> Self {
        Self {
            start_hour: 22,
            start_minute: 0,
            end_hour: 6,
            end_minute: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/soc-switcher.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}
