use serde::Deserialize;
use std::fmt;

/// Identifier the server sends either as a number or as a string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlexValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FlexValue {
    /// Integer view; numbers are truncated, strings must hold an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FlexValue::Int(v) => Some(*v),
            FlexValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            FlexValue::Float(_) => None,
            FlexValue::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl fmt::Display for FlexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexValue::Int(v) => write!(f, "{}", v),
            FlexValue::Float(v) => write!(f, "{}", v),
            FlexValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// `newTwoLoginAPI.do` response
#[derive(Debug, Deserialize)]
pub struct LoginEnvelope {
    pub back: LoginBack,
}

#[derive(Debug, Deserialize)]
pub struct LoginBack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub user: Option<GrowattUser>,
}

impl LoginBack {
    /// Best available reason for a rejected login
    pub fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.msg.clone())
            .unwrap_or_else(|| "no reason given".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct GrowattUser {
    #[serde(rename = "accountName")]
    pub account_name: String,
    pub id: FlexValue,
}

/// `PlantListAPI.do` response
#[derive(Debug, Deserialize)]
pub struct PlantListEnvelope {
    pub back: PlantList,
}

#[derive(Debug, Deserialize)]
pub struct PlantList {
    #[serde(default)]
    pub data: Vec<Plant>,
}

#[derive(Debug, Deserialize)]
pub struct Plant {
    #[serde(rename = "plantId")]
    pub plant_id: FlexValue,
    #[serde(rename = "plantName", default)]
    pub plant_name: String,
}

/// `newTwoPlantAPI.do?op=getAllDeviceList` response
#[derive(Debug, Deserialize)]
pub struct DeviceListResponse {
    #[serde(rename = "deviceList", default)]
    pub device_list: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceSn")]
    pub device_sn: String,
}

/// `newMixApi.do?op=getSystemStatus_KW` response
#[derive(Debug, Deserialize)]
pub struct SystemStatusEnvelope {
    pub obj: SystemStatus,
}

#[derive(Debug, Deserialize)]
pub struct SystemStatus {
    #[serde(rename = "SOC")]
    pub soc: FlexValue,
}
