use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soil reading document, field names as the dashboard expects them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilReading {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub ph: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "deviceId")]
    pub device_id: String,
}
