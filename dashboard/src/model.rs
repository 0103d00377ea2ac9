use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

/// Device id shown when the document does not carry one
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// Soil telemetry document as written by the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilDocument {
    #[serde(rename = "N", default)]
    pub n: Option<f64>,
    #[serde(rename = "P", default)]
    pub p: Option<f64>,
    #[serde(rename = "K", default)]
    pub k: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "deviceId", default)]
    pub device_id: Option<String>,
}

/// The six scalars of a complete reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurements {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub ph: f64,
    pub temperature: f64,
    pub humidity: f64,
}

/// Latest reading held by the dashboard.
///
/// `measurements` is `None` until the device has published nitrogen; the
/// other five scalars are only meaningful alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilReading {
    pub measurements: Option<Measurements>,
    pub timestamp: Option<DateTime<Utc>>,
    pub device_id: String,
}

impl Default for SoilReading {
    fn default() -> Self {
        Self {
            measurements: None,
            timestamp: None,
            device_id: UNKNOWN_DEVICE.to_string(),
        }
    }
}

impl SoilReading {
    pub fn has_data(&self) -> bool {
        self.measurements.is_some()
    }
}

impl TryFrom<SoilDocument> for SoilReading {
    type Error = Error;

    fn try_from(doc: SoilDocument) -> Result<Self> {
        let measurements = match doc.n {
            None => None,
            Some(n) => Some(Measurements {
                n,
                p: doc.p.ok_or(Error::IncompleteReading("P"))?,
                k: doc.k.ok_or(Error::IncompleteReading("K"))?,
                ph: doc.ph.ok_or(Error::IncompleteReading("ph"))?,
                temperature: doc
                    .temperature
                    .ok_or(Error::IncompleteReading("temperature"))?,
                humidity: doc.humidity.ok_or(Error::IncompleteReading("humidity"))?,
            }),
        };

        Ok(Self {
            measurements,
            timestamp: doc.timestamp,
            device_id: doc
                .device_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(DateTime<Utc>),
    Server {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
}

/// Accepts RFC 3339 strings and `{seconds, nanoseconds}` server time values
fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    raw.map(|raw| match raw {
        RawTimestamp::Text(ts) => Ok(ts),
        RawTimestamp::Server {
            seconds,
            nanoseconds,
        } => DateTime::from_timestamp(seconds, nanoseconds)
            .ok_or_else(|| D::Error::custom(format!("timestamp {} out of range", seconds))),
    })
    .transpose()
}
