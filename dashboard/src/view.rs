use crate::model::SoilReading;
use crate::session::DashboardState;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;

const MISSING: &str = "---";

/// JSON shape of `GET /api/v1/dashboard`
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub status: String,
    pub error: bool,
    pub data_available: bool,
    pub user_id: Option<String>,
    pub reading: SoilReading,
    pub last_update: String,
    pub recommendation: String,
    pub recommendation_label: &'static str,
}

impl From<&DashboardState> for DashboardView {
    fn from(state: &DashboardState) -> Self {
        Self {
            status: state.status.to_string(),
            error: state.status.is_error(),
            data_available: state.reading.has_data(),
            user_id: state.user_id.clone(),
            reading: state.reading.clone(),
            last_update: last_update(state.reading.timestamp),
            recommendation: state.recommendation.to_string(),
            recommendation_label: state.recommendation.label(),
        }
    }
}

fn last_update(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%-I:%M:%S %p").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn value(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| MISSING.to_string())
}

/// Plain-text dashboard page
pub struct Page<'a>(pub &'a DashboardState);

impl fmt::Display for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        let reading = &state.reading;
        let m = reading.measurements;

        writeln!(f, "CropSense AI Dashboard")?;
        writeln!(f, "Real-time monitoring and crop prediction from ESP32.")?;
        writeln!(f)?;
        writeln!(f, "Status: {}", state.status)?;
        writeln!(f, "Last Update: {}", last_update(reading.timestamp))?;
        writeln!(f, "Device ID: {}", reading.device_id)?;
        writeln!(f)?;

        writeln!(f, "Recommended Crop:")?;
        if reading.has_data() {
            writeln!(f, "  {}", state.recommendation)?;
        } else {
            writeln!(f, "  ...Awaiting Data...")?;
        }
        writeln!(f)?;

        writeln!(f, "Soil Data")?;
        writeln!(f, "  Nitrogen (N):    {} ppm", value(m.map(|m| m.n), 0))?;
        writeln!(f, "  Phosphorus (P):  {} ppm", value(m.map(|m| m.p), 0))?;
        writeln!(f, "  Potassium (K):   {} ppm", value(m.map(|m| m.k), 0))?;
        writeln!(f, "  pH Level:        {}", value(m.map(|m| m.ph), 1))?;
        writeln!(f)?;

        writeln!(f, "Environmental Readings")?;
        writeln!(
            f,
            "  Temperature:     {} °C",
            value(m.map(|m| m.temperature), 1)
        )?;
        writeln!(f, "  Humidity:        {} %", value(m.map(|m| m.humidity), 0))
    }
}

/// Renders the plain-text dashboard page
pub fn render(state: &DashboardState) -> String {
    Page(state).to_string()
}
