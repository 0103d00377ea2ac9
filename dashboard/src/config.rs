use crate::classify::RangeCheck;
use crate::errors::{Error, Result};
use clap::Parser;
use serde::Deserialize;

/// Fixed name of the document the device overwrites
pub const LATEST_READING_DOC: &str = "latest_reading";

/// Startup settings supplied by the hosting environment
#[derive(Debug, Clone, Parser)]
#[command(name = "dashboard", about = "Live soil telemetry dashboard")]
pub struct Config {
    /// Application identifier, part of the telemetry document path
    #[arg(long, env = "APP_ID", default_value = "default-app-id")]
    pub app_id: String,

    /// Backend connection settings as a JSON object
    #[arg(long, env = "BACKEND_CONFIG", default_value = "{}")]
    pub backend_config: String,

    /// Pre-issued credential token; connects anonymously when absent
    #[arg(long, env = "INITIAL_AUTH_TOKEN")]
    pub initial_auth_token: Option<String>,

    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// Reject readings outside the optimal pH/temperature/humidity ranges
    #[arg(long, env = "STRICT_RANGE_CHECK", default_value_t = false)]
    pub strict_range_check: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub client_id: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive_secs: 30,
            client_id: None,
        }
    }
}

impl BackendConfig {
    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("dashboard-{}", uuid::Uuid::new_v4()))
    }
}

impl Config {
    pub fn backend(&self) -> Result<BackendConfig> {
        let blob = self.backend_config.trim();
        if blob.is_empty() {
            return Ok(BackendConfig::default());
        }
        serde_json::from_str(blob)
            .map_err(|e| Error::Config(format!("invalid backend config: {}", e)))
    }

    pub fn document_path(&self) -> DocumentPath {
        DocumentPath::new(&self.app_id, LATEST_READING_DOC)
    }

    pub fn range_check(&self) -> RangeCheck {
        if self.strict_range_check {
            RangeCheck::Inclusive
        } else {
            RangeCheck::Chained
        }
    }
}

/// Address of the telemetry document inside the store.
///
/// The simulator's `document_topic` writes to the same layout; keep the two
/// in step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn new(app_id: &str, document: &str) -> Self {
        Self(format!(
            "artifacts/{}/public/data/soil_readings/{}",
            app_id, document
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["dashboard"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--app-id", "default-app-id", "--backend-config", "{}"]);

        assert_eq!(config.backend().unwrap(), BackendConfig::default());
        assert_eq!(config.range_check(), RangeCheck::Chained);
        assert_eq!(
            config.document_path().as_str(),
            "artifacts/default-app-id/public/data/soil_readings/latest_reading"
        );
    }

    #[test]
    fn test_document_path_matches_simulator_topic() {
        let path = DocumentPath::new("cropsense", LATEST_READING_DOC);
        assert_eq!(
            path.as_str(),
            "artifacts/cropsense/public/data/soil_readings/latest_reading"
        );
    }

    #[test]
    fn test_backend_blob() {
        let config = parse(&[
            "--app-id",
            "cropsense",
            "--backend-config",
            r#"{"host": "broker.local", "port": 8883, "client_id": "dash-1"}"#,
        ]);

        let backend = config.backend().unwrap();
        assert_eq!(backend.host, "broker.local");
        assert_eq!(backend.port, 8883);
        assert_eq!(backend.keep_alive_secs, 30);
        assert_eq!(backend.client_id(), "dash-1");
    }

    #[test]
    fn test_invalid_backend_blob() {
        let config = parse(&["--backend-config", "not json"]);
        assert!(matches!(config.backend(), Err(Error::Config(_))));
    }

    #[test]
    fn test_generated_client_id() {
        let id = BackendConfig::default().client_id();
        assert!(id.starts_with("dashboard-"));
    }

    #[test]
    fn test_strict_range_check_flag() {
        let config = parse(&["--strict-range-check"]);
        assert_eq!(config.range_check(), RangeCheck::Inclusive);
    }
}
