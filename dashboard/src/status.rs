use std::fmt;

/// Connectivity summary shown at the top of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Initializing,
    Authenticated,
    AuthenticationFailed,
    Live,
    WaitingForDevice,
    /// Startup failure before a subscription exists
    Error(String),
    /// Failure reported by the telemetry subscription
    StoreError(String),
}

impl ConnectionStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::AuthenticationFailed
                | ConnectionStatus::Error(_)
                | ConnectionStatus::StoreError(_)
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Initializing => f.write_str("Initializing..."),
            ConnectionStatus::Authenticated => {
                f.write_str("Authenticated. Waiting for sensor data...")
            }
            ConnectionStatus::AuthenticationFailed => f.write_str("Authentication Failed."),
            ConnectionStatus::Live => f.write_str("Live Data Stream Active"),
            ConnectionStatus::WaitingForDevice => {
                f.write_str("Waiting for ESP32 to publish data to Firestore...")
            }
            ConnectionStatus::Error(msg) => write!(f, "Error: {}", msg),
            ConnectionStatus::StoreError(msg) => write!(f, "Firestore Error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(ConnectionStatus::default().to_string(), "Initializing...");
        assert_eq!(
            ConnectionStatus::Authenticated.to_string(),
            "Authenticated. Waiting for sensor data..."
        );
        assert_eq!(
            ConnectionStatus::AuthenticationFailed.to_string(),
            "Authentication Failed."
        );
        assert_eq!(ConnectionStatus::Live.to_string(), "Live Data Stream Active");
        assert_eq!(
            ConnectionStatus::WaitingForDevice.to_string(),
            "Waiting for ESP32 to publish data to Firestore..."
        );
        assert_eq!(
            ConnectionStatus::StoreError("permission denied".to_string()).to_string(),
            "Firestore Error: permission denied"
        );
        assert_eq!(
            ConnectionStatus::Error("bad config".to_string()).to_string(),
            "Error: bad config"
        );
    }

    #[test]
    fn test_is_error() {
        assert!(ConnectionStatus::AuthenticationFailed.is_error());
        assert!(ConnectionStatus::StoreError("x".to_string()).is_error());
        assert!(!ConnectionStatus::Live.is_error());
        assert!(!ConnectionStatus::WaitingForDevice.is_error());
    }
}
