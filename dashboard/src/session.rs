use crate::classify::{Classifier, Recommendation};
use crate::config::DocumentPath;
use crate::errors::Error;
use crate::metrics::{
    EMPTY_SNAPSHOTS_TOTAL, MALFORMED_SNAPSHOTS_TOTAL, RECOMMENDATIONS_TOTAL, SNAPSHOTS_TOTAL,
    SUBSCRIPTION_FAILURES_TOTAL,
};
use crate::model::SoilReading;
use crate::source::{Identity, SourceEvent, TelemetrySource};
use crate::status::ConnectionStatus;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Everything the view needs to render one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub status: ConnectionStatus,
    pub user_id: Option<String>,
    pub reading: SoilReading,
    pub recommendation: Recommendation,
}

impl DashboardState {
    pub fn authenticated(&mut self, identity: Identity) {
        self.user_id = Some(identity.uid);
        self.status = ConnectionStatus::Authenticated;
    }

    pub fn auth_failed(&mut self, err: &Error) {
        self.status = match err {
            Error::AuthRejected(_) => ConnectionStatus::AuthenticationFailed,
            other => ConnectionStatus::Error(other.to_string()),
        };
    }

    /// Applies one subscription event.
    ///
    /// A good snapshot replaces the held reading wholesale. Anything else only
    /// touches the status, so the last good reading stays on screen.
    pub fn apply(&mut self, event: SourceEvent, classifier: &Classifier) {
        match event {
            SourceEvent::Snapshot(Some(doc)) => match SoilReading::try_from(doc) {
                Ok(reading) => {
                    debug!("New reading from {}", reading.device_id);
                    self.recommendation = classifier.classify(&reading);
                    self.reading = reading;
                    self.status = ConnectionStatus::Live;
                    RECOMMENDATIONS_TOTAL
                        .with_label_values(&[self.recommendation.label()])
                        .inc();
                }
                Err(e) => {
                    warn!("Rejected snapshot: {}", e);
                    MALFORMED_SNAPSHOTS_TOTAL.inc();
                    self.status = ConnectionStatus::StoreError(e.to_string());
                }
            },
            SourceEvent::Snapshot(None) => {
                EMPTY_SNAPSHOTS_TOTAL.inc();
                self.status = ConnectionStatus::WaitingForDevice;
            }
            SourceEvent::Malformed(msg) => {
                warn!("Malformed snapshot: {}", msg);
                MALFORMED_SNAPSHOTS_TOTAL.inc();
                self.status = ConnectionStatus::StoreError(msg);
            }
            SourceEvent::Failed(msg) => {
                SUBSCRIPTION_FAILURES_TOTAL.inc();
                self.status = ConnectionStatus::StoreError(msg);
            }
        }
    }
}

/// Drives one dashboard session: sign in once, watch the document, and
/// publish every state change to `state`.
///
/// Returns when authentication fails, when the subscription fails, or when
/// the source stops delivering. None of these are retried.
pub async fn run_session<S: TelemetrySource>(
    mut source: S,
    document: DocumentPath,
    classifier: Classifier,
    state: watch::Sender<DashboardState>,
) {
    match source.authenticate().await {
        Ok(identity) => state.send_modify(|s| s.authenticated(identity)),
        Err(e) => {
            error!("Authentication failed: {}", e);
            state.send_modify(|s| s.auth_failed(&e));
            return;
        }
    }

    let mut subscription = match source.subscribe(&document).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Failed to subscribe to {}: {}", document, e);
            SUBSCRIPTION_FAILURES_TOTAL.inc();
            state.send_modify(|s| s.status = ConnectionStatus::StoreError(e.to_string()));
            return;
        }
    };

    while let Some(event) = subscription.next().await {
        SNAPSHOTS_TOTAL.inc();
        let terminal = matches!(event, SourceEvent::Failed(_));
        state.send_modify(|s| s.apply(event, &classifier));
        if terminal {
            error!("Telemetry subscription ended: {}", state.borrow().status);
            break;
        }
    }

    info!("Session for {} finished", document);
}
