use crate::config::DocumentPath;
use crate::errors::Result;
use crate::model::SoilDocument;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identity granted by the telemetry source after sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
}

/// One push notification from a live subscription
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Current document contents, `None` when the document does not exist
    Snapshot(Option<SoilDocument>),
    /// The document exists but could not be decoded
    Malformed(String),
    /// The subscription failed and will deliver nothing further
    Failed(String),
}

/// A real-time document store the dashboard can watch
pub trait TelemetrySource {
    fn authenticate(&mut self) -> impl Future<Output = Result<Identity>> + Send;

    fn subscribe(
        &mut self,
        document: &DocumentPath,
    ) -> impl Future<Output = Result<Subscription>> + Send;
}

/// Handle to a live document subscription.
///
/// Events arrive through [`Subscription::next`]. Dropping the handle stops
/// the delivery task, which releases the source connection.
pub struct Subscription {
    events: mpsc::Receiver<SourceEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<SourceEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self { events, task }
    }

    pub async fn next(&mut self) -> Option<SourceEvent> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        self.events.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
