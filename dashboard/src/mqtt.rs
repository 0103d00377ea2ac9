use crate::config::{BackendConfig, DocumentPath};
use crate::errors::{Error, Result};
use crate::model::SoilDocument;
use crate::source::{Identity, SourceEvent, Subscription, TelemetrySource};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
    SubscribeReasonCode,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const REQUEST_CAPACITY: usize = 64;
const EVENT_BUFFER: usize = 16;

/// Telemetry source backed by an MQTT broker.
///
/// The document is the retained message on its topic: a JSON payload is the
/// current contents, an empty payload means the document was deleted.
pub struct MqttSource {
    options: MqttOptions,
    connection: Option<(AsyncClient, EventLoop)>,
}

impl MqttSource {
    pub fn new(backend: &BackendConfig, token: Option<&str>) -> Self {
        let client_id = backend.client_id();
        let mut options = MqttOptions::new(client_id.clone(), backend.host.clone(), backend.port);
        options.set_keep_alive(Duration::from_secs(backend.keep_alive_secs));
        options.set_clean_session(true);

        // custom token sign-in, otherwise anonymous
        if let Some(token) = token {
            options.set_credentials(client_id, token);
        }

        Self {
            options,
            connection: None,
        }
    }
}

impl TelemetrySource for MqttSource {
    async fn authenticate(&mut self) -> Result<Identity> {
        let (host, port) = self.options.broker_address();
        info!("Connecting to MQTT broker at {}:{}", host, port);

        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(Error::AuthRejected(format!("{:?}", ack.code)));
                    }
                    let uid = self.options.client_id();
                    info!("Authenticated as {}", uid);
                    self.connection = Some((client, eventloop));
                    return Ok(Identity { uid });
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    warn!("Broker refused connection: {:?}", code);
                    return Err(Error::AuthRejected(format!("{:?}", code)));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn subscribe(&mut self, document: &DocumentPath) -> Result<Subscription> {
        let (client, eventloop) = self.connection.take().ok_or(Error::NotAuthenticated)?;

        client
            .subscribe(document.as_str(), QoS::AtLeastOnce)
            .await
            .map_err(Error::Mqtt)?;
        info!("Subscribed to {} with QoS 1", document);

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let topic = document.to_string();
        let task = tokio::spawn(async move {
            // keeps the request channel open for as long as the loop runs
            let _client = client;
            deliver(eventloop, topic, tx).await;
        });

        Ok(Subscription::new(rx, Some(task)))
    }
}

/// Forwards document notifications until the connection fails or the
/// subscriber goes away. There is no reconnect.
async fn deliver(mut eventloop: EventLoop, topic: String, tx: mpsc::Sender<SourceEvent>) {
    let mut seen_document = false;
    loop {
        let polled = eventloop.poll().await;
        let Some(event) = translate(polled, &topic, &mut seen_document) else {
            continue;
        };

        let terminal = matches!(event, SourceEvent::Failed(_));
        if tx.send(event).await.is_err() {
            debug!("Subscriber dropped, stopping delivery");
            break;
        }
        if terminal {
            break;
        }
    }
}

/// Maps one event-loop result to a subscription event, `None` for traffic
/// that says nothing about the document.
///
/// A successful SUBACK reports a missing document only while no PUBLISH for
/// `topic` has arrived yet; brokers may deliver the retained message first.
fn translate(
    polled: std::result::Result<Event, ConnectionError>,
    topic: &str,
    seen_document: &mut bool,
) -> Option<SourceEvent> {
    match polled {
        Ok(Event::Incoming(Packet::SubAck(ack))) => {
            if ack
                .return_codes
                .iter()
                .any(|code| matches!(code, SubscribeReasonCode::Failure))
            {
                error!("Broker rejected subscription to {}", topic);
                return Some(SourceEvent::Failed("subscription rejected".to_string()));
            }
            if *seen_document {
                None
            } else {
                Some(SourceEvent::Snapshot(None))
            }
        }
        Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
            debug!(
                "Received document update, size: {} bytes",
                publish.payload.len()
            );
            *seen_document = true;
            Some(match decode_document(&publish.payload) {
                Ok(doc) => SourceEvent::Snapshot(doc),
                Err(e) => SourceEvent::Malformed(e.to_string()),
            })
        }
        Ok(_) => None,
        Err(e) => {
            error!("MQTT error: {}", e);
            Some(SourceEvent::Failed(e.to_string()))
        }
    }
}

/// Empty payloads are deleted documents
fn decode_document(payload: &[u8]) -> Result<Option<SoilDocument>> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{Publish, SubAck};

    const TOPIC: &str = "artifacts/test-app/public/data/soil_readings/latest_reading";

    fn suback(code: SubscribeReasonCode) -> std::result::Result<Event, ConnectionError> {
        Ok(Event::Incoming(Packet::SubAck(SubAck::new(1, vec![code]))))
    }

    fn publish(topic: &str, payload: &[u8]) -> std::result::Result<Event, ConnectionError> {
        let mut publish = Publish::new(topic, QoS::AtLeastOnce, payload.to_vec());
        publish.retain = true;
        Ok(Event::Incoming(Packet::Publish(publish)))
    }

    const READING: &[u8] =
        br#"{"N": 30, "P": 0, "K": 60, "ph": 5.0, "temperature": 25, "humidity": 50}"#;

    #[test]
    fn test_suback_before_document_reports_absence() {
        let mut seen = false;

        let granted = SubscribeReasonCode::Success(QoS::AtLeastOnce);
        let event = translate(suback(granted), TOPIC, &mut seen);
        assert_eq!(event, Some(SourceEvent::Snapshot(None)));

        match translate(publish(TOPIC, READING), TOPIC, &mut seen) {
            Some(SourceEvent::Snapshot(Some(doc))) => assert_eq!(doc.n, Some(30.0)),
            other => panic!("expected document, got {:?}", other),
        }
        assert!(seen);
    }

    #[test]
    fn test_retained_document_before_suback_stays_live() {
        let mut seen = false;

        let event = translate(publish(TOPIC, READING), TOPIC, &mut seen);
        assert!(matches!(event, Some(SourceEvent::Snapshot(Some(_)))));

        let granted = SubscribeReasonCode::Success(QoS::AtLeastOnce);
        let event = translate(suback(granted), TOPIC, &mut seen);
        assert_eq!(event, None);
    }

    #[test]
    fn test_rejected_subscription_fails() {
        let mut seen = false;
        assert_eq!(
            translate(suback(SubscribeReasonCode::Failure), TOPIC, &mut seen),
            Some(SourceEvent::Failed("subscription rejected".to_string()))
        );
    }

    #[test]
    fn test_other_topics_and_packets_ignored() {
        let mut seen = false;
        let other = "artifacts/other-app/public/data/soil_readings/latest_reading";

        assert_eq!(translate(publish(other, READING), TOPIC, &mut seen), None);
        assert_eq!(
            translate(Ok(Event::Incoming(Packet::PingResp)), TOPIC, &mut seen),
            None
        );
        assert!(!seen);
    }

    #[test]
    fn test_deleted_and_malformed_documents() {
        let mut seen = false;

        assert_eq!(
            translate(publish(TOPIC, b""), TOPIC, &mut seen),
            Some(SourceEvent::Snapshot(None))
        );
        assert!(matches!(
            translate(publish(TOPIC, b"{not json"), TOPIC, &mut seen),
            Some(SourceEvent::Malformed(_))
        ));
    }

    #[test]
    fn test_connection_error_fails_subscription() {
        let mut seen = true;
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");

        match translate(Err(ConnectionError::Io(reset)), TOPIC, &mut seen) {
            Some(SourceEvent::Failed(msg)) => assert!(msg.contains("reset by peer"), "{}", msg),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_document() {
        let payload = br#"{"N": 12, "P": 30, "K": 55, "ph": 5.4, "temperature": 18.0, "humidity": 60}"#;

        let doc = decode_document(payload).unwrap().unwrap();
        assert_eq!(doc.n, Some(12.0));
        assert_eq!(doc.ph, Some(5.4));
        assert!(doc.device_id.is_none());
    }

    #[test]
    fn test_empty_payload_is_deleted_document() {
        assert_eq!(decode_document(b"").unwrap(), None);
        assert_eq!(decode_document(b"  \n").unwrap(), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_document(b"invalid json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_subscribe_requires_authentication() {
        tokio_test::block_on(async {
            let mut source = MqttSource::new(&BackendConfig::default(), None);
            let document = DocumentPath::new("test-app", "latest_reading");

            assert!(matches!(
                source.subscribe(&document).await,
                Err(Error::NotAuthenticated)
            ));
        });
    }

    #[test]
    fn test_token_becomes_credentials() {
        let backend = BackendConfig {
            client_id: Some("dash-7".to_string()),
            ..Default::default()
        };

        let source = MqttSource::new(&backend, Some("secret-token"));
        assert_eq!(
            source.options.credentials(),
            Some(("dash-7".to_string(), "secret-token".to_string()))
        );

        let anonymous = MqttSource::new(&backend, None);
        assert_eq!(anonymous.options.credentials(), None);
    }
}
