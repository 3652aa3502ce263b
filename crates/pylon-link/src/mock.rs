//! Mock broker transport for testing without a real broker.
//!
//! Records every lifecycle call, supports scripting per-call failures,
//! and lets tests inject broker events (drops, publishes) into the
//! supervisor's event channel.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rumqttc::QoS;
use tokio::sync::mpsc;

use crate::error::{LinkError, LinkResult};
use crate::supervisor::MessageSink;
use crate::tls::SecureTransportConfig;
use crate::transport::{BrokerTransport, DisconnectReason, LinkEvent};

/// A recorded lifecycle call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Connect,
    Subscribe { topic: String, qos: QoS },
    Unsubscribe { topic: String },
    Disconnect { reason: DisconnectReason },
}

/// Mock implementation of the `BrokerTransport` trait.
///
/// All calls succeed unless a failure was scripted with one of the
/// `fail_next_*` methods (failures are consumed in FIFO order).
pub struct MockTransport {
    events: mpsc::Sender<LinkEvent>,
    calls: Mutex<Vec<TransportCall>>,
    connect_failures: Mutex<VecDeque<LinkError>>,
    subscribe_failures: Mutex<VecDeque<LinkError>>,
    unsubscribe_failures: Mutex<VecDeque<LinkError>>,
}

impl MockTransport {
    pub fn new() -> (Self, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                events: tx,
                calls: Mutex::new(Vec::new()),
                connect_failures: Mutex::new(VecDeque::new()),
                subscribe_failures: Mutex::new(VecDeque::new()),
                unsubscribe_failures: Mutex::new(VecDeque::new()),
            },
            rx,
        )
    }

    /// Inject a broker event as if the transport's pump delivered it.
    pub async fn emit(&self, event: LinkEvent) {
        self.events.send(event).await.expect("event channel closed");
    }

    pub fn fail_next_connect(&self, err: LinkError) {
        self.connect_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_subscribe(&self, err: LinkError) {
        self.subscribe_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_unsubscribe(&self, err: LinkError) {
        self.unsubscribe_failures.lock().unwrap().push_back(err);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of connect attempts observed.
    pub fn connect_attempts(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, TransportCall::Connect))
            .count()
    }

    /// Topics subscribed to, in order.
    pub fn subscribed_topics(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Subscribe { topic, .. } => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_failure(queue: &Mutex<VecDeque<LinkError>>) -> Option<LinkError> {
        queue.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl BrokerTransport for MockTransport {
    async fn connect(&self, _transport: &SecureTransportConfig) -> LinkResult<()> {
        self.record(TransportCall::Connect);
        match Self::next_failure(&self.connect_failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> LinkResult<()> {
        self.record(TransportCall::Subscribe {
            topic: topic.to_string(),
            qos,
        });
        match Self::next_failure(&self.subscribe_failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn unsubscribe(&self, topic: &str) -> LinkResult<()> {
        self.record(TransportCall::Unsubscribe {
            topic: topic.to_string(),
        });
        match Self::next_failure(&self.unsubscribe_failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn disconnect(&self, reason: DisconnectReason) -> LinkResult<()> {
        self.record(TransportCall::Disconnect { reason });
        Ok(())
    }
}

/// Message sink that stores everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl MessageSink for RecordingSink {
    fn on_message(&self, topic: &str, payload: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
    }
}
