//! Broker transport abstraction over rumqttc.
//!
//! The supervisor drives a `BrokerTransport` through its lifecycle and
//! learns about asynchronous connection events (drops, inbound
//! publishes) exclusively through the `LinkEvent` channel handed out at
//! construction. The rumqttc event loop is owned here and translated
//! into typed events; retry policy lives in the supervisor, never in
//! the transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::config::ConnectionConfig;
use crate::error::{LinkError, LinkResult};
use crate::tls::SecureTransportConfig;

/// Capacity of the event channel and the rumqttc request queue.
const CHANNEL_CAPACITY: usize = 64;

/// Upper bound on waiting for the broker's connection acknowledgement.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to let the event loop flush a DISCONNECT packet on close.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Asynchronous notification from the broker session.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// The broker acknowledged the connection.
    Connected,
    /// The connection dropped (broker-initiated or transport failure).
    Disconnected { reason: String, was_connected: bool },
    /// An inbound publish on a subscribed topic.
    Message { topic: String, payload: Vec<u8> },
}

/// Why a disconnect was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Orderly shutdown.
    Normal,
}

/// Lifecycle primitives the supervisor drives.
///
/// Mockable in tests without a real broker.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Open a connection using a per-attempt transport configuration.
    /// Resolves once the broker has acknowledged the session.
    async fn connect(&self, transport: &SecureTransportConfig) -> LinkResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, topic: &str, qos: QoS) -> LinkResult<()>;

    /// Unsubscribe from a topic filter.
    async fn unsubscribe(&self, topic: &str) -> LinkResult<()>;

    /// Close the connection and release transport resources.
    async fn disconnect(&self, reason: DisconnectReason) -> LinkResult<()>;
}

#[async_trait]
impl<T: BrokerTransport + ?Sized> BrokerTransport for Arc<T> {
    async fn connect(&self, transport: &SecureTransportConfig) -> LinkResult<()> {
        (**self).connect(transport).await
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> LinkResult<()> {
        (**self).subscribe(topic, qos).await
    }

    async fn unsubscribe(&self, topic: &str) -> LinkResult<()> {
        (**self).unsubscribe(topic).await
    }

    async fn disconnect(&self, reason: DisconnectReason) -> LinkResult<()> {
        (**self).disconnect(reason).await
    }
}

struct Inner {
    client: Option<AsyncClient>,
    pump: Option<JoinHandle<()>>,
}

/// rumqttc-backed broker transport.
///
/// `new()` returns `(transport, events)`; the receiver stays valid
/// across reconnects. Each `connect` builds a fresh client and event
/// loop, waits inline for the broker's ConnAck, then hands the event
/// loop to a pump task that forwards publishes and reports drops.
pub struct MqttLinkTransport {
    host: String,
    port: u16,
    client_id: String,
    keepalive: Duration,
    events: mpsc::Sender<LinkEvent>,
    closing: Arc<AtomicBool>,
    inner: Mutex<Inner>,
}

impl MqttLinkTransport {
    pub fn new(config: &ConnectionConfig) -> (Self, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                host: config.host.clone(),
                port: config.port,
                client_id: config.client_id.clone(),
                keepalive: Duration::from_secs(config.keepalive_secs.into()),
                events: tx,
                closing: Arc::new(AtomicBool::new(false)),
                inner: Mutex::new(Inner {
                    client: None,
                    pump: None,
                }),
            },
            rx,
        )
    }
}

#[async_trait]
impl BrokerTransport for MqttLinkTransport {
    async fn connect(&self, transport: &SecureTransportConfig) -> LinkResult<()> {
        let mut inner = self.inner.lock().await;

        // Drop any leftovers from a previous session.
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        inner.client = None;
        self.closing.store(false, Ordering::SeqCst);

        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keepalive);
        options.set_transport(transport.transport());

        let (client, mut eventloop) = AsyncClient::new(options, CHANNEL_CAPACITY);

        // Drive the event loop inline until the broker acknowledges the
        // session, so a failed attempt surfaces here and not as a
        // phantom event later.
        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(LinkError::Connect(e.to_string())),
                }
            }
        };
        tokio::time::timeout(CONNECT_TIMEOUT, handshake)
            .await
            .map_err(|_| {
                LinkError::Connect(format!(
                    "timed out after {}s waiting for broker acknowledgement",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })??;

        let _ = self.events.send(LinkEvent::Connected).await;

        let events = self.events.clone();
        let closing = Arc::clone(&self.closing);
        let pump = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let event = LinkEvent::Message {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // An orderly disconnect also ends the event
                        // loop with an error; only report real drops.
                        if !closing.load(Ordering::SeqCst) {
                            let _ = events
                                .send(LinkEvent::Disconnected {
                                    reason: e.to_string(),
                                    was_connected: true,
                                })
                                .await;
                        }
                        break;
                    }
                }
            }
        });

        inner.client = Some(client);
        inner.pump = Some(pump);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> LinkResult<()> {
        let inner = self.inner.lock().await;
        let client = inner
            .client
            .as_ref()
            .ok_or_else(|| LinkError::Subscribe("not connected".into()))?;
        client
            .subscribe(topic, qos)
            .await
            .map_err(|e| LinkError::Subscribe(e.to_string()))
    }

    async fn unsubscribe(&self, topic: &str) -> LinkResult<()> {
        let inner = self.inner.lock().await;
        let client = inner
            .client
            .as_ref()
            .ok_or_else(|| LinkError::Unsubscribe("not connected".into()))?;
        client
            .unsubscribe(topic)
            .await
            .map_err(|e| LinkError::Unsubscribe(e.to_string()))
    }

    async fn disconnect(&self, reason: DisconnectReason) -> LinkResult<()> {
        let mut inner = self.inner.lock().await;
        self.closing.store(true, Ordering::SeqCst);

        let result = match inner.client.take() {
            Some(client) => client
                .disconnect()
                .await
                .map_err(|e| LinkError::Disconnect(e.to_string())),
            None => Ok(()),
        };

        if let Some(mut pump) = inner.pump.take() {
            // Let the event loop flush the DISCONNECT packet before
            // tearing it down.
            if tokio::time::timeout(DISCONNECT_GRACE, &mut pump)
                .await
                .is_err()
            {
                pump.abort();
            }
        }

        tracing::info!(?reason, "broker connection closed");
        result
    }
}
