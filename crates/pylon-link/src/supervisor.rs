//! Connection supervisor — the reconnect state machine.
//!
//! Owns the broker session: a fixed-interval poll loop initiates
//! connection attempts, asynchronous transport events are the only way
//! drops are detected, and cancellation triggers an uncancellable
//! cleanup sequence. Session state lives in a single atomic word so
//! observers never race the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::certs::{CertificateMaterial, CertificateSource};
use crate::config::ConnectionConfig;
use crate::error::{LinkError, LinkResult};
use crate::tls;
use crate::transport::{BrokerTransport, DisconnectReason, LinkEvent};

/// Session lifecycle state.
///
/// `Disconnected` is both the initial state and the state every
/// failure returns to; it is terminal only when reached through
/// explicit cancellation.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Subscribed = 2,
}

/// Cloneable handle to the supervisor's state word.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<AtomicU8>);

impl SessionHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionState::Disconnected as u8)))
    }

    pub fn get(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::Disconnected,
            1 => SessionState::Connecting,
            _ => SessionState::Subscribed,
        }
    }

    fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Receives decoded inbound messages.
pub trait MessageSink: Send + Sync {
    fn on_message(&self, topic: &str, payload: &str);
}

impl<S: MessageSink + ?Sized> MessageSink for Arc<S> {
    fn on_message(&self, topic: &str, payload: &str) {
        (**self).on_message(topic, payload);
    }
}

enum Wake {
    Cancelled,
    Tick,
    Event(LinkEvent),
    EventsClosed,
}

/// Reconnect/backoff state machine owning one broker session.
///
/// Fixed-interval retry by design: the poll interval is seconds, not a
/// sub-second hot loop, so failed attempts simply wait for the next
/// tick with no backoff escalation.
pub struct ConnectionSupervisor<T, S> {
    config: ConnectionConfig,
    source: CertificateSource,
    transport: T,
    sink: S,
    events: mpsc::Receiver<LinkEvent>,
    state: SessionHandle,
    // Loaded once on first success and reused for the process
    // lifetime; a changed certificate requires a restart.
    material: Option<CertificateMaterial>,
}

impl<T: BrokerTransport, S: MessageSink> ConnectionSupervisor<T, S> {
    pub fn new(
        config: ConnectionConfig,
        source: CertificateSource,
        transport: T,
        sink: S,
        events: mpsc::Receiver<LinkEvent>,
    ) -> Self {
        Self {
            config,
            source,
            transport,
            sink,
            events,
            state: SessionHandle::new(),
            material: None,
        }
    }

    /// Observable handle to the session state word.
    pub fn state(&self) -> SessionHandle {
        self.state.clone()
    }

    /// Drive the session until cancelled.
    ///
    /// One logical loop: ticks initiate connection attempts when
    /// disconnected, transport events are applied as they arrive, and
    /// cancellation pre-empts any in-flight wait. The cleanup sequence
    /// always runs to completion before this returns.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.status_check_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                _ = cancel.cancelled() => Wake::Cancelled,
                _ = ticker.tick() => Wake::Tick,
                event = self.events.recv() => match event {
                    Some(event) => Wake::Event(event),
                    None => Wake::EventsClosed,
                },
            };

            match wake {
                Wake::Cancelled => break,
                Wake::Tick => {
                    // Never start a second attempt while one is
                    // outstanding or a session is live.
                    if self.state.get() == SessionState::Disconnected {
                        self.attempt_connect().await;
                    }
                }
                Wake::Event(event) => self.handle_event(event),
                Wake::EventsClosed => {
                    tracing::error!("transport event channel closed; stopping supervisor");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// One full connect sequence: material, TLS config, connect,
    /// subscribe. Every failure is caught here — the loop never dies,
    /// it retries on the next tick.
    async fn attempt_connect(&mut self) {
        self.state.set(SessionState::Connecting);
        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            "connecting to broker"
        );

        match self.connect_sequence().await {
            Ok(()) => {
                self.state.set(SessionState::Subscribed);
                tracing::info!(topic = %self.config.topic, "subscribed to topic");
            }
            Err(e) => {
                match &e {
                    LinkError::InvalidCertificate(_) | LinkError::MissingCa => {
                        tracing::error!(
                            error = %e,
                            "trust material is unusable; operator action required"
                        );
                    }
                    _ => {
                        tracing::warn!(error = %e, "connect sequence failed; retrying next tick");
                    }
                }
                self.state.set(SessionState::Disconnected);
            }
        }
    }

    async fn connect_sequence(&mut self) -> LinkResult<()> {
        let material = match &self.material {
            Some(material) => material.clone(),
            None => {
                let material = self.source.obtain()?;
                self.material = Some(material.clone());
                material
            }
        };

        // Fresh transport config per attempt; discarded afterwards.
        let transport_config = tls::build(&material, self.config.require_ca_validation)?;

        self.transport.connect(&transport_config).await?;
        self.transport
            .subscribe(&self.config.topic, self.config.qos.to_qos())
            .await?;
        Ok(())
    }

    fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                tracing::info!("broker connection established");
            }
            LinkEvent::Disconnected {
                reason,
                was_connected,
            } => {
                tracing::warn!(
                    reason = %reason,
                    was_connected,
                    "broker connection lost; will reconnect on next tick"
                );
                self.state.set(SessionState::Disconnected);
            }
            LinkEvent::Message { topic, payload } => {
                let text = match String::from_utf8(payload) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(
                            topic = %topic,
                            "payload is not valid UTF-8; forwarding lossy text"
                        );
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                tracing::info!(topic = %topic, payload = %text, "message received");
                self.sink.on_message(&topic, &text);
            }
        }
    }

    /// Cleanup sequence. Not cancellable: unsubscribe is best-effort,
    /// disconnect and resource release always run.
    async fn shutdown(&mut self) {
        tracing::info!("shutdown requested; closing broker session");

        if self.state.get() == SessionState::Subscribed {
            if let Err(e) = self.transport.unsubscribe(&self.config.topic).await {
                tracing::warn!(error = %e, "unsubscribe failed during shutdown");
            }
        }
        if let Err(e) = self.transport.disconnect(DisconnectReason::Normal).await {
            tracing::warn!(error = %e, "disconnect failed during shutdown");
        }

        self.state.set(SessionState::Disconnected);
        tracing::info!("broker session closed");
    }
}
