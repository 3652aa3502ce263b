//! Broker session layer for the Pylon consumer.
//!
//! Provides everything between raw certificate files and a live,
//! subscribed MQTT session:
//! - `CertificateSource` for PEM material (file-backed today,
//!   secret-store backends as explicit not-yet-supported variants)
//! - `tls::build` for per-attempt secure transport configuration
//! - `BrokerTransport` trait over rumqttc (mockable in tests)
//! - `ConnectionSupervisor` — the reconnect state machine
//! - `MockTransport` for testing without a broker

pub mod certs;
pub mod config;
pub mod error;
pub mod mock;
pub mod supervisor;
pub mod tls;
pub mod transport;

// Re-exports for convenience.
pub use certs::{CertificateMaterial, CertificateSettings, CertificateSource};
pub use config::{ConnectionConfig, QosLevel};
pub use error::{LinkError, LinkResult};
pub use mock::{MockTransport, RecordingSink};
pub use supervisor::{ConnectionSupervisor, MessageSink, SessionHandle, SessionState};
pub use tls::SecureTransportConfig;
pub use transport::{BrokerTransport, DisconnectReason, LinkEvent, MqttLinkTransport};
