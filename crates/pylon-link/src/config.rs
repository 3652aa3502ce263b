//! Broker connection configuration, loadable from TOML.

use serde::Deserialize;

use crate::error::{LinkError, LinkResult};

/// Subscription quality-of-service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QosLevel {
    pub fn to_qos(self) -> rumqttc::QoS {
        match self {
            QosLevel::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QosLevel::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Immutable broker connection settings, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port (default 8883 for TLS).
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT client ID (must be unique per consumer instance).
    pub client_id: String,
    /// Topic filter to subscribe to.
    pub topic: String,
    /// Subscription QoS level.
    #[serde(default = "default_qos")]
    pub qos: QosLevel,
    /// Poll interval in seconds for the reconnect loop.
    #[serde(default = "default_status_check_secs")]
    pub status_check_secs: u64,
    /// Validate the server certificate chain against a pinned CA.
    /// When false the session trusts any server certificate — dev only.
    #[serde(default)]
    pub require_ca_validation: bool,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,
}

fn default_port() -> u16 {
    8883
}

fn default_qos() -> QosLevel {
    QosLevel::ExactlyOnce
}

fn default_status_check_secs() -> u64 {
    10
}

fn default_keepalive() -> u16 {
    30
}

impl ConnectionConfig {
    /// Validate invariants before the supervisor loop starts.
    ///
    /// Failures here are fatal at startup, never retried.
    pub fn validate(&self) -> LinkResult<()> {
        if self.host.trim().is_empty() {
            return Err(LinkError::Configuration("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(LinkError::Configuration(
                "port must be in range 1-65535".into(),
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(LinkError::Configuration(
                "client_id must not be empty".into(),
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(LinkError::Configuration("topic must not be empty".into()));
        }
        if self.status_check_secs < 1 {
            return Err(LinkError::Configuration(
                "status_check_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
