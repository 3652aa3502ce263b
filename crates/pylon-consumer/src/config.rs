//! Consumer configuration, loadable from TOML.

use serde::Deserialize;

use pylon_link::{CertificateSettings, ConnectionConfig};

/// Top-level configuration for the consumer process.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// Broker connection settings.
    pub mqtt: ConnectionConfig,
    /// Certificate source selection.
    pub certificates: CertificateSettings,
}

impl ConsumerConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
