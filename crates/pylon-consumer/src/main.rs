//! Pylon consumer — long-lived mTLS MQTT topic consumer.
//!
//! Wires the certificate pipeline, broker transport, and connection
//! supervisor into a single binary with graceful shutdown.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pylon_consumer::config::ConsumerConfig;
use pylon_consumer::sink::LogSink;
use pylon_link::{CertificateSource, ConnectionSupervisor, MqttLinkTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "pylon-consumer starting"
    );

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/pylon/consumer.toml".to_string());

    let config = ConsumerConfig::from_file(&config_path)?;
    config.mqtt.validate()?;
    tracing::info!(
        host = %config.mqtt.host,
        port = config.mqtt.port,
        client_id = %config.mqtt.client_id,
        topic = %config.mqtt.topic,
        "config loaded"
    );

    if !config.mqtt.require_ca_validation {
        tracing::warn!(
            "require_ca_validation is disabled: the broker's certificate will NOT be \
             verified — development use only"
        );
    }

    // ── Certificate source ──────────────────────────────────────
    // Backend selection failures are fatal before the loop starts.
    let source = CertificateSource::from_settings(&config.certificates)?;

    // ── Broker transport & supervisor ───────────────────────────
    let (transport, events) = MqttLinkTransport::new(&config.mqtt);
    let supervisor =
        ConnectionSupervisor::new(config.mqtt.clone(), source, transport, LogSink, events);

    // ── Graceful shutdown on SIGINT ─────────────────────────────
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    tracing::info!("pylon-consumer ready");
    supervisor.run(cancel).await;

    tracing::info!("pylon-consumer stopped");
    Ok(())
}
