//! E2E tests for error paths: bad trust material, unsupported
//! backends, and invalid configuration.

mod helpers;

use helpers::{TestHarness, sensors_config, testdata};
use pylon_consumer::config::ConsumerConfig;
use pylon_link::certs::{CertificatePaths, CertificateSettings, SecretRefs};
use pylon_link::{CertificateSource, LinkError, SessionState};

/// CA validation demanded but the CA file is gone: every tick fails in
/// the TLS stage before any network attempt, the state never leaves
/// Disconnected, and the process does not crash.
#[tokio::test(start_paused = true)]
async fn unreadable_ca_loops_without_connecting() {
    let source = CertificateSource::Files(CertificatePaths {
        client_cert: testdata("client.pem"),
        client_key: testdata("client.key"),
        client_key_password: None,
        ca_cert: Some("/nonexistent/ca.pem".into()),
    });
    let h = TestHarness::spawn(sensors_config(), source, |_| {});

    h.settle().await;
    assert_eq!(h.state.get(), SessionState::Disconnected);
    h.next_tick().await;
    h.next_tick().await;
    assert_eq!(h.state.get(), SessionState::Disconnected);
    assert_eq!(h.mock.connect_attempts(), 0);

    h.shutdown().await;
}

/// Missing client key keeps the source stage failing each tick.
#[tokio::test(start_paused = true)]
async fn missing_client_key_loops_without_connecting() {
    let source = CertificateSource::Files(CertificatePaths {
        client_cert: testdata("client.pem"),
        client_key: "/nonexistent/client.key".into(),
        client_key_password: None,
        ca_cert: Some(testdata("ca.pem")),
    });
    let h = TestHarness::spawn(sensors_config(), source, |_| {});

    h.next_tick().await;
    h.next_tick().await;
    assert_eq!(h.state.get(), SessionState::Disconnected);
    assert_eq!(h.mock.connect_attempts(), 0);

    h.shutdown().await;
}

/// Unknown secrets-manager names are rejected at startup, before any
/// supervisor loop exists.
#[test]
fn unknown_backend_fails_at_startup() {
    let settings = CertificateSettings {
        use_secrets_manager: true,
        secrets_manager_type: Some("vault".into()),
        paths: None,
        secret_keys: Some(SecretRefs {
            client_cert: "pylon/cert".into(),
            client_key: "pylon/key".into(),
            client_key_password: None,
            ca_cert: None,
        }),
    };
    assert!(matches!(
        CertificateSource::from_settings(&settings),
        Err(LinkError::UnsupportedBackend(name)) if name == "vault"
    ));
}

/// A declared-but-unimplemented backend is constructible (config
/// round-trips) yet fails fast on first use.
#[test]
fn azure_backend_fails_fast_on_obtain() {
    let settings = CertificateSettings {
        use_secrets_manager: true,
        secrets_manager_type: Some("azure".into()),
        paths: None,
        secret_keys: Some(SecretRefs {
            client_cert: "pylon/cert".into(),
            client_key: "pylon/key".into(),
            client_key_password: None,
            ca_cert: None,
        }),
    };
    let source = CertificateSource::from_settings(&settings).unwrap();
    assert!(matches!(
        source.obtain(),
        Err(LinkError::UnsupportedBackend(name)) if name == "azure"
    ));
}

/// Invalid connection settings are caught by validation before the
/// supervisor would start.
#[test]
fn invalid_connection_settings_are_fatal_at_startup() {
    let toml = r#"
[mqtt]
host = "broker.example"
port = 8883
client_id = ""
topic = "sensors/1"

[certificates]
[certificates.paths]
client_cert = "/c.pem"
client_key = "/k.pem"
"#;
    let config: ConsumerConfig = toml::from_str(toml).unwrap();
    assert!(matches!(
        config.mqtt.validate(),
        Err(LinkError::Configuration(_))
    ));
}
