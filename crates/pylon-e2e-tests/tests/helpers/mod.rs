//! Shared harness for lifecycle tests: mock transport + recording
//! sink + a supervisor task driven by a paused tokio clock.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use pylon_link::certs::CertificatePaths;
use pylon_link::{
    CertificateSource, ConnectionConfig, ConnectionSupervisor, MockTransport, QosLevel,
    RecordingSink, SessionHandle,
};

/// Path to a PEM fixture shipped with pylon-link.
pub fn testdata(file: &str) -> String {
    format!(
        "{}/../pylon-link/testdata/{file}",
        env!("CARGO_MANIFEST_DIR")
    )
}

pub fn valid_file_source() -> CertificateSource {
    CertificateSource::Files(CertificatePaths {
        client_cert: testdata("client.pem"),
        client_key: testdata("client.key"),
        client_key_password: None,
        ca_cert: Some(testdata("ca.pem")),
    })
}

pub fn sensors_config() -> ConnectionConfig {
    ConnectionConfig {
        host: "broker.example".into(),
        port: 8883,
        client_id: "pylon-e2e".into(),
        topic: "sensors/1".into(),
        qos: QosLevel::ExactlyOnce,
        status_check_secs: 10,
        require_ca_validation: true,
        keepalive_secs: 30,
    }
}

pub struct TestHarness {
    pub mock: Arc<MockTransport>,
    pub sink: Arc<RecordingSink>,
    pub state: SessionHandle,
    pub cancel: CancellationToken,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestHarness {
    /// Spawn a supervisor over a mock transport. `setup` runs before
    /// the supervisor starts (script failures there).
    pub fn spawn(
        config: ConnectionConfig,
        source: CertificateSource,
        setup: impl FnOnce(&MockTransport),
    ) -> Self {
        let (mock, events) = MockTransport::new();
        setup(&mock);
        let mock = Arc::new(mock);
        let sink = Arc::new(RecordingSink::new());
        let supervisor = ConnectionSupervisor::new(
            config,
            source,
            Arc::clone(&mock),
            Arc::clone(&sink),
            events,
        );
        let state = supervisor.state();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(supervisor.run(cancel.clone()));
        Self {
            mock,
            sink,
            state,
            cancel,
            handle,
        }
    }

    /// Let the supervisor task catch up with pending work.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    /// Advance past the next poll tick.
    pub async fn next_tick(&self) {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.handle.await.unwrap();
    }
}
