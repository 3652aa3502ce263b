//! Message sinks for inbound broker messages.

use pylon_link::MessageSink;

/// Sink that logs every inbound message.
///
/// The consumer attaches no semantics to payloads; downstream systems
/// pick them up from the structured log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn on_message(&self, topic: &str, payload: &str) {
        tracing::info!(topic = %topic, payload = %payload, "message consumed");
    }
}
