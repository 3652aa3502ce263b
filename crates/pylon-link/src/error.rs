//! Broker link error types.

use thiserror::Error;

/// Errors that can occur across the certificate, TLS, and session layers.
///
/// Per-attempt errors (`SourceUnavailable`, `InvalidCertificate`,
/// `MissingCa`, `Connect`, `Subscribe`) are caught and logged by the
/// supervisor each tick; `Configuration` and `UnsupportedBackend` are
/// fatal at startup.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("certificate source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("secrets manager '{0}' is not supported")]
    UnsupportedBackend(String),

    #[error("invalid certificate material: {0}")]
    InvalidCertificate(String),

    #[error(
        "server CA validation is required but no CA certificate was provided; \
         either disable require_ca_validation or supply a CA certificate"
    )]
    MissingCa,

    #[error("connect error: {0}")]
    Connect(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("unsubscribe error: {0}")]
    Unsubscribe(String),

    #[error("disconnect error: {0}")]
    Disconnect(String),
}

/// Convenience alias for broker link results.
pub type LinkResult<T> = Result<T, LinkError>;
