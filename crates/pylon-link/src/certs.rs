//! Certificate material sourcing.
//!
//! Supplies the raw PEM material the TLS pipeline is built from.
//! File-backed today; secret-store backends are explicit variants that
//! fail fast rather than silently falling back.

use std::path::Path;

use serde::Deserialize;

use crate::error::{LinkError, LinkResult};

/// Raw PEM certificate material for one broker identity.
///
/// Loaded once at startup and treated as read-only for the process
/// lifetime — rotating a certificate requires a restart.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    /// Client certificate (PEM).
    pub client_cert_pem: String,
    /// Client private key (PEM).
    pub client_key_pem: String,
    /// Optional key-decryption passphrase.
    pub key_passphrase: Option<String>,
    /// Optional CA certificate (PEM). Required when the connection
    /// config demands server CA validation.
    pub ca_cert_pem: Option<String>,
}

/// File paths for PEM material on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificatePaths {
    pub client_cert: String,
    pub client_key: String,
    #[serde(default)]
    pub client_key_password: Option<String>,
    #[serde(default)]
    pub ca_cert: Option<String>,
}

/// Secret references for secret-store backends.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretRefs {
    pub client_cert: String,
    pub client_key: String,
    #[serde(default)]
    pub client_key_password: Option<String>,
    #[serde(default)]
    pub ca_cert: Option<String>,
}

/// Certificate source selection, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateSettings {
    /// Fetch material from a secrets manager instead of local files.
    #[serde(default)]
    pub use_secrets_manager: bool,
    /// Secrets manager backend name (e.g. "aws", "azure").
    #[serde(default)]
    pub secrets_manager_type: Option<String>,
    /// File paths for the file-backed source.
    #[serde(default)]
    pub paths: Option<CertificatePaths>,
    /// Secret references for secret-store backends.
    #[serde(default)]
    pub secret_keys: Option<SecretRefs>,
}

/// Where certificate material comes from.
///
/// Closed set of backends: unimplemented ones are constructed (so the
/// configuration round-trips) but `obtain` fails with a clear
/// not-supported error instead of a reachable fallback path.
#[derive(Debug, Clone)]
pub enum CertificateSource {
    Files(CertificatePaths),
    AwsSecrets(SecretRefs),
    AzureKeyVault(SecretRefs),
}

impl CertificateSource {
    /// Select a backend from settings.
    ///
    /// Fails at startup when neither file paths nor secret references
    /// are configured, or when the backend name is unrecognized.
    pub fn from_settings(settings: &CertificateSettings) -> LinkResult<Self> {
        if settings.paths.is_none() && settings.secret_keys.is_none() {
            return Err(LinkError::Configuration(
                "no certificate paths or secret references found in configuration".into(),
            ));
        }

        if settings.use_secrets_manager {
            let refs = settings.secret_keys.clone().ok_or_else(|| {
                LinkError::Configuration("certificate secret references are not configured".into())
            })?;
            let backend = settings
                .secrets_manager_type
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    LinkError::Configuration("secrets manager type is not specified".into())
                })?;
            return match backend {
                "aws" => Ok(CertificateSource::AwsSecrets(refs)),
                "azure" => Ok(CertificateSource::AzureKeyVault(refs)),
                other => Err(LinkError::UnsupportedBackend(other.to_string())),
            };
        }

        let paths = settings.paths.clone().ok_or_else(|| {
            LinkError::Configuration("certificate paths are not configured".into())
        })?;
        Ok(CertificateSource::Files(paths))
    }

    /// Fetch certificate material from the selected backend.
    ///
    /// Performs blocking file I/O. Mandatory material (client cert and
    /// key) must be readable; a configured-but-missing optional path
    /// (passphrase, CA) resolves to absent rather than an error.
    pub fn obtain(&self) -> LinkResult<CertificateMaterial> {
        match self {
            CertificateSource::Files(paths) => {
                let client_cert_pem = read_required(&paths.client_cert, "client certificate")?;
                let client_key_pem = read_required(&paths.client_key, "client key")?;
                let key_passphrase = read_optional(paths.client_key_password.as_deref())?;
                let ca_cert_pem = read_optional(paths.ca_cert.as_deref())?;

                Ok(CertificateMaterial {
                    client_cert_pem,
                    client_key_pem,
                    key_passphrase,
                    ca_cert_pem,
                })
            }
            CertificateSource::AwsSecrets(_) => {
                Err(LinkError::UnsupportedBackend("aws".to_string()))
            }
            CertificateSource::AzureKeyVault(_) => {
                Err(LinkError::UnsupportedBackend("azure".to_string()))
            }
        }
    }
}

fn read_required(path: &str, what: &str) -> LinkResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| LinkError::SourceUnavailable(format!("failed to read {what} '{path}': {e}")))
}

/// Read an optional PEM path. Unset paths and configured paths that do
/// not exist on disk both resolve to `None`; only a file that exists
/// but cannot be read is an error.
fn read_optional(path: Option<&str>) -> LinkResult<Option<String>> {
    match path {
        Some(p) if Path::new(p).exists() => {
            let contents = std::fs::read_to_string(p).map_err(|e| {
                LinkError::SourceUnavailable(format!("failed to read optional '{p}': {e}"))
            })?;
            Ok(Some(contents))
        }
        _ => Ok(None),
    }
}
