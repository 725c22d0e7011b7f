//! TLS Configuration for the gRPC Listener
//!
//! Provides:
//! - Certificate and key loading from files or PEM strings
//! - Self-signed certificate generation for development
//! - Client certificate verification (mTLS), optional or required
//!
//! # Development Mode
//!
//! When TLS is enabled but no certificate paths are configured, a self-signed
//! certificate is generated at startup.

use std::fs;
use std::path::Path;

use rcgen::{CertificateParams, DnType, KeyPair};
use tonic::transport::{Certificate, Identity, ServerTlsConfig};

use crate::infrastructure::config::TlsSettings;

/// TLS configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Failed to read a certificate or key file.
    #[error("failed to read certificate file: {0}")]
    CertificateRead(#[from] std::io::Error),

    /// Failed to generate a self-signed certificate.
    #[error("failed to generate certificate: {0}")]
    CertificateGeneration(String),

    /// Certificate path set without its key, or the reverse.
    #[error("TLS configuration error: {0}")]
    Configuration(String),
}

/// TLS material for the gRPC server.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Server certificate (PEM).
    pub cert: String,
    /// Server private key (PEM).
    pub key: String,
    /// CA used to verify client certificates.
    pub ca_cert: Option<String>,
    /// Reject clients that present no certificate.
    pub client_auth_required: bool,
}

impl TlsConfig {
    /// Load PEM files.
    pub fn from_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        ca_path: Option<impl AsRef<Path>>,
        client_auth_required: bool,
    ) -> Result<Self, TlsError> {
        let cert = fs::read_to_string(cert_path)?;
        let key = fs::read_to_string(key_path)?;
        let ca_cert = ca_path.map(fs::read_to_string).transpose()?;

        Ok(Self {
            cert,
            key,
            ca_cert,
            client_auth_required,
        })
    }

    /// Build from PEM strings.
    pub fn from_pem(
        cert: impl Into<String>,
        key: impl Into<String>,
        ca_cert: Option<String>,
        client_auth_required: bool,
    ) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
            ca_cert,
            client_auth_required,
        }
    }

    /// Generate a self-signed certificate that also acts as its own client CA.
    pub fn generate_self_signed(
        common_name: &str,
        san_dns_names: &[&str],
    ) -> Result<Self, TlsError> {
        let key_pair =
            KeyPair::generate().map_err(|e| TlsError::CertificateGeneration(e.to_string()))?;

        let san_strings: Vec<String> = san_dns_names.iter().map(|s| (*s).to_string()).collect();
        let mut params = CertificateParams::new(san_strings)
            .map_err(|e| TlsError::CertificateGeneration(e.to_string()))?;
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params
            .distinguished_name
            .push(DnType::OrganizationName, "SensorSphere");

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| TlsError::CertificateGeneration(e.to_string()))?;
        let cert_pem = cert.pem();

        tracing::info!(
            common_name = %common_name,
            san_count = san_dns_names.len(),
            "Generated self-signed certificate"
        );

        Ok(Self {
            cert: cert_pem.clone(),
            key: key_pair.serialize_pem(),
            ca_cert: Some(cert_pem),
            client_auth_required: false,
        })
    }

    /// Resolve settings into TLS material. `None` means plaintext.
    pub fn from_settings(settings: &TlsSettings, node_name: &str) -> Result<Option<Self>, TlsError> {
        if !settings.enabled {
            tracing::info!("gRPC TLS disabled");
            return Ok(None);
        }

        match (&settings.cert_path, &settings.key_path) {
            (Some(cert_path), Some(key_path)) => {
                tracing::info!(
                    cert_path = %cert_path.display(),
                    key_path = %key_path.display(),
                    ca_path = ?settings.ca_path,
                    client_auth = settings.client_auth_required,
                    "Loading TLS certificates from files"
                );
                Self::from_files(
                    cert_path,
                    key_path,
                    settings.ca_path.as_ref(),
                    settings.client_auth_required,
                )
                .map(Some)
            }
            (None, None) => {
                tracing::warn!(
                    "No TLS certificate paths provided, generating self-signed certificate for development"
                );
                Self::generate_self_signed(node_name, &["localhost", "127.0.0.1", "::1"]).map(Some)
            }
            _ => Err(TlsError::Configuration(
                "certificate and key paths must be set together".to_string(),
            )),
        }
    }

    /// Build the tonic server configuration.
    ///
    /// With a client CA, presented client certificates are verified against
    /// it. Unless `client_auth_required` is set, clients may still connect
    /// without one.
    #[must_use]
    pub fn build_server_config(&self) -> ServerTlsConfig {
        let identity = Identity::from_pem(&self.cert, &self.key);
        let mut config = ServerTlsConfig::new().identity(identity);

        if let Some(ca) = &self.ca_cert {
            config = config
                .client_ca_root(Certificate::from_pem(ca))
                .client_auth_optional(!self.client_auth_required);
            tracing::info!(
                required = self.client_auth_required,
                "mTLS enabled: client certificates will be verified"
            );
        }

        config
    }
}
