//! TLS setup for the HTTP client
//!
//! The experiment manager commonly runs behind a self-signed certificate,
//! so the client can trust an extra CA bundle or skip verification entirely.

use std::path::Path;

use reqwest::redirect::Policy;
use reqwest::{Certificate, Client, ClientBuilder};
use tracing::{info, warn};

use crate::error::{ClientError, Result};

/// Builder shared by every client this crate creates
///
/// Redirects are never followed: a redirected update was not applied, and
/// its status must reach the caller.
pub fn client_builder() -> ClientBuilder {
    Client::builder().redirect(Policy::none())
}

/// Builds the HTTP client used for every request
///
/// # Arguments
/// * `certificate_path` - Optional PEM file whose certificates are added as trusted roots
/// * `insecure` - Accept any server certificate
///
/// # Errors
/// Returns [`ClientError::Certificate`] if the PEM file cannot be read or
/// contains no usable certificate.
pub fn build_http_client(certificate_path: Option<&Path>, insecure: bool) -> Result<Client> {
    let mut builder = client_builder();

    if let Some(path) = certificate_path {
        for certificate in load_certificates(path)? {
            builder = builder.add_root_certificate(certificate);
        }
        info!("Trusting CA certificate(s) from {}", path.display());
    }

    if insecure {
        warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

fn load_certificates(path: &Path) -> Result<Vec<Certificate>> {
    let pem = std::fs::read(path).map_err(|e| ClientError::Certificate {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let certificates = Certificate::from_pem_bundle(&pem).map_err(|e| ClientError::Certificate {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if certificates.is_empty() {
        return Err(ClientError::Certificate {
            path: path.to_path_buf(),
            reason: "no certificates found".to_string(),
        });
    }

    Ok(certificates)
}
