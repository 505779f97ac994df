//! TLS configuration and certificate loading.
//!
//! Certificates come from PEM files on disk; obtaining and renewing them is
//! left to an external tool (certbot, a sidecar, ...).

use axum_server::tls_rustls::RustlsConfig;
use std::io;
use std::path::Path;

use crate::config::TlsConfig;

/// Load the rustls server configuration described by `config`.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, io::Error> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    for (what, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} file not found: {:?}", what, path),
            ));
        }
    }

    let tls = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = ?cert_path, "TLS certificate loaded");
    Ok(tls)
}
