//! TLS certificate loading for the listener.

use axum_server::tls_rustls::RustlsConfig;
use std::io;
use std::path::Path;

/// Load a rustls config from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    for (what, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {} file not found: {}", what, path.display()),
            ));
        }
    }

    tracing::debug!(cert = %cert_path.display(), "Loading TLS certificate");
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_files_are_reported() {
        let err = load_tls_config(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("certificate"));
    }
}
