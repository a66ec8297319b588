//! rustls-backed TLS connector for IMAP clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

mod verify;

/// TLS stream type used for IMAP connections.
pub type TlsStream = tokio_rustls::client::TlsStream<tokio::net::TcpStream>;

/// Errors returned while preparing or establishing a TLS connection.
#[derive(Debug, thiserror::Error)]
pub enum TlsConnectError {
    /// Failed to load system root certificates.
    #[error("failed to load system root certificates: {0}")]
    RootCerts(#[from] rustls_native_certs::Error),

    /// Failed to read the extra CA file.
    #[error("failed to read CA file {}: {source}", path.display())]
    CaFile {
        /// The CA file.
        path: PathBuf,

        /// The cause.
        #[source]
        source: std::io::Error,
    },

    /// The extra CA file holds no usable certificate.
    #[error("no certificates in CA file {}", .0.display())]
    EmptyCaFile(PathBuf),

    /// The TLS client could not be configured.
    #[error("failed to configure TLS: {0}")]
    Config(#[source] rustls::Error),

    /// The certificate verifier could not be built.
    #[error("failed to build certificate verifier: {0}")]
    Verifier(#[source] rustls::client::VerifierBuilderError),

    /// Invalid DNS name for TLS verification.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(String),

    /// TLS handshake or I/O error.
    #[error("TLS I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the server certificate is checked.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Verification {
    /// The chain must lead to a trusted root and name the server.
    #[default]
    Full,

    /// The chain must lead to a trusted root; the names in it are ignored.
    AnyName,

    /// Any certificate is accepted. Handshake signatures are still checked.
    Off,
}

/// A connector trusting the system roots plus an optional PEM bundle.
#[derive(Clone)]
pub struct Connector(tokio_rustls::TlsConnector);

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Connector").finish_non_exhaustive()
    }
}

/// Build a rustls connector configured with system root certificates and
/// the certificates in `ca_file`, if given.
///
/// With [`Verification::Off`] no trust store is loaded at all.
pub fn connector(
    ca_file: Option<&Path>,
    verification: Verification,
) -> Result<Connector, TlsConnectError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(TlsConnectError::Config)?;
    let config = match verification {
        Verification::Full => builder
            .with_root_certificates(root_store(ca_file)?)
            .with_no_client_auth(),
        Verification::AnyName => {
            let roots = Arc::new(root_store(ca_file)?);
            let inner = rustls::client::WebPkiServerVerifier::builder_with_provider(roots, provider)
                .build()
                .map_err(TlsConnectError::Verifier)?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verify::IgnoreName(inner)))
                .with_no_client_auth()
        }
        Verification::Off => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verify::AcceptAny::new()))
            .with_no_client_auth(),
    };
    Ok(Connector(tokio_rustls::TlsConnector::from(Arc::new(config))))
}

/// System roots plus the certificates in `ca_file`.
fn root_store(ca_file: Option<&Path>) -> Result<rustls::RootCertStore, TlsConnectError> {
    let extra = ca_file.map(load_pem).transpose()?;

    let mut root_store = rustls::RootCertStore::empty();
    let rustls_native_certs::CertificateResult { certs, errors, .. } =
        rustls_native_certs::load_native_certs();
    if let Some(err) = errors.into_iter().next() {
        return Err(TlsConnectError::RootCerts(err));
    }
    let _ = root_store.add_parsable_certificates(certs);
    if let Some(extra) = extra {
        let _ = root_store.add_parsable_certificates(extra);
    }
    Ok(root_store)
}

/// Read every certificate from a PEM file; at least one is required.
fn load_pem(
    path: &Path,
) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, TlsConnectError> {
    let ca_file_error = |source| TlsConnectError::CaFile {
        path: path.to_owned(),
        source,
    };
    let file = std::fs::File::open(path).map_err(ca_file_error)?;
    let mut reader = std::io::BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ca_file_error)?;
    if certs.is_empty() {
        return Err(TlsConnectError::EmptyCaFile(path.to_owned()));
    }
    Ok(certs)
}

/// Establish a TLS connection over an existing TCP stream.
pub async fn connect(
    connector: &Connector,
    server: &str,
    stream: tokio::net::TcpStream,
) -> Result<TlsStream, TlsConnectError> {
    let server_name = rustls::pki_types::ServerName::try_from(server.to_string())
        .map_err(|_| TlsConnectError::InvalidDnsName(server.to_string()))?;
    let tls_stream = connector.0.connect(server_name, stream).await?;
    Ok(tls_stream)
}

impl imap_tls::TlsConnector for Connector {
    type Stream = TlsStream;
    type Error = TlsConnectError;

    fn connect<'a>(
        &'a self,
        tls_server_name: &'a str,
        tcp_stream: tokio::net::TcpStream,
    ) -> impl std::future::Future<Output = Result<Self::Stream, Self::Error>> + Send + 'a {
        connect(self, tls_server_name, tcp_stream)
    }
}

#[cfg(test)]
mod tests;
