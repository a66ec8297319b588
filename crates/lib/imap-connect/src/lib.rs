//! High-level IMAP connection utilities.

pub use imap_tls::{Client, Stream, TlsMode};
pub use imap_tls_rustls::Verification;

/// IMAP connect params.
#[derive(Debug, Clone, PartialEq)]
pub struct Params<'a> {
    /// Hostname or IP address of the IMAP server.
    pub host: &'a str,

    /// IMAP port.
    pub port: u16,

    /// TLS mode.
    pub tls_mode: TlsMode,

    /// TLS server name (SNI).
    pub tls_server_name: &'a str,

    /// Extra trust anchors (PEM).
    pub ca_file: Option<&'a std::path::Path>,

    /// How the server certificate is checked.
    pub verification: Verification,
}

/// Errors returned while connecting to an IMAP server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// TCP connection error.
    #[error("TCP connection error: {0}")]
    TcpConnect(#[source] std::io::Error),

    /// IMAP TLS connector error.
    #[error("IMAP TLS connector error: {0}")]
    ImapTlsConnector(#[source] imap_tls_rustls::TlsConnectError),

    /// IMAP TLS connection error.
    #[error("IMAP TLS connection error: {0}")]
    ImapTlsConnect(#[source] imap_tls::ConnectError<imap_tls_rustls::TlsConnectError>),
}

impl Error {
    /// Whether the server lacks the requested STARTTLS support.
    pub fn is_tls_unsupported(&self) -> bool {
        matches!(
            self,
            Self::ImapTlsConnect(imap_tls::ConnectError::TlsUnsupported)
        )
    }
}

/// Connect to an IMAP server and produce an IMAP client.
pub async fn connect(params: Params<'_>) -> Result<Client, Error> {
    let Params {
        host,
        port,
        tls_mode,
        tls_server_name,
        ca_file,
        verification,
    } = params;

    tracing::debug!(
        imap_host = %host,
        imap_port = port,
        imap_tls_mode = ?tls_mode,
        tls_server_name = %tls_server_name,
        ?verification,
        "connecting to an IMAP server"
    );

    let tcp_stream = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(Error::TcpConnect)?;
    let tls_connector = match tls_mode {
        // Plain connections never touch the trust store.
        TlsMode::Disabled => None,
        TlsMode::Enabled | TlsMode::StartTls => {
            Some(imap_tls_rustls::connector(ca_file, verification).map_err(Error::ImapTlsConnector)?)
        }
    };
    let client = imap_tls::connect(tcp_stream, tls_server_name, tls_mode, Connector(tls_connector))
        .await
        .map_err(Error::ImapTlsConnect)?;

    Ok(client)
}

/// A connector that is only built when TLS is in use.
struct Connector(Option<imap_tls_rustls::Connector>);

impl imap_tls::TlsConnector for Connector {
    type Stream = imap_tls_rustls::TlsStream;
    type Error = imap_tls_rustls::TlsConnectError;

    async fn connect<'a>(
        &'a self,
        tls_server_name: &'a str,
        tcp_stream: tokio::net::TcpStream,
    ) -> Result<Self::Stream, Self::Error> {
        let Some(connector) = &self.0 else {
            return Err(imap_tls_rustls::TlsConnectError::Io(std::io::Error::other(
                "TLS requested on a plain connection",
            )));
        };
        imap_tls_rustls::connect(connector, tls_server_name, tcp_stream).await
    }
}
