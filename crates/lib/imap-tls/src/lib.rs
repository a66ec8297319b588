//! IMAP connection setup over plain TCP, implicit TLS or STARTTLS.

use async_imap::imap_proto::{Capability, Response};
use async_imap::types::UnsolicitedResponse;

/// Errors returned while connecting to the IMAP server.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Network I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS connector error.
    #[error("TLS error: {0}")]
    Tls(#[source] E),

    /// IMAP protocol error.
    #[error("IMAP error: {0}")]
    Imap(#[from] async_imap::error::Error),

    /// The server did not send the expected greeting.
    #[error("IMAP server sent no greeting")]
    MissingGreeting,

    /// STARTTLS was requested but the server does not advertise it.
    #[error("IMAP server does not support STARTTLS")]
    TlsUnsupported,
}

/// How to secure the IMAP connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TlsMode {
    /// No TLS at all.
    Disabled,

    /// Implicit TLS (usually port 993).
    Enabled,

    /// Start with plaintext and upgrade using STARTTLS (usually port 143).
    StartTls,
}

impl TlsMode {
    /// The conventional port for this mode.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Enabled => 993,
            Self::Disabled | Self::StartTls => 143,
        }
    }
}

/// A byte stream an IMAP session can run over.
pub trait SessionStream:
    tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + Sync + std::fmt::Debug
{
}

impl<T> SessionStream for T where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + Sync + std::fmt::Debug
{
}

/// The stream type of every connection, whatever the TLS mode.
pub type Stream = Box<dyn SessionStream>;

/// The client type produced by [`connect`].
pub type Client = async_imap::Client<Stream>;

/// Connector for upgrading a TCP stream to a secured IMAP stream.
pub trait TlsConnector {
    /// Secured stream type.
    type Stream;

    /// Error type returned by the connector.
    type Error;

    /// Connect using the provided server name and TCP stream.
    fn connect<'a>(
        &'a self,
        tls_server_name: &'a str,
        tcp_stream: tokio::net::TcpStream,
    ) -> impl std::future::Future<Output = Result<Self::Stream, Self::Error>> + Send + 'a;
}

impl<S, E, F, Fut> TlsConnector for F
where
    F: Fn(&str, tokio::net::TcpStream) -> Fut,
    Fut: std::future::Future<Output = Result<S, E>> + Send + 'static,
{
    type Stream = S;
    type Error = E;

    fn connect<'a>(
        &'a self,
        tls_server_name: &'a str,
        tcp_stream: tokio::net::TcpStream,
    ) -> impl std::future::Future<Output = Result<Self::Stream, Self::Error>> + Send + 'a {
        (self)(tls_server_name, tcp_stream)
    }
}

/// Connect to the IMAP server using the provided connector.
///
/// The connector is not used when `tls_mode` is [`TlsMode::Disabled`].
pub async fn connect<C>(
    tcp_stream: tokio::net::TcpStream,
    tls_server_name: &str,
    tls_mode: TlsMode,
    connector: C,
) -> Result<Client, ConnectError<C::Error>>
where
    C: TlsConnector,
    C::Stream: SessionStream + 'static,
    C::Error: std::error::Error + Send + Sync + 'static,
{
    let client = match tls_mode {
        TlsMode::Disabled => {
            let mut client = Client::new(Box::new(tcp_stream));
            read_greeting(&mut client).await?;
            client
        }
        TlsMode::Enabled => {
            let stream = connector
                .connect(tls_server_name, tcp_stream)
                .await
                .map_err(ConnectError::Tls)?;
            let mut client = Client::new(Box::new(stream));
            read_greeting(&mut client).await?;
            client
        }
        TlsMode::StartTls => {
            let mut client = async_imap::Client::new(tcp_stream);
            read_greeting(&mut client).await?;
            if !advertises_starttls(&mut client).await? {
                return Err(ConnectError::TlsUnsupported);
            }
            client.run_command_and_check_ok("STARTTLS", None).await?;
            let tcp_stream = client.into_inner();
            let stream = connector
                .connect(tls_server_name, tcp_stream)
                .await
                .map_err(ConnectError::Tls)?;
            tracing::debug!(tls_server_name = %tls_server_name, "upgraded to TLS");
            Client::new(Box::new(stream))
        }
    };

    Ok(client)
}

/// Consume the server greeting.
async fn read_greeting<T, E>(client: &mut async_imap::Client<T>) -> Result<(), ConnectError<E>>
where
    T: SessionStream,
    E: std::error::Error + Send + Sync + 'static,
{
    client
        .read_response()
        .await
        .ok_or(ConnectError::MissingGreeting)??;
    Ok(())
}

/// Issue CAPABILITY and report whether STARTTLS is among the answers.
async fn advertises_starttls<T, E>(
    client: &mut async_imap::Client<T>,
) -> Result<bool, ConnectError<E>>
where
    T: SessionStream,
    E: std::error::Error + Send + Sync + 'static,
{
    // Untagged CAPABILITY data arrives through the unsolicited channel.
    let (tx, rx) = async_channel::unbounded();
    client.run_command_and_check_ok("CAPABILITY", Some(tx)).await?;

    let mut starttls = false;
    while let Ok(response) = rx.try_recv() {
        if let UnsolicitedResponse::Other(data) = response
            && let Response::Capabilities(capabilities) = data.parsed()
        {
            starttls |= capabilities.iter().any(|capability| {
                matches!(capability, Capability::Atom(atom) if atom.eq_ignore_ascii_case("STARTTLS"))
            });
        }
    }
    Ok(starttls)
}
