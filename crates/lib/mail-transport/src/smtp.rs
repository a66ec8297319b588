//! SMTP relay transport.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport as _, Tokio1Executor};

/// SMTP connection security.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain text.
    Disabled,

    /// Implicit TLS (usually port 465).
    Enabled,

    /// STARTTLS upgrade (usually port 587).
    StartTls,
}

/// Parameters for [`Smtp::new`].
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    /// Relay host.
    pub host: &'a str,

    /// Port override.
    pub port: Option<u16>,

    /// Connection security.
    pub tls_mode: TlsMode,

    /// Login credentials as `(username, password)`.
    pub credentials: Option<(&'a str, &'a str)>,
}

/// Errors returned while setting up the transport.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The relay could not be configured.
    #[error("relay {host}: {source}")]
    Relay {
        /// Relay host.
        host: String,

        /// The cause.
        #[source]
        source: lettre::transport::smtp::Error,
    },
}

/// An SMTP relay.
#[derive(Debug, Clone)]
pub struct Smtp {
    /// The pooled lettre transport.
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Smtp {
    /// Configure a relay; no connection is made until the first send.
    ///
    /// Must be called, and the result dropped, within a Tokio runtime.
    pub fn new(params: Params<'_>) -> Result<Self, BuildError> {
        let Params {
            host,
            port,
            tls_mode,
            credentials,
        } = params;

        let relay_error = |source| BuildError::Relay {
            host: host.to_owned(),
            source,
        };

        let mut builder = match tls_mode {
            TlsMode::Disabled => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            TlsMode::Enabled => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(relay_error)?
            }
            TlsMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(relay_error)?
            }
        };

        if let Some(port) = port {
            builder = builder.port(port);
        }
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username.to_owned(), password.to_owned()));
        }

        tracing::debug!(smtp_host = %host, smtp_port = ?port, smtp_tls_mode = ?tls_mode, "SMTP transport configured");

        Ok(Self {
            transport: builder.build(),
        })
    }

    /// Send a message.
    pub async fn send(
        &self,
        message: &lettre::Message,
    ) -> Result<(), lettre::transport::smtp::Error> {
        self.transport
            .send_raw(message.envelope(), &message.formatted())
            .await?;
        Ok(())
    }
}

impl crate::Transport for Smtp {
    type Error = lettre::transport::smtp::Error;

    async fn send(&self, message: &lettre::Message) -> Result<(), Self::Error> {
        Smtp::send(self, message).await
    }
}
