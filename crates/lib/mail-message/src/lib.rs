//! Messages and mailbox operations over a live IMAP connection.

mod connection;
mod headers;
mod message;

pub use connection::Connection;
pub use headers::Headers;
pub use message::Message;

/// Errors returned by connection and message operations.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The IMAP client failed.
    #[error("IMAP: {0}")]
    Client(#[source] E),

    /// The connection was lost earlier and can no longer be used.
    #[error("connection lost")]
    ConnectionLost,

    /// The message is no longer in its mailbox.
    #[error("message {uid} not found in {mailbox}")]
    MissingMessage {
        /// The mailbox.
        mailbox: String,

        /// The UID.
        uid: imap_client_core::Uid,
    },

    /// The header block could not be parsed.
    #[error("headers: {0}")]
    Headers(#[source] mailparse::MailParseError),
}

impl<E> Error<E>
where
    E: imap_client_core::ClientError,
{
    /// Whether this error means the connection must be re-established.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::Client(error) => error.is_connection_lost(),
            Self::ConnectionLost => true,
            Self::MissingMessage { .. } | Self::Headers(_) => false,
        }
    }
}
