//! A single mailbox watch over one IMAP connection.

use std::future::Future;
use std::time::Duration;

use imap_client_core::Client;
use mail_message::{Connection, Message};

mod cursor;
mod session;
mod wait;

pub use cursor::Cursor;
pub use session::run;
pub use wait::{FALLBACK_POLL_INTERVAL, WaitPolicy};

/// Which messages already in the mailbox are handled when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialScan {
    /// Messages without `\Seen`.
    #[default]
    Unseen,

    /// Every message.
    All,

    /// None; only mail arriving afterwards is handled.
    None,
}

impl InitialScan {
    /// The search that selects the messages to handle.
    pub fn query(self) -> mail_query::Query {
        match self {
            Self::Unseen => mail_query::Query::Unseen,
            Self::All => mail_query::Query::All,
            Self::None => mail_query::Query::Nothing,
        }
    }
}

/// Watch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    /// The watched mailbox.
    pub mailbox: String,

    /// Poll interval; zero prefers IDLE.
    pub poll_interval: Duration,

    /// Maximum duration of a single IDLE.
    pub idle_timeout: Duration,

    /// What to do with the messages present at session start.
    pub initial_scan: InitialScan,
}

/// Opens authenticated connections.
pub trait Connector: Send + Sync {
    /// The client type produced.
    type Client: Client;

    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connect and authenticate.
    fn connect(&self) -> impl Future<Output = Result<Self::Client, Self::Error>> + Send;
}

/// Receives every newly seen message.
pub trait Handler<C>: Send
where
    C: Client,
{
    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle a message.
    ///
    /// The handler may select other mailboxes; the session re-selects the
    /// watched one afterwards.
    fn handle(
        &mut self,
        conn: &mut Connection<C>,
        message: &mut Message,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Errors that end a watch session.
#[derive(Debug, thiserror::Error)]
pub enum RunError<ConnectError, ClientError, HandlerError> {
    /// Connecting or authenticating failed.
    #[error("connect: {0}")]
    Connect(#[source] ConnectError),

    /// An IMAP command failed.
    #[error("IMAP: {0}")]
    Imap(#[source] mail_message::Error<ClientError>),

    /// A handler failed and left the connection unusable.
    #[error("handler: {0}")]
    Handler(#[source] HandlerError),
}

#[cfg(test)]
mod tests;
