//! The IMAP client interface the watch and policy layers are written against.

use std::future::Future;
use std::time::Duration;

mod types;

pub use types::*;

/// The `\Seen` system flag.
pub const SEEN: &str = "\\Seen";

/// An error produced by a [`Client`].
pub trait ClientError: std::error::Error + Send + Sync + 'static {
    /// Whether the underlying connection is gone.
    ///
    /// A lost connection cannot be used for further commands and the session
    /// has to be re-established.
    fn is_connection_lost(&self) -> bool;
}

/// An authenticated IMAP connection.
///
/// Every operation acts on the connection as-is: UID operations apply to the
/// currently selected mailbox.
pub trait Client: Send {
    /// The error type.
    type Error: ClientError;

    /// Query the server capabilities.
    fn capabilities(&mut self) -> impl Future<Output = Result<Capabilities, Self::Error>> + Send;

    /// Select (or examine, for read-only access) a mailbox.
    fn select(
        &mut self,
        mailbox: &str,
        access: Access,
    ) -> impl Future<Output = Result<MailboxStatus, Self::Error>> + Send;

    /// Search the selected mailbox; UIDs come back in ascending order.
    fn uid_search(
        &mut self,
        query: &mail_query::Query,
    ) -> impl Future<Output = Result<Vec<Uid>, Self::Error>> + Send;

    /// Fetch the envelope of a message; `None` if there is no such message.
    fn uid_fetch_envelope(
        &mut self,
        uid: Uid,
    ) -> impl Future<Output = Result<Option<Envelope>, Self::Error>> + Send;

    /// Fetch the raw header block of a message without setting `\Seen`.
    fn uid_fetch_header(
        &mut self,
        uid: Uid,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Fetch the full raw message without setting `\Seen`.
    fn uid_fetch_body(
        &mut self,
        uid: Uid,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Move a message into another mailbox (requires `MOVE`).
    fn uid_move(
        &mut self,
        uid: Uid,
        mailbox: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Copy a message into another mailbox.
    fn uid_copy(
        &mut self,
        uid: Uid,
        mailbox: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Add a flag (`\Deleted`, `\Seen`, ...) to a message.
    fn uid_add_flag(
        &mut self,
        uid: Uid,
        flag: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Expunge deleted messages from the selected mailbox.
    fn expunge(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Append a message to a mailbox.
    fn append(
        &mut self,
        mailbox: &str,
        flags: &[&str],
        content: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Create a mailbox.
    fn create(&mut self, mailbox: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// List mailbox names matching a pattern (`*` and `%` wildcards).
    fn list(
        &mut self,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Send a NOOP; returns whether the server reported new messages.
    fn noop(&mut self) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Wait in IDLE until new mail, the timeout, or cancellation.
    fn idle(
        &mut self,
        timeout: Duration,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> impl Future<Output = Result<IdleOutcome, Self::Error>> + Send;

    /// Log out and close the connection.
    fn logout(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
