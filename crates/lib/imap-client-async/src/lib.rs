//! [`imap_client_core::Client`] over an `async-imap` session.

use std::time::Duration;

use async_imap::extensions::idle::IdleResponse;
use async_imap::imap_proto::{MailboxDatum, Response};
use async_imap::types::UnsolicitedResponse;
use futures_util::TryStreamExt as _;
use imap_client_core::{Access, Capabilities, Envelope, IdleOutcome, MailboxStatus, Uid};

mod convert;

pub use convert::{decode_mailbox, encode_mailbox};

/// Errors returned by [`Client`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IMAP protocol error.
    #[error("IMAP error: {0}")]
    Imap(#[from] async_imap::error::Error),

    /// The session was dropped by an earlier failure or a logout.
    #[error("IMAP session is gone")]
    SessionGone,
}

impl imap_client_core::ClientError for Error {
    fn is_connection_lost(&self) -> bool {
        match self {
            Self::Imap(async_imap::error::Error::Io(_))
            | Self::Imap(async_imap::error::Error::ConnectionLost)
            | Self::SessionGone => true,
            Self::Imap(_) => false,
        }
    }
}

/// An authenticated `async-imap` session.
#[derive(Debug)]
pub struct Client {
    /// The session; taken while IDLE runs and dropped when it fails.
    session: Option<imap_session::Session>,
}

impl Client {
    /// Wrap an established session.
    pub fn new(session: imap_session::Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// The live session.
    fn session(&mut self) -> Result<&mut imap_session::Session, Error> {
        self.session.as_mut().ok_or(Error::SessionGone)
    }

    /// Drain queued unsolicited responses; returns whether one was `EXISTS`.
    fn drain_unsolicited(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let mut exists = false;
        while let Ok(response) = session.unsolicited_responses.try_recv() {
            match response {
                UnsolicitedResponse::Exists(count) => {
                    tracing::trace!(count, "unsolicited EXISTS");
                    exists = true;
                }
                response => tracing::trace!(?response, "unsolicited response"),
            }
        }
        exists
    }

    /// Fetch one data item of one message.
    async fn fetch_one<T>(
        &mut self,
        uid: Uid,
        query: &'static str,
        extract: impl Fn(&async_imap::types::Fetch) -> Option<T> + Send,
    ) -> Result<Option<T>, Error> {
        let session = self.session()?;
        let fetched: Result<Vec<_>, _> = match session.uid_fetch(uid.to_string(), query).await {
            Ok(stream) => stream.try_collect().await,
            Err(error) => Err(error),
        };
        let fetched = self.checked(fetched)?;
        // Unsolicited FETCH responses for other messages may be interleaved.
        Ok(fetched
            .iter()
            .filter(|fetch| fetch.uid == Some(uid))
            .find_map(extract))
    }

    /// Drop the session when `result` shows the connection is gone.
    fn checked<T>(&mut self, result: Result<T, async_imap::error::Error>) -> Result<T, Error> {
        if let Err(
            async_imap::error::Error::Io(_) | async_imap::error::Error::ConnectionLost,
        ) = &result
        {
            self.session = None;
        }
        Ok(result?)
    }
}

impl imap_client_core::Client for Client {
    type Error = Error;

    async fn capabilities(&mut self) -> Result<Capabilities, Error> {
        let session = self.session()?;
        let capabilities = session.capabilities().await;
        let capabilities = self.checked(capabilities)?;
        Ok(capabilities.iter().map(convert::capability).collect())
    }

    async fn select(&mut self, mailbox: &str, access: Access) -> Result<MailboxStatus, Error> {
        let encoded = encode_mailbox(mailbox);
        let session = self.session()?;
        let selected = match access {
            Access::ReadOnly => session.examine(&encoded).await,
            Access::ReadWrite => session.select(&encoded).await,
        };
        let selected = self.checked(selected)?;
        // Anything queued so far is about the previous mailbox.
        self.drain_unsolicited();
        Ok(MailboxStatus {
            exists: selected.exists,
            uid_next: selected.uid_next,
        })
    }

    async fn uid_search(&mut self, query: &mail_query::Query) -> Result<Vec<Uid>, Error> {
        let criteria = query.render();
        let criteria = if criteria.is_ascii() {
            criteria
        } else {
            format!("CHARSET UTF-8 {criteria}")
        };
        let session = self.session()?;
        let found = session.uid_search(&criteria).await;
        let mut uids: Vec<Uid> = self.checked(found)?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn uid_fetch_envelope(&mut self, uid: Uid) -> Result<Option<Envelope>, Error> {
        self.fetch_one(uid, "ENVELOPE", |fetch| {
            fetch.envelope().map(convert::envelope)
        })
        .await
    }

    async fn uid_fetch_header(&mut self, uid: Uid) -> Result<Option<Vec<u8>>, Error> {
        self.fetch_one(uid, "BODY.PEEK[HEADER]", |fetch| {
            fetch.header().map(<[u8]>::to_vec)
        })
        .await
    }

    async fn uid_fetch_body(&mut self, uid: Uid) -> Result<Option<Vec<u8>>, Error> {
        self.fetch_one(uid, "BODY.PEEK[]", |fetch| fetch.body().map(<[u8]>::to_vec))
            .await
    }

    async fn uid_move(&mut self, uid: Uid, mailbox: &str) -> Result<(), Error> {
        let encoded = encode_mailbox(mailbox);
        let session = self.session()?;
        let moved = session.uid_mv(uid.to_string(), &encoded).await;
        self.checked(moved)
    }

    async fn uid_copy(&mut self, uid: Uid, mailbox: &str) -> Result<(), Error> {
        let encoded = encode_mailbox(mailbox);
        let session = self.session()?;
        let copied = session.uid_copy(uid.to_string(), &encoded).await;
        self.checked(copied)
    }

    async fn uid_add_flag(&mut self, uid: Uid, flag: &str) -> Result<(), Error> {
        let session = self.session()?;
        let stored: Result<Vec<_>, _> = match session
            .uid_store(uid.to_string(), format!("+FLAGS.SILENT ({flag})"))
            .await
        {
            Ok(stream) => stream.try_collect().await,
            Err(error) => Err(error),
        };
        self.checked(stored).map(drop)
    }

    async fn expunge(&mut self) -> Result<(), Error> {
        let session = self.session()?;
        let expunged: Result<Vec<_>, _> = match session.expunge().await {
            Ok(stream) => stream.try_collect().await,
            Err(error) => Err(error),
        };
        let expunged = self.checked(expunged)?;
        tracing::trace!(count = expunged.len(), "expunged");
        Ok(())
    }

    async fn append(&mut self, mailbox: &str, flags: &[&str], content: &[u8]) -> Result<(), Error> {
        let encoded = encode_mailbox(mailbox);
        let flags = (!flags.is_empty()).then(|| format!("({})", flags.join(" ")));
        let session = self.session()?;
        let appended = session
            .append(&encoded, flags.as_deref(), None, content)
            .await;
        self.checked(appended)
    }

    async fn create(&mut self, mailbox: &str) -> Result<(), Error> {
        let encoded = encode_mailbox(mailbox);
        let session = self.session()?;
        let created = session.create(&encoded).await;
        self.checked(created)
    }

    async fn list(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        let encoded = encode_mailbox(pattern);
        let session = self.session()?;
        let listed: Result<Vec<_>, _> = match session.list(Some(""), Some(&encoded)).await {
            Ok(stream) => stream.try_collect().await,
            Err(error) => Err(error),
        };
        Ok(self
            .checked(listed)?
            .iter()
            .map(|name| decode_mailbox(name.name()))
            .collect())
    }

    async fn noop(&mut self) -> Result<bool, Error> {
        let session = self.session()?;
        let nooped = session.noop().await;
        self.checked(nooped)?;
        Ok(self.drain_unsolicited())
    }

    async fn idle(
        &mut self,
        timeout: Duration,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<IdleOutcome, Error> {
        // Whatever arrived before IDLE is new mail already.
        if self.drain_unsolicited() {
            return Ok(IdleOutcome::NewMail);
        }

        // The session lives in the handle until DONE; on failure it is lost.
        let session = self.session.take().ok_or(Error::SessionGone)?;
        let mut handle = session.idle();
        handle.init().await?;

        // Only EXISTS means new mail; other untagged data keeps us idling.
        let deadline = tokio::time::Instant::now() + timeout;
        let outcome = loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let (wait, stop) = handle.wait_with_timeout(remaining);
            let interrupt_on_cancel = async move {
                cancel.cancelled().await;
                drop(stop);
                std::future::pending::<std::convert::Infallible>().await
            };
            let response = tokio::select! {
                response = wait => response?,
                never = interrupt_on_cancel => match never {},
            };

            match response {
                IdleResponse::NewData(data) if announces_new_mail(data.parsed()) => {
                    tracing::debug!(response = ?data.parsed(), "idle notified of new mail");
                    break IdleOutcome::NewMail;
                }
                IdleResponse::NewData(data) => {
                    tracing::trace!(response = ?data.parsed(), "idle data without new mail");
                }
                IdleResponse::Timeout => break IdleOutcome::Timeout,
                IdleResponse::ManualInterrupt => break IdleOutcome::Cancelled,
            }
        };

        self.session = Some(handle.done().await?);
        Ok(outcome)
    }

    async fn logout(&mut self) -> Result<(), Error> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session.logout().await?;
        Ok(())
    }
}

/// Whether an untagged response reports a grown mailbox.
fn announces_new_mail(response: &Response<'_>) -> bool {
    matches!(response, Response::MailboxData(MailboxDatum::Exists(_)))
}
