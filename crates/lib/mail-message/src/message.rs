//! Lazily fetched message view.

use std::collections::BTreeSet;

use imap_client_core::{Address, Client, Envelope, Uid};

use crate::{Connection, Error, Headers};

/// Data fetched for one connection epoch.
#[derive(Debug, Default)]
struct Cache {
    /// The epoch the data belongs to.
    epoch: u64,

    /// The envelope.
    envelope: Option<Envelope>,

    /// The parsed header block.
    headers: Option<Headers>,

    /// The full raw message.
    body: Option<Vec<u8>>,
}

/// A message in a mailbox, identified by mailbox name and UID.
///
/// Envelope, headers and body are fetched on first use and kept until the
/// connection they were fetched over is replaced.
#[derive(Debug)]
pub struct Message {
    /// The mailbox holding the message.
    mailbox: String,

    /// The message UID.
    uid: Uid,

    /// Fetched data.
    cache: Cache,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.mailbox == other.mailbox && self.uid == other.uid
    }
}

impl Eq for Message {}

impl Message {
    /// A message reference.
    pub fn new(mailbox: impl Into<String>, uid: Uid) -> Self {
        Self {
            mailbox: mailbox.into(),
            uid,
            cache: Cache::default(),
        }
    }

    /// The mailbox holding the message.
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// The message UID.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Drop cached data fetched over a different connection.
    fn sync_epoch(&mut self, epoch: u64) {
        if self.cache.epoch != epoch {
            self.cache = Cache {
                epoch,
                ..Cache::default()
            };
        }
    }

    /// The error for a message that has disappeared.
    fn missing<E>(&self) -> Error<E> {
        Error::MissingMessage {
            mailbox: self.mailbox.clone(),
            uid: self.uid,
        }
    }

    /// The envelope.
    pub async fn envelope<C>(
        &mut self,
        conn: &mut Connection<C>,
    ) -> Result<&Envelope, Error<C::Error>>
    where
        C: Client,
    {
        self.sync_epoch(conn.epoch());
        let envelope = match self.cache.envelope.take() {
            Some(envelope) => envelope,
            None => conn
                .fetch_envelope(&self.mailbox, self.uid)
                .await?
                .ok_or_else(|| self.missing())?,
        };
        Ok(self.cache.envelope.insert(envelope))
    }

    /// The parsed header block.
    pub async fn headers<C>(&mut self, conn: &mut Connection<C>) -> Result<&Headers, Error<C::Error>>
    where
        C: Client,
    {
        self.sync_epoch(conn.epoch());
        let headers = match self.cache.headers.take() {
            Some(headers) => headers,
            None => {
                let raw = conn
                    .fetch_header(&self.mailbox, self.uid)
                    .await?
                    .ok_or_else(|| self.missing())?;
                Headers::parse(&raw).map_err(Error::Headers)?
            }
        };
        Ok(self.cache.headers.insert(headers))
    }

    /// The full raw message.
    pub async fn body<C>(&mut self, conn: &mut Connection<C>) -> Result<&[u8], Error<C::Error>>
    where
        C: Client,
    {
        self.sync_epoch(conn.epoch());
        let body = match self.cache.body.take() {
            Some(body) => body,
            None => conn
                .fetch_body(&self.mailbox, self.uid)
                .await?
                .ok_or_else(|| self.missing())?,
        };
        Ok(self.cache.body.insert(body))
    }

    /// Addresses from `From`, `Sender` and `Reply-To`.
    pub async fn originators<C>(
        &mut self,
        conn: &mut Connection<C>,
    ) -> Result<BTreeSet<String>, Error<C::Error>>
    where
        C: Client,
    {
        let envelope = self.envelope(conn).await?;
        Ok(addresses([
            &envelope.from,
            &envelope.sender,
            &envelope.reply_to,
        ]))
    }

    /// Addresses from `To`, `Cc` and `Bcc`.
    pub async fn recipients<C>(
        &mut self,
        conn: &mut Connection<C>,
    ) -> Result<BTreeSet<String>, Error<C::Error>>
    where
        C: Client,
    {
        let envelope = self.envelope(conn).await?;
        Ok(addresses([&envelope.to, &envelope.cc, &envelope.bcc]))
    }

    /// Move the message into another mailbox, creating it if needed.
    pub async fn file_into<C>(
        &self,
        conn: &mut Connection<C>,
        target: &str,
    ) -> Result<(), Error<C::Error>>
    where
        C: Client,
    {
        tracing::info!(
            imap_mailbox = %self.mailbox,
            uid = self.uid,
            target = %target,
            "filing message"
        );
        conn.ensure_mailbox(target).await?;
        conn.move_message(&self.mailbox, self.uid, target).await
    }
}

/// Normalized, deduplicated addresses from envelope address lists.
fn addresses<const N: usize>(lists: [&Vec<Address>; N]) -> BTreeSet<String> {
    lists
        .into_iter()
        .flatten()
        .filter_map(Address::addr_spec)
        .filter_map(|addr| mail_query::normalize_address(&addr))
        .collect()
}
