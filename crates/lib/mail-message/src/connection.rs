//! Connection wrapper.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use imap_client_core::{Access, Capabilities, Client, ClientError as _, IdleOutcome, MailboxStatus, Uid};
use mail_query::Query;

use crate::Error;

/// Source of connection epochs; every connection gets a distinct one.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// An authenticated connection plus what we know about its state.
#[derive(Debug)]
pub struct Connection<C> {
    /// The client.
    client: C,

    /// Identifies this connection for message caches.
    epoch: u64,

    /// Capabilities reported after authentication.
    capabilities: Capabilities,

    /// The currently selected mailbox.
    selected: Option<(String, Access)>,

    /// Set once the client reports a lost connection.
    lost: bool,
}

impl<C> Connection<C>
where
    C: Client,
{
    /// Wrap an authenticated client, querying its capabilities.
    pub async fn new(mut client: C) -> Result<Self, Error<C::Error>> {
        let capabilities = client.capabilities().await.map_err(Error::Client)?;
        Ok(Self {
            client,
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            capabilities,
            selected: None,
            lost: false,
        })
    }

    /// The connection epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Server capabilities.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Whether the connection has been lost.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// The selected mailbox name.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_ref().map(|(name, _)| name.as_str())
    }

    /// The selected mailbox and the access it was opened with.
    pub fn selection(&self) -> Option<(&str, Access)> {
        self.selected
            .as_ref()
            .map(|(name, access)| (name.as_str(), *access))
    }

    /// Check the connection is usable.
    fn check(&self) -> Result<(), Error<C::Error>> {
        if self.lost {
            return Err(Error::ConnectionLost);
        }
        Ok(())
    }

    /// Record a client result, noting connection loss.
    fn track<T>(&mut self, result: Result<T, C::Error>) -> Result<T, Error<C::Error>> {
        result.map_err(|error| {
            if error.is_connection_lost() {
                self.lost = true;
            }
            Error::Client(error)
        })
    }

    /// Select a mailbox.
    pub async fn select(
        &mut self,
        mailbox: &str,
        access: Access,
    ) -> Result<MailboxStatus, Error<C::Error>> {
        self.check()?;
        self.selected = None;
        let result = self.client.select(mailbox, access).await;
        let status = self.track(result)?;
        self.selected = Some((mailbox.to_owned(), access));
        Ok(status)
    }

    /// Select a mailbox unless it is already selected with sufficient access.
    pub async fn ensure_selected(
        &mut self,
        mailbox: &str,
        access: Access,
    ) -> Result<(), Error<C::Error>> {
        let satisfied = match &self.selected {
            Some((name, current)) if name == mailbox => {
                access == Access::ReadOnly || *current == Access::ReadWrite
            }
            _ => false,
        };
        if !satisfied {
            self.select(mailbox, access).await?;
        }
        Ok(())
    }

    /// Search a mailbox.
    ///
    /// A [`Query::Nothing`] returns no UIDs without talking to the server.
    pub async fn search(
        &mut self,
        mailbox: &str,
        query: &Query,
    ) -> Result<Vec<Uid>, Error<C::Error>> {
        if query.is_nothing() {
            return Ok(Vec::new());
        }
        self.ensure_selected(mailbox, Access::ReadOnly).await?;
        let result = self.client.uid_search(query).await;
        let mut uids = self.track(result)?;
        uids.sort_unstable();
        Ok(uids)
    }

    /// Search one of several folders; a folder that cannot be selected has
    /// no matches.
    async fn search_folder(
        &mut self,
        folder: &str,
        query: &Query,
    ) -> Result<Vec<Uid>, Error<C::Error>> {
        match self.search(folder, query).await {
            Err(error) if !error.is_connection_lost() && self.selected.is_none() => {
                tracing::debug!(imap_mailbox = %folder, %error, "skipping unavailable folder");
                Ok(Vec::new())
            }
            result => result,
        }
    }

    /// Search each folder in order; yields every `(folder, uid)` match.
    pub async fn search_folders(
        &mut self,
        query: &Query,
        folders: &[String],
    ) -> Result<Vec<(String, Uid)>, Error<C::Error>> {
        let mut found = Vec::new();
        if query.is_nothing() {
            return Ok(found);
        }
        for folder in folders {
            let uids = self.search_folder(folder, query).await?;
            found.extend(uids.into_iter().map(|uid| (folder.clone(), uid)));
        }
        Ok(found)
    }

    /// Search folders in order and stop at the first match.
    pub async fn search_any(
        &mut self,
        query: &Query,
        folders: &[String],
    ) -> Result<Option<(String, Uid)>, Error<C::Error>> {
        if query.is_nothing() {
            return Ok(None);
        }
        for folder in folders {
            if let Some(uid) = self.search_folder(folder, query).await?.into_iter().next() {
                return Ok(Some((folder.clone(), uid)));
            }
        }
        Ok(None)
    }

    /// Expand folder patterns.
    ///
    /// Patterns with `*` or `%` resolve through LIST; other names pass through
    /// as-is. Order is kept and duplicates are dropped.
    pub async fn glob_folders(
        &mut self,
        patterns: &[String],
    ) -> Result<Vec<String>, Error<C::Error>> {
        let mut folders: Vec<String> = Vec::new();
        for pattern in patterns {
            let expanded = if pattern.contains(['*', '%']) {
                self.list(pattern).await?
            } else {
                vec![pattern.clone()]
            };
            for folder in expanded {
                if !folders.contains(&folder) {
                    folders.push(folder);
                }
            }
        }
        Ok(folders)
    }

    /// List mailboxes matching a pattern.
    pub async fn list(&mut self, pattern: &str) -> Result<Vec<String>, Error<C::Error>> {
        self.check()?;
        let result = self.client.list(pattern).await;
        self.track(result)
    }

    /// Whether a mailbox exists.
    pub async fn mailbox_exists(&mut self, mailbox: &str) -> Result<bool, Error<C::Error>> {
        Ok(self
            .list(mailbox)
            .await?
            .iter()
            .any(|name| name == mailbox))
    }

    /// Create a mailbox unless it exists.
    pub async fn ensure_mailbox(&mut self, mailbox: &str) -> Result<(), Error<C::Error>> {
        if self.mailbox_exists(mailbox).await? {
            return Ok(());
        }
        tracing::info!(imap_mailbox = %mailbox, "creating mailbox");
        let result = self.client.create(mailbox).await;
        self.track(result)
    }

    /// Append a message, creating the mailbox first if needed.
    pub async fn append(
        &mut self,
        mailbox: &str,
        flags: &[&str],
        content: &[u8],
    ) -> Result<(), Error<C::Error>> {
        self.ensure_mailbox(mailbox).await?;
        let result = self.client.append(mailbox, flags, content).await;
        self.track(result)
    }

    /// Move a message between mailboxes.
    ///
    /// Falls back to COPY, STORE `\Deleted` and EXPUNGE when the server lacks
    /// `MOVE`. The fallback is not atomic: a failure midway can leave the
    /// message in both mailboxes.
    pub async fn move_message(
        &mut self,
        from: &str,
        uid: Uid,
        to: &str,
    ) -> Result<(), Error<C::Error>> {
        self.ensure_selected(from, Access::ReadWrite).await?;

        if self.capabilities.has("MOVE") {
            let result = self.client.uid_move(uid, to).await;
            return self.track(result);
        }

        tracing::debug!(
            imap_mailbox = %from,
            uid,
            target = %to,
            "server lacks MOVE, using non-atomic copy and delete"
        );
        let result = self.client.uid_copy(uid, to).await;
        self.track(result)?;
        let result = self.client.uid_add_flag(uid, "\\Deleted").await;
        self.track(result)?;
        let result = self.client.expunge().await;
        self.track(result)
    }

    /// Add a flag to a message.
    pub async fn add_flag(
        &mut self,
        mailbox: &str,
        uid: Uid,
        flag: &str,
    ) -> Result<(), Error<C::Error>> {
        self.ensure_selected(mailbox, Access::ReadWrite).await?;
        let result = self.client.uid_add_flag(uid, flag).await;
        self.track(result)
    }

    /// Fetch a message envelope from a mailbox.
    pub async fn fetch_envelope(
        &mut self,
        mailbox: &str,
        uid: Uid,
    ) -> Result<Option<imap_client_core::Envelope>, Error<C::Error>> {
        self.ensure_selected(mailbox, Access::ReadOnly).await?;
        let result = self.client.uid_fetch_envelope(uid).await;
        self.track(result)
    }

    /// Fetch a raw header block from a mailbox.
    pub async fn fetch_header(
        &mut self,
        mailbox: &str,
        uid: Uid,
    ) -> Result<Option<Vec<u8>>, Error<C::Error>> {
        self.ensure_selected(mailbox, Access::ReadOnly).await?;
        let result = self.client.uid_fetch_header(uid).await;
        self.track(result)
    }

    /// Fetch a full raw message from a mailbox.
    pub async fn fetch_body(
        &mut self,
        mailbox: &str,
        uid: Uid,
    ) -> Result<Option<Vec<u8>>, Error<C::Error>> {
        self.ensure_selected(mailbox, Access::ReadOnly).await?;
        let result = self.client.uid_fetch_body(uid).await;
        self.track(result)
    }

    /// Send a NOOP; returns whether new messages were announced.
    pub async fn noop(&mut self) -> Result<bool, Error<C::Error>> {
        self.check()?;
        let result = self.client.noop().await;
        self.track(result)
    }

    /// IDLE on the selected mailbox.
    pub async fn idle(
        &mut self,
        timeout: Duration,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<IdleOutcome, Error<C::Error>> {
        self.check()?;
        let result = self.client.idle(timeout, cancel).await;
        self.track(result)
    }

    /// Log out.
    pub async fn logout(&mut self) -> Result<(), Error<C::Error>> {
        self.check()?;
        let result = self.client.logout().await;
        self.selected = None;
        self.track(result)
    }
}
