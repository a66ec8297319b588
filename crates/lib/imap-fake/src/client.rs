//! The client side of a fake connection.

use std::time::Duration;

use imap_client_core::{Access, Envelope, IdleOutcome, MailboxStatus, Uid};
use mail_query::Query;

use crate::store::{self, Event, State, StoredMessage};

/// Errors returned by the fake client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server refused the connection.
    #[error("connection refused")]
    Refused,

    /// The connection is gone.
    #[error("connection lost")]
    ConnectionLost,

    /// A command needs a selected mailbox.
    #[error("no mailbox selected")]
    NoMailboxSelected,

    /// A modifying command was issued on an examined mailbox.
    #[error("mailbox is selected read-only")]
    ReadOnly,

    /// The mailbox does not exist.
    #[error("no such mailbox: {0}")]
    NoSuchMailbox(String),

    /// The mailbox already exists.
    #[error("mailbox already exists: {0}")]
    MailboxExists(String),

    /// The server does not advertise what the command needs.
    #[error("not supported by the server: {0}")]
    Unsupported(&'static str),

    /// A failure injected by the test.
    #[error("injected failure for {0}")]
    Injected(String),
}

impl imap_client_core::ClientError for Error {
    fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Refused | Self::ConnectionLost)
    }
}

/// Client-side selection state.
#[derive(Debug, Default)]
struct Selection {
    /// The selected mailbox and how it was opened.
    mailbox: Option<(String, Access)>,

    /// The message count last reported to the client.
    exists: usize,
}

impl Selection {
    /// The selected mailbox.
    fn get<'s>(&self, state: &'s mut State) -> Result<&'s mut store::Mailbox, Error> {
        let (name, _) = self.mailbox.as_ref().ok_or(Error::NoMailboxSelected)?;
        state
            .mailboxes
            .get_mut(name)
            .ok_or_else(|| Error::NoSuchMailbox(name.clone()))
    }

    /// The selected mailbox, if it was opened read-write.
    fn get_writable<'s>(&self, state: &'s mut State) -> Result<&'s mut store::Mailbox, Error> {
        match self.mailbox {
            Some((_, Access::ReadWrite)) => self.get(state),
            Some((_, Access::ReadOnly)) => Err(Error::ReadOnly),
            None => Err(Error::NoMailboxSelected),
        }
    }

    /// Whether the selected mailbox grew since last reported; updates the report.
    fn take_new_mail(&mut self, state: &mut State) -> bool {
        let Ok(mailbox) = self.get(state) else {
            return false;
        };
        let exists = mailbox.messages.len();
        let grew = exists > self.exists;
        self.exists = exists;
        grew
    }
}

/// A connection to a [`crate::Server`].
#[derive(Debug)]
pub struct Client {
    /// The server.
    server: crate::Server,

    /// Selection state.
    selection: Selection,

    /// Cleared on disconnect or logout.
    alive: bool,
}

impl Client {
    /// A fresh connection.
    pub(crate) fn new(server: crate::Server) -> Self {
        Self {
            server,
            selection: Selection::default(),
            alive: true,
        }
    }

    /// Run a command against the state.
    fn run<T>(
        &mut self,
        command: String,
        f: impl FnOnce(&mut State, &mut Selection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if !self.alive {
            return Err(Error::ConnectionLost);
        }
        let mut state = self.server.lock();
        if state.record(command.clone()) {
            return Err(Error::Injected(command));
        }
        f(&mut state, &mut self.selection)
    }

    /// Apply a scripted event; returns whether it delivered into the selected mailbox.
    fn apply(&mut self, event: Event) -> Result<bool, Error> {
        match event {
            Event::Deliver { mailbox, raw } => {
                let mut state = self.server.lock();
                state.deliver(&mailbox, raw, Default::default());
                Ok(self.selection.take_new_mail(&mut state))
            }
            Event::Timeout => Ok(false),
            Event::Disconnect => {
                self.alive = false;
                Err(Error::ConnectionLost)
            }
            Event::Cancel(token) => {
                token.cancel();
                Ok(false)
            }
        }
    }
}

impl imap_client_core::Client for Client {
    type Error = Error;

    async fn capabilities(&mut self) -> Result<imap_client_core::Capabilities, Error> {
        self.run("CAPABILITY".to_owned(), |state, _| {
            Ok(state.capabilities.iter().collect())
        })
    }

    async fn select(&mut self, mailbox: &str, access: Access) -> Result<MailboxStatus, Error> {
        let verb = match access {
            Access::ReadOnly => "EXAMINE",
            Access::ReadWrite => "SELECT",
        };
        self.run(format!("{verb} {mailbox}"), |state, selection| {
            let Some(stored) = state.mailboxes.get(mailbox) else {
                selection.mailbox = None;
                return Err(Error::NoSuchMailbox(mailbox.to_owned()));
            };
            selection.mailbox = Some((mailbox.to_owned(), access));
            selection.exists = stored.messages.len();
            Ok(MailboxStatus {
                exists: u32::try_from(stored.messages.len()).unwrap_or(u32::MAX),
                uid_next: Some(stored.next_uid),
            })
        })
    }

    async fn uid_search(&mut self, query: &Query) -> Result<Vec<Uid>, Error> {
        self.run(format!("UID SEARCH {query}"), |state, selection| {
            let mailbox = selection.get(state)?;
            let query = match mailbox.highest_uid() {
                Some(highest) => clamp_uid_ranges(query, highest),
                None => query.clone(),
            };
            Ok(mailbox
                .messages
                .iter()
                .filter(|message| query.matches(*message))
                .map(|message| message.uid)
                .collect())
        })
    }

    async fn uid_fetch_envelope(&mut self, uid: Uid) -> Result<Option<Envelope>, Error> {
        self.run(format!("UID FETCH {uid} ENVELOPE"), |state, selection| {
            Ok(selection.get(state)?.get(uid).map(envelope))
        })
    }

    async fn uid_fetch_header(&mut self, uid: Uid) -> Result<Option<Vec<u8>>, Error> {
        self.run(
            format!("UID FETCH {uid} BODY.PEEK[HEADER]"),
            |state, selection| {
                Ok(selection
                    .get(state)?
                    .get(uid)
                    .map(|message| message.raw[..message.header_len].to_vec()))
            },
        )
    }

    async fn uid_fetch_body(&mut self, uid: Uid) -> Result<Option<Vec<u8>>, Error> {
        self.run(format!("UID FETCH {uid} BODY.PEEK[]"), |state, selection| {
            Ok(selection
                .get(state)?
                .get(uid)
                .map(|message| message.raw.clone()))
        })
    }

    async fn uid_move(&mut self, uid: Uid, mailbox: &str) -> Result<(), Error> {
        self.run(format!("UID MOVE {uid} {mailbox}"), |state, selection| {
            if !state
                .capabilities
                .iter()
                .any(|capability| capability.eq_ignore_ascii_case("MOVE"))
            {
                return Err(Error::Unsupported("MOVE"));
            }
            if !state.mailboxes.contains_key(mailbox) {
                return Err(Error::NoSuchMailbox(mailbox.to_owned()));
            }
            let source = selection.get_writable(state)?;
            let Some(index) = source.messages.iter().position(|message| message.uid == uid)
            else {
                return Ok(());
            };
            let message = source.messages.remove(index);
            selection.exists = source.messages.len();
            insert_copy(state, mailbox, message);
            Ok(())
        })
    }

    async fn uid_copy(&mut self, uid: Uid, mailbox: &str) -> Result<(), Error> {
        self.run(format!("UID COPY {uid} {mailbox}"), |state, selection| {
            if !state.mailboxes.contains_key(mailbox) {
                return Err(Error::NoSuchMailbox(mailbox.to_owned()));
            }
            let Some(message) = selection.get(state)?.get(uid).cloned() else {
                return Ok(());
            };
            insert_copy(state, mailbox, message);
            Ok(())
        })
    }

    async fn uid_add_flag(&mut self, uid: Uid, flag: &str) -> Result<(), Error> {
        self.run(
            format!("UID STORE {uid} +FLAGS ({flag})"),
            |state, selection| {
                if let Some(message) = selection.get_writable(state)?.get_mut(uid) {
                    message.flags.insert(flag.to_owned());
                }
                Ok(())
            },
        )
    }

    async fn expunge(&mut self) -> Result<(), Error> {
        self.run("EXPUNGE".to_owned(), |state, selection| {
            let mailbox = selection.get_writable(state)?;
            mailbox
                .messages
                .retain(|message| !message.has_flag("\\Deleted"));
            selection.exists = mailbox.messages.len();
            Ok(())
        })
    }

    async fn append(&mut self, mailbox: &str, flags: &[&str], content: &[u8]) -> Result<(), Error> {
        self.run(format!("APPEND {mailbox}"), |state, _| {
            let today = state.today;
            let target = state
                .mailboxes
                .get_mut(mailbox)
                .ok_or_else(|| Error::NoSuchMailbox(mailbox.to_owned()))?;
            let flags = flags.iter().map(|flag| (*flag).to_owned()).collect();
            target.insert(content.to_vec(), flags, today);
            Ok(())
        })
    }

    async fn create(&mut self, mailbox: &str) -> Result<(), Error> {
        self.run(format!("CREATE {mailbox}"), |state, _| {
            if state.mailboxes.contains_key(mailbox) {
                return Err(Error::MailboxExists(mailbox.to_owned()));
            }
            state
                .mailboxes
                .insert(mailbox.to_owned(), Default::default());
            Ok(())
        })
    }

    async fn list(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        self.run(format!("LIST \"\" {pattern}"), |state, _| {
            Ok(state
                .mailboxes
                .keys()
                .filter(|name| store::list_match(pattern, name))
                .cloned()
                .collect())
        })
    }

    async fn noop(&mut self) -> Result<bool, Error> {
        self.run("NOOP".to_owned(), |_, _| Ok(()))?;
        let delivered = match self.server.next_event() {
            Some(event) => self.apply(event)?,
            None => false,
        };
        let mut state = self.server.lock();
        Ok(self.selection.take_new_mail(&mut state) || delivered)
    }

    async fn idle(
        &mut self,
        timeout: Duration,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<IdleOutcome, Error> {
        self.run("IDLE".to_owned(), |state, selection| {
            if !state
                .capabilities
                .iter()
                .any(|capability| capability.eq_ignore_ascii_case("IDLE"))
            {
                return Err(Error::Unsupported("IDLE"));
            }
            selection.get(state).map(|_| ())
        })?;

        if let Some(event) = self.server.next_event() {
            let timed_out = matches!(event, Event::Timeout);
            if self.apply(event)? {
                return Ok(IdleOutcome::NewMail);
            }
            if timed_out {
                return Ok(IdleOutcome::Timeout);
            }
        }

        tokio::select! {
            () = cancel.cancelled() => Ok(IdleOutcome::Cancelled),
            () = tokio::time::sleep(timeout) => Ok(IdleOutcome::Timeout),
        }
    }

    async fn logout(&mut self) -> Result<(), Error> {
        self.run("LOGOUT".to_owned(), |_, _| Ok(()))?;
        self.alive = false;
        Ok(())
    }
}

/// Store a copy of a message in another mailbox under a fresh UID.
fn insert_copy(state: &mut State, mailbox: &str, message: StoredMessage) {
    if let Some(target) = state.mailboxes.get_mut(mailbox) {
        target.insert(message.raw, message.flags, message.internal_date);
    }
}

/// `UID n:*` always includes the highest UID, even when `n` is beyond it.
fn clamp_uid_ranges(query: &Query, highest: Uid) -> Query {
    match query {
        Query::UidFrom(uid) => Query::UidFrom((*uid).min(highest)),
        Query::And(operands) => Query::And(
            operands
                .iter()
                .map(|operand| clamp_uid_ranges(operand, highest))
                .collect(),
        ),
        Query::Or(operands) => Query::Or(
            operands
                .iter()
                .map(|operand| clamp_uid_ranges(operand, highest))
                .collect(),
        ),
        Query::Not(operand) => Query::Not(Box::new(clamp_uid_ranges(operand, highest))),
        other => other.clone(),
    }
}

/// Build the envelope a server would report.
fn envelope(message: &StoredMessage) -> Envelope {
    let addresses = |name: &str| {
        message
            .header(name)
            .map(parse_addresses)
            .unwrap_or_default()
    };

    let from = addresses("From");
    let sender = Some(addresses("Sender"))
        .filter(|sender| !sender.is_empty())
        .unwrap_or_else(|| from.clone());
    let reply_to = Some(addresses("Reply-To"))
        .filter(|reply_to| !reply_to.is_empty())
        .unwrap_or_else(|| from.clone());

    Envelope {
        date: message.header("Date").map(str::to_owned),
        subject: message.header("Subject").map(str::to_owned),
        from,
        sender,
        reply_to,
        to: addresses("To"),
        cc: addresses("Cc"),
        bcc: addresses("Bcc"),
        in_reply_to: message.header("In-Reply-To").map(str::to_owned),
        message_id: message.header("Message-ID").map(str::to_owned),
    }
}

/// Split an address-list header into envelope addresses.
fn parse_addresses(value: &str) -> Vec<imap_client_core::Address> {
    let Ok(list) = mailparse::addrparse(value) else {
        return Vec::new();
    };

    let mut singles = Vec::new();
    for entry in list.iter() {
        match entry {
            mailparse::MailAddr::Single(info) => singles.push(info.clone()),
            mailparse::MailAddr::Group(group) => singles.extend(group.addrs.iter().cloned()),
        }
    }

    singles
        .into_iter()
        .map(|info| {
            let (mailbox, host) = match info.addr.rsplit_once('@') {
                Some((mailbox, host)) => (Some(mailbox.to_owned()), Some(host.to_owned())),
                None => (Some(info.addr.clone()), None),
            };
            imap_client_core::Address {
                name: info.display_name,
                mailbox,
                host,
            }
        })
        .collect()
}
