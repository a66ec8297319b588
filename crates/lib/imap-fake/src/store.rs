//! Server-side mailbox state.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use imap_client_core::Uid;

/// A message held by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// UID within its mailbox.
    pub uid: Uid,

    /// The full message as delivered.
    pub raw: Vec<u8>,

    /// Length of the header block, including the separating blank line.
    pub header_len: usize,

    /// Parsed header fields.
    pub headers: Vec<(String, String)>,

    /// Flags, e.g. `\Seen`.
    pub flags: BTreeSet<String>,

    /// The day the message was stored.
    pub internal_date: chrono::NaiveDate,
}

impl StoredMessage {
    /// Parse a raw message.
    pub(crate) fn parse(
        uid: Uid,
        raw: Vec<u8>,
        flags: BTreeSet<String>,
        internal_date: chrono::NaiveDate,
    ) -> Self {
        let (headers, header_len) = match mailparse::parse_headers(&raw) {
            Ok((headers, header_len)) => (
                headers
                    .iter()
                    .map(|header| (header.get_key(), header.get_value()))
                    .collect(),
                header_len,
            ),
            Err(_) => (Vec::new(), raw.len()),
        };

        Self {
            uid,
            raw,
            header_len,
            headers,
            flags,
            internal_date,
        }
    }

    /// The first value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the flag is set.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

impl mail_query::Searchable for StoredMessage {
    fn header_fields(&self) -> &[(String, String)] {
        &self.headers
    }

    fn is_seen(&self) -> bool {
        self.has_flag(imap_client_core::SEEN)
    }

    fn internal_date(&self) -> chrono::NaiveDate {
        self.internal_date
    }

    fn uid(&self) -> u32 {
        self.uid
    }
}

/// A mailbox.
#[derive(Debug)]
pub(crate) struct Mailbox {
    /// Next UID to assign.
    pub next_uid: Uid,

    /// Messages in UID order.
    pub messages: Vec<StoredMessage>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self {
            next_uid: 1,
            messages: Vec::new(),
        }
    }
}

impl Mailbox {
    /// Store a message and return its UID.
    pub fn insert(
        &mut self,
        raw: Vec<u8>,
        flags: BTreeSet<String>,
        internal_date: chrono::NaiveDate,
    ) -> Uid {
        let uid = self.next_uid;
        self.next_uid += 1;
        self.messages
            .push(StoredMessage::parse(uid, raw, flags, internal_date));
        uid
    }

    /// Find a message by UID.
    pub fn get(&self, uid: Uid) -> Option<&StoredMessage> {
        self.messages.iter().find(|message| message.uid == uid)
    }

    /// Find a message by UID for modification.
    pub fn get_mut(&mut self, uid: Uid) -> Option<&mut StoredMessage> {
        self.messages.iter_mut().find(|message| message.uid == uid)
    }

    /// The highest UID in use.
    pub fn highest_uid(&self) -> Option<Uid> {
        self.messages.last().map(|message| message.uid)
    }
}

/// Scripted things that happen while a client waits.
#[derive(Debug, Clone)]
pub enum Event {
    /// A message arrives in a mailbox.
    Deliver {
        /// Target mailbox.
        mailbox: String,

        /// Raw message.
        raw: Vec<u8>,
    },

    /// The wait ends without news.
    Timeout,

    /// The connection drops.
    Disconnect,

    /// Cancel the token, then keep waiting until it is observed.
    Cancel(tokio_util::sync::CancellationToken),
}

/// The whole server state.
#[derive(Debug)]
pub(crate) struct State {
    /// Mailboxes by name.
    pub mailboxes: BTreeMap<String, Mailbox>,

    /// Advertised capabilities.
    pub capabilities: Vec<String>,

    /// The server's notion of the current day.
    pub today: chrono::NaiveDate,

    /// Scripted wait events.
    pub events: VecDeque<Event>,

    /// Every command issued by any client, in order.
    pub commands: Vec<String>,

    /// Command prefixes that fail once.
    pub failures: Vec<String>,

    /// Number of upcoming connection attempts to refuse.
    pub refuse_connects: usize,

    /// Number of successful connections.
    pub connects: usize,
}

impl State {
    /// Apply a delivery.
    pub fn deliver(&mut self, mailbox: &str, raw: Vec<u8>, flags: BTreeSet<String>) -> Uid {
        let today = self.today;
        self.mailboxes
            .entry(mailbox.to_owned())
            .or_default()
            .insert(raw, flags, today)
    }

    /// Record a command; returns `true` when an injected failure matches it.
    pub fn record(&mut self, command: String) -> bool {
        tracing::trace!(%command, "fake IMAP command");
        let failure = self
            .failures
            .iter()
            .position(|prefix| command.starts_with(prefix.as_str()));
        self.commands.push(command);
        match failure {
            Some(index) => {
                self.failures.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Match a mailbox name against a LIST pattern.
///
/// `*` matches any run of characters, `%` any run without the `/` delimiter.
pub(crate) fn list_match(pattern: &str, name: &str) -> bool {
    fn go(pattern: &[char], name: &[char]) -> bool {
        match pattern.split_first() {
            None => name.is_empty(),
            Some(('*', rest)) => (0..=name.len()).any(|skip| go(rest, &name[skip..])),
            Some(('%', rest)) => (0..=name.len())
                .take_while(|&skip| skip == 0 || name[skip - 1] != '/')
                .any(|skip| go(rest, &name[skip..])),
            Some((c, rest)) => name.first() == Some(c) && go(rest, &name[1..]),
        }
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    go(&pattern, &name)
}
