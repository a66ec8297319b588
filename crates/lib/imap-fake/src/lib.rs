//! In-memory IMAP server model for tests.
//!
//! The [`Server`] holds mailboxes and a script of [`Event`]s; every
//! [`Client`] connected to it implements [`imap_client_core::Client`] and
//! shares the same state, so tests can inspect what a session did.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use imap_client_core::Uid;

mod client;
mod store;

pub use client::{Client, Error};
pub use store::{Event, StoredMessage};

/// The day every fake server starts at.
pub fn epoch() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// A shared handle to the server state.
#[derive(Debug, Clone)]
pub struct Server {
    /// The state.
    state: Arc<Mutex<store::State>>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// A server with an empty `INBOX`, advertising `IDLE` and `MOVE`.
    pub fn new() -> Self {
        let mut mailboxes = std::collections::BTreeMap::new();
        mailboxes.insert("INBOX".to_owned(), store::Mailbox::default());

        Self {
            state: Arc::new(Mutex::new(store::State {
                mailboxes,
                capabilities: vec!["IMAP4rev1".to_owned(), "IDLE".to_owned(), "MOVE".to_owned()],
                today: epoch(),
                events: Default::default(),
                commands: Vec::new(),
                failures: Vec::new(),
                refuse_connects: 0,
                connects: 0,
            })),
        }
    }

    /// Replace the advertised capabilities.
    pub fn with_capabilities(self, capabilities: &[&str]) -> Self {
        self.lock().capabilities = capabilities.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    /// Lock the state.
    pub(crate) fn lock(&self) -> MutexGuard<'_, store::State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Open a connection.
    pub fn connect(&self) -> Result<Client, Error> {
        let mut state = self.lock();
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(Error::Refused);
        }
        state.connects += 1;
        drop(state);

        Ok(Client::new(self.clone()))
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_connects(&self, count: usize) {
        self.lock().refuse_connects = count;
    }

    /// Number of successful connections so far.
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Create a mailbox if it does not exist.
    pub fn create_mailbox(&self, name: &str) {
        self.lock().mailboxes.entry(name.to_owned()).or_default();
    }

    /// Whether a mailbox exists.
    pub fn has_mailbox(&self, name: &str) -> bool {
        self.lock().mailboxes.contains_key(name)
    }

    /// Names of all mailboxes.
    pub fn mailbox_names(&self) -> Vec<String> {
        self.lock().mailboxes.keys().cloned().collect()
    }

    /// Deliver a message (creating the mailbox if needed).
    pub fn deliver(&self, mailbox: &str, raw: impl Into<Vec<u8>>) -> Uid {
        self.lock().deliver(mailbox, raw.into(), BTreeSet::new())
    }

    /// Deliver a message with flags set.
    pub fn deliver_with_flags(&self, mailbox: &str, raw: impl Into<Vec<u8>>, flags: &[&str]) -> Uid {
        let flags = flags.iter().map(|flag| (*flag).to_owned()).collect();
        self.lock().deliver(mailbox, raw.into(), flags)
    }

    /// Messages currently in a mailbox.
    pub fn messages(&self, mailbox: &str) -> Vec<StoredMessage> {
        self.lock()
            .mailboxes
            .get(mailbox)
            .map(|mailbox| mailbox.messages.clone())
            .unwrap_or_default()
    }

    /// UIDs currently in a mailbox.
    pub fn uids(&self, mailbox: &str) -> Vec<Uid> {
        self.messages(mailbox)
            .into_iter()
            .map(|message| message.uid)
            .collect()
    }

    /// The server's current day.
    pub fn today(&self) -> chrono::NaiveDate {
        self.lock().today
    }

    /// Move the server's clock to another day.
    pub fn set_today(&self, today: chrono::NaiveDate) {
        self.lock().today = today;
    }

    /// Move the server's clock forward.
    pub fn advance_days(&self, days: u64) {
        let mut state = self.lock();
        state.today = state.today + chrono::Days::new(days);
    }

    /// Queue a wait event.
    pub fn push_event(&self, event: Event) {
        self.lock().events.push_back(event);
    }

    /// Take the next wait event.
    pub(crate) fn next_event(&self) -> Option<Event> {
        self.lock().events.pop_front()
    }

    /// Make the next command starting with `prefix` fail.
    pub fn fail_next(&self, prefix: &str) {
        self.lock().failures.push(prefix.to_owned());
    }

    /// Every command issued so far.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Forget the command history.
    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }
}
