//! Value types exchanged over the client interface.

/// A message UID.
pub type Uid = u32;

/// Mailbox access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `EXAMINE`.
    ReadOnly,

    /// `SELECT`.
    ReadWrite,
}

/// What selecting a mailbox reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,

    /// The UID the next arriving message will get, if the server said.
    pub uid_next: Option<Uid>,
}

/// How an IDLE wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The server announced new messages.
    NewMail,

    /// The wait reached its maximum duration.
    Timeout,

    /// The wait was cancelled.
    Cancelled,
}

/// Server capabilities, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(std::collections::BTreeSet<String>);

impl Capabilities {
    /// Whether the capability is advertised.
    pub fn has(&self, capability: &str) -> bool {
        self.0.contains(&capability.to_ascii_uppercase())
    }

    /// Iterate the advertised capabilities (upper-cased).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S> FromIterator<S> for Capabilities
where
    S: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|capability| capability.as_ref().to_ascii_uppercase())
                .collect(),
        )
    }
}

/// An address from a message envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,

    /// Local part.
    pub mailbox: Option<String>,

    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// The `mailbox@host` form, if both parts are present.
    pub fn addr_spec(&self) -> Option<String> {
        match (self.mailbox.as_deref(), self.host.as_deref()) {
            (Some(mailbox), Some(host)) if !mailbox.is_empty() && !host.is_empty() => {
                Some(format!("{mailbox}@{host}"))
            }
            _ => None,
        }
    }
}

/// The IMAP `ENVELOPE` of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// `Date`.
    pub date: Option<String>,

    /// `Subject`.
    pub subject: Option<String>,

    /// `From`.
    pub from: Vec<Address>,

    /// `Sender`.
    pub sender: Vec<Address>,

    /// `Reply-To`.
    pub reply_to: Vec<Address>,

    /// `To`.
    pub to: Vec<Address>,

    /// `Cc`.
    pub cc: Vec<Address>,

    /// `Bcc`.
    pub bcc: Vec<Address>,

    /// `In-Reply-To`.
    pub in_reply_to: Option<String>,

    /// `Message-ID`.
    pub message_id: Option<String>,
}
