//! Challenge-response classification of incoming mail.
//!
//! Every message is looked up against prior correspondence in the sent, spam
//! and ham folders; senders nobody has heard of get a challenge and land in
//! spam until they answer it.

use std::collections::BTreeSet;

use imap_client_core::Client;
use mail_message::{Connection, Message};
use mail_query::{Field, Query};

mod challenge;

pub use challenge::{AutoSubmitted, SkipReason, reply_subject};

/// Challenge settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeConfig {
    /// The sender of challenges.
    pub from: lettre::message::Mailbox,

    /// The challenge text.
    pub body: String,
}

/// Policy settings.
///
/// The first entry of each folder list is its primary folder; entries may be
/// LIST patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Folders holding mail we sent.
    pub sent: Vec<String>,

    /// Folders holding unwanted mail.
    pub spam: Vec<String>,

    /// Folders holding wanted mail.
    pub ham: Vec<String>,

    /// How long a challenge suppresses another one to the same address.
    pub ttl_days: u64,

    /// Our own addresses; only mail to one of them is challenged.
    pub my_addresses: BTreeSet<String>,

    /// Challenge settings; `None` disables challenges.
    pub challenge: Option<ChallengeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sent: vec!["Sent".to_owned()],
            spam: vec!["Spam".to_owned()],
            ham: vec!["INBOX".to_owned()],
            ttl_days: 7,
            my_addresses: BTreeSet::new(),
            challenge: None,
        }
    }
}

/// What a message turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Wanted mail; left in place.
    Ham,

    /// Unwanted mail; filed into the primary spam folder.
    Spam,

    /// Unknown sender; challenged and filed into the primary spam folder.
    Challenge,

    /// An answer to one of our challenges; the sender's mail was released.
    ChallengeResponse,
}

/// Errors returned by [`Policy::classify`].
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// A mailbox operation failed.
    #[error("mailbox: {0}")]
    Mailbox(#[from] mail_message::Error<E>),

    /// The challenge could not be composed.
    #[error("compose challenge: {0}")]
    Compose(#[source] lettre::error::Error),
}

impl<E> Error<E>
where
    E: imap_client_core::ClientError,
{
    /// Whether this error means the connection must be re-established.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::Mailbox(error) => error.is_connection_lost(),
            Self::Compose(_) => false,
        }
    }
}

/// Returns the current day.
type Today = Box<dyn Fn() -> chrono::NaiveDate + Send + Sync>;

/// The classification policy.
pub struct Policy<T> {
    /// Settings.
    config: Config,

    /// Where challenges go; `None` disables challenges.
    transport: Option<T>,

    /// Clock for the challenge TTL.
    today: Today,
}

impl<T> std::fmt::Debug for Policy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policy")
            .field("config", &self.config)
            .field("challenges", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// Folder lists expanded for one message.
struct Folders {
    /// Sent folders.
    sent: Vec<String>,

    /// Spam folders.
    spam: Vec<String>,

    /// Ham folders.
    ham: Vec<String>,
}

impl<T> Policy<T>
where
    T: mail_transport::Transport,
{
    /// A policy using the local clock.
    pub fn new(config: Config, transport: Option<T>) -> Self {
        Self {
            config,
            transport,
            today: Box::new(|| chrono::Local::now().date_naive()),
        }
    }

    /// Replace the clock.
    pub fn with_today<F>(mut self, today: F) -> Self
    where
        F: Fn() -> chrono::NaiveDate + Send + Sync + 'static,
    {
        self.today = Box::new(today);
        self
    }

    /// The settings.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Classify a message and act on the result.
    pub async fn classify<C>(
        &self,
        conn: &mut Connection<C>,
        message: &mut Message,
    ) -> Result<Outcome, Error<C::Error>>
    where
        C: Client,
    {
        let folders = Folders {
            sent: conn.glob_folders(&self.config.sent).await?,
            spam: conn.glob_folders(&self.config.spam).await?,
            ham: conn.glob_folders(&self.config.ham).await?,
        };

        let outcome = self.decide(conn, message, &folders).await?;

        tracing::info!(
            imap_mailbox = %message.mailbox(),
            uid = message.uid(),
            ?outcome,
            "message classified"
        );
        Ok(outcome)
    }

    /// Run the decision steps in order; the first one that applies wins.
    async fn decide<C>(
        &self,
        conn: &mut Connection<C>,
        message: &mut Message,
        folders: &Folders,
    ) -> Result<Outcome, Error<C::Error>>
    where
        C: Client,
    {
        let headers = message.headers(conn).await?.clone();

        let mut ids = headers.in_reply_to();
        ids.extend(headers.references());
        if !ids.is_empty() {
            let answers_challenge = Query::any(
                ids.iter()
                    .map(|id| Query::header(Field::MESSAGE_ID, id.as_str())),
            )
            .and(challenge::marker());
            if conn
                .search_any(&answers_challenge, &folders.sent)
                .await?
                .is_some()
            {
                self.release(conn, headers.return_path().as_deref(), folders)
                    .await?;
                return Ok(Outcome::ChallengeResponse);
            }
        }

        let originators = message.originators(conn).await?;
        if !originators.is_empty() {
            let addresses = || originators.iter().map(String::as_str);

            // Our own challenges are not correspondence.
            let wrote_to_them =
                mail_query::recipient_query(addresses()).and(!challenge::marker());
            if conn.search_any(&wrote_to_them, &folders.sent).await?.is_some() {
                return Ok(Outcome::Ham);
            }

            let from_them = mail_query::originator_query(addresses());
            if conn.search_any(&from_them, &folders.spam).await?.is_some() {
                self.file_spam(conn, message).await?;
                return Ok(Outcome::Spam);
            }

            let read_from_them = from_them.and(Query::Seen);
            if conn.search_any(&read_from_them, &folders.ham).await?.is_some() {
                return Ok(Outcome::Ham);
            }
        }

        let outcome = match self.challenge(conn, message, &headers, folders).await? {
            Ok(()) => Outcome::Challenge,
            Err(reason) => {
                tracing::debug!(
                    imap_mailbox = %message.mailbox(),
                    uid = message.uid(),
                    ?reason,
                    "not challenging"
                );
                Outcome::Spam
            }
        };
        self.file_spam(conn, message).await?;
        Ok(outcome)
    }

    /// Move everything from `return_path` out of the spam folders, marked read.
    async fn release<C>(
        &self,
        conn: &mut Connection<C>,
        return_path: Option<&str>,
        folders: &Folders,
    ) -> Result<(), Error<C::Error>>
    where
        C: Client,
    {
        let Some(return_path) = return_path else {
            tracing::debug!("challenge response without Return-Path, nothing to release");
            return Ok(());
        };
        let Some(ham) = self.config.ham.first() else {
            tracing::warn!("no ham folder configured, nothing released");
            return Ok(());
        };

        // Released mail is marked read so the sender counts as a known
        // correspondent from now on, the released message included.
        let query = Query::header(Field::RETURN_PATH, return_path);
        for (folder, uid) in conn.search_folders(&query, &folders.spam).await? {
            tracing::info!(imap_mailbox = %folder, uid, %return_path, "releasing message");
            conn.add_flag(&folder, uid, "\\Seen").await?;
            Message::new(folder, uid).file_into(conn, ham).await?;
        }
        Ok(())
    }

    /// File a message into the primary spam folder.
    async fn file_spam<C>(
        &self,
        conn: &mut Connection<C>,
        message: &Message,
    ) -> Result<(), Error<C::Error>>
    where
        C: Client,
    {
        match self.config.spam.first() {
            Some(spam) => message.file_into(conn, spam).await?,
            None => tracing::warn!(
                imap_mailbox = %message.mailbox(),
                uid = message.uid(),
                "no spam folder configured, leaving message in place"
            ),
        }
        Ok(())
    }
}
