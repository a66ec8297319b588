//! Challenges to unknown senders.

use imap_client_core::Client;
use lettre::message::Mailbox;
use lettre::message::header::{Header, HeaderName, HeaderValue};
use mail_message::{Connection, Headers, Message};
use mail_query::{Field, Query};
use mail_transport::Transport;

use crate::{ChallengeConfig, Error, Folders, Policy};

/// The `Auto-Submitted` value of our challenges.
const CHALLENGE_AUTO_SUBMITTED: &str = "auto-replied (challenge)";

/// `Precedence` values of bulk mail.
const BULK_PRECEDENCE: [&str; 3] = ["bulk", "junk", "list"];

/// Matches challenges we sent.
pub(crate) fn marker() -> Query {
    Query::header(Field::AUTO_SUBMITTED, "challenge")
}

/// Why an unknown sender was not challenged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No transport or no challenge sender configured.
    Disabled,

    /// The message was generated automatically.
    AutoSubmitted,

    /// The message came through a mailing list.
    MailingList,

    /// The message declares bulk precedence.
    Bulk,

    /// None of the recipients is one of our addresses.
    NotAddressedToUs,

    /// There is nowhere to send the challenge.
    NoReturnPath,

    /// The return path was challenged within the TTL.
    RecentlyChallenged,

    /// The transport failed to deliver the challenge.
    DeliveryFailed,
}

/// The `Auto-Submitted` header (RFC 3834).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSubmitted(String);

impl AutoSubmitted {
    /// A header with the given value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The header value.
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl Header for AutoSubmitted {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Auto-Submitted")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.trim().to_owned()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// The subject of a reply; an existing `Re:` is not repeated.
pub fn reply_subject(subject: Option<&str>) -> String {
    let subject = subject.map(str::trim).unwrap_or_default();
    let is_reply = subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if is_reply {
        subject.to_owned()
    } else {
        format!("Re: {subject}").trim_end().to_owned()
    }
}

/// Build the challenge for a message.
fn compose(
    challenge: &ChallengeConfig,
    to: Mailbox,
    headers: &Headers,
) -> Result<lettre::Message, lettre::error::Error> {
    let message_id = format!(
        "<{}@{}>",
        uuid::Uuid::new_v4(),
        challenge.from.email.domain()
    );

    let mut builder = lettre::Message::builder()
        .from(challenge.from.clone())
        .to(to)
        .subject(reply_subject(headers.subject()))
        .message_id(Some(message_id))
        .header(AutoSubmitted::new(CHALLENGE_AUTO_SUBMITTED));

    let mut references = headers.references();
    if let Some(id) = headers.message_id() {
        builder = builder.in_reply_to(format!("<{id}>"));
        references.push(id);
    }
    if !references.is_empty() {
        let references: Vec<String> = references.iter().map(|id| format!("<{id}>")).collect();
        builder = builder.references(references.join(" "));
    }

    builder.body(challenge.body.clone())
}

impl<T> Policy<T>
where
    T: Transport,
{
    /// Challenge the sender of a message unless there is a reason not to.
    pub(crate) async fn challenge<C>(
        &self,
        conn: &mut Connection<C>,
        message: &mut Message,
        headers: &Headers,
        folders: &Folders,
    ) -> Result<Result<(), SkipReason>, Error<C::Error>>
    where
        C: Client,
    {
        let (Some(challenge), Some(transport)) = (&self.config.challenge, &self.transport) else {
            return Ok(Err(SkipReason::Disabled));
        };

        if headers
            .auto_submitted()
            .is_some_and(|value| !value.eq_ignore_ascii_case("no"))
        {
            return Ok(Err(SkipReason::AutoSubmitted));
        }
        if headers.has_prefix("List-") {
            return Ok(Err(SkipReason::MailingList));
        }
        if headers.precedence().is_some_and(|precedence| {
            BULK_PRECEDENCE
                .iter()
                .any(|bulk| precedence.eq_ignore_ascii_case(bulk))
        }) {
            return Ok(Err(SkipReason::Bulk));
        }

        let recipients = message.recipients(conn).await?;
        let addressed_to_us = recipients.iter().any(|recipient| {
            self.config
                .my_addresses
                .iter()
                .any(|mine| mine.eq_ignore_ascii_case(recipient))
        });
        if !addressed_to_us {
            return Ok(Err(SkipReason::NotAddressedToUs));
        }

        let Some(return_path) = headers.return_path() else {
            return Ok(Err(SkipReason::NoReturnPath));
        };
        let Ok(to) = return_path.parse::<Mailbox>() else {
            return Ok(Err(SkipReason::NoReturnPath));
        };

        let since = (self.today)()
            .checked_sub_days(chrono::Days::new(self.config.ttl_days))
            .unwrap_or(chrono::NaiveDate::MIN);
        let prior = marker()
            .and(Query::header(Field::TO, return_path.as_str()))
            .and(Query::Since(since));
        if conn.search_any(&prior, &folders.sent).await?.is_some() {
            return Ok(Err(SkipReason::RecentlyChallenged));
        }

        let email = compose(challenge, to, headers).map_err(Error::Compose)?;
        if let Err(error) = transport.send(&email).await {
            tracing::warn!(%return_path, %error, "challenge delivery failed");
            return Ok(Err(SkipReason::DeliveryFailed));
        }
        tracing::info!(%return_path, "challenge sent");

        self.keep_copy(conn, &email).await?;
        Ok(Ok(()))
    }

    /// Store a sent challenge in the primary sent folder.
    async fn keep_copy<C>(
        &self,
        conn: &mut Connection<C>,
        email: &lettre::Message,
    ) -> Result<(), Error<C::Error>>
    where
        C: Client,
    {
        let Some(sent) = self.config.sent.first() else {
            tracing::warn!("no sent folder configured, challenge copy not kept");
            return Ok(());
        };

        match conn
            .append(sent, &[imap_client_core::SEEN], &email.formatted())
            .await
        {
            Ok(()) => Ok(()),
            Err(error) if !error.is_connection_lost() => {
                tracing::warn!(imap_mailbox = %sent, %error, "storing challenge copy failed");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}
