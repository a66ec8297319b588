//! Docker-backed IMAP integration tests.

use std::error::Error;

use mail_message::Message;
use mail_policy::Outcome;
use mail_query::Query;

const IMAP_USER: &str = "test";
const IMAP_PASSWORD: &str = "secret";

type BoxError = Box<dyn Error + Send + Sync>;

type TestResult = Result<(), BoxError>;

/// Brings up a config pointing at the container.
fn mailbox(host: &str, port: u16) -> Result<config_bringup::Mailbox, BoxError> {
    let yaml = format!(
        r#"
servers:
  greenmail:
    host: "{host}"
    port: {port}
    tls:
      mode: disabled
    authentication:
      method: login
      username: {IMAP_USER}
      password: {IMAP_PASSWORD}
    mailboxes:
      INBOX: challenge
policies:
  challenge:
    my_addresses: [me@example.com]
    challenge:
      from: Me <me@example.com>
      transport: log
transports:
  log: {{}}
"#
    );
    let config = config_yaml::parse_yaml_str(&yaml)?;
    let mut mailboxes = config_bringup::mailboxes(&config, &[])?;
    Ok(mailboxes.remove(0))
}

async fn start() -> Result<(imap_integration::GreenMail, config_bringup::Mailbox), BoxError> {
    let greenmail = imap_integration::GreenMail::start(IMAP_USER, IMAP_PASSWORD).await?;
    let (host, port) = greenmail.imap_endpoint().await?;
    let mailbox = mailbox(&host, port)?;
    Ok((greenmail, mailbox))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn appended_mail_is_found_unseen() -> TestResult {
    imap_integration::require_integration_tests_enabled()?;
    let (_greenmail, mailbox) = start().await?;

    let mut conn = imap_integration::connect_with_retry(&mailbox.server).await?;
    let before = conn.search("INBOX", &Query::Unseen).await?;

    conn.append(
        "INBOX",
        &[],
        b"From: someone@example.org\r\nSubject: Integration Test\r\n\r\nHello from tests.\r\n",
    )
    .await?;
    conn.noop().await?;

    let after = conn.search("INBOX", &Query::Unseen).await?;
    assert_eq!(after.len(), before.len() + 1);

    conn.logout().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_sender_is_challenged_then_released() -> TestResult {
    imap_integration::require_integration_tests_enabled()?;
    let (_greenmail, mailbox) = start().await?;
    let policy = &mailbox.policy;

    let mut conn = imap_integration::connect_with_retry(&mailbox.server).await?;

    conn.append(
        "INBOX",
        &[],
        b"Return-Path: <new@example.com>\r\n\
          From: Stranger <new@example.com>\r\n\
          To: me@example.com\r\n\
          Subject: offer\r\n\
          Message-ID: <offer@example.com>\r\n\
          \r\n\
          Buy now\r\n",
    )
    .await?;
    let uids = conn.search("INBOX", &Query::All).await?;
    let uid = *uids.last().ok_or("appended message not found")?;

    let outcome = policy.classify(&mut conn, &mut Message::new("INBOX", uid)).await?;
    assert_eq!(outcome, Outcome::Challenge);

    let copies = conn.search("Sent", &Query::Seen).await?;
    assert_eq!(copies.len(), 1);
    assert_eq!(conn.search("Spam", &Query::All).await?.len(), 1);
    assert!(conn.search("INBOX", &Query::All).await?.is_empty());

    let mut copy = Message::new("Sent", copies[0]);
    let challenge_id = copy
        .headers(&mut conn)
        .await?
        .message_id()
        .ok_or("challenge copy without Message-ID")?;

    let reply = format!(
        "Return-Path: <new@example.com>\r\n\
         From: new@example.com\r\n\
         To: me@example.com\r\n\
         Subject: Re: Re: offer\r\n\
         In-Reply-To: <{challenge_id}>\r\n\
         \r\n\
         I am a person.\r\n"
    );
    conn.append("INBOX", &[], reply.as_bytes()).await?;
    let uids = conn.search("INBOX", &Query::All).await?;
    let reply_uid = *uids.last().ok_or("reply not found")?;

    let outcome = policy
        .classify(&mut conn, &mut Message::new("INBOX", reply_uid))
        .await?;
    assert_eq!(outcome, Outcome::ChallengeResponse);

    assert!(conn.search("Spam", &Query::All).await?.is_empty());
    assert_eq!(conn.search("INBOX", &Query::All).await?.len(), 2);

    conn.logout().await?;
    Ok(())
}
