use std::collections::BTreeSet;

use imap_client_core::Capabilities;
use imap_fake::{Event, Server};
use mail_message::{Connection, Message};
use tokio_util::sync::CancellationToken;

use super::*;

/// Connects to a fake server.
struct FakeConnector(Server);

impl Connector for FakeConnector {
    type Client = imap_fake::Client;
    type Error = imap_fake::Error;

    async fn connect(&self) -> Result<Self::Client, Self::Error> {
        self.0.connect()
    }
}

/// A handler that records what it was given.
#[derive(Debug, Default)]
struct Recorder {
    /// UIDs in the order they were handled.
    handled: Vec<u32>,

    /// UIDs to fail on.
    fail: BTreeSet<u32>,

    /// Send a NOOP while handling this UID.
    noop_on: Option<u32>,

    /// Search this mailbox while handling, selecting it.
    peek_at: Option<&'static str>,

    /// Append a fresh message to INBOX while handling this UID.
    deliver_on: Option<u32>,

    /// Move every handled message here.
    file_into: Option<&'static str>,
}

impl Handler<imap_fake::Client> for Recorder {
    type Error = mail_message::Error<imap_fake::Error>;

    async fn handle(
        &mut self,
        conn: &mut Connection<imap_fake::Client>,
        message: &mut Message,
    ) -> Result<(), Self::Error> {
        self.handled.push(message.uid());

        if self.noop_on == Some(message.uid()) {
            conn.noop().await?;
        }
        if let Some(mailbox) = self.peek_at {
            conn.search(mailbox, &mail_query::Query::All).await?;
        }
        if self.fail.contains(&message.uid()) {
            return Err(mail_message::Error::MissingMessage {
                mailbox: message.mailbox().to_owned(),
                uid: message.uid(),
            });
        }

        message.envelope(conn).await?;

        if self.deliver_on == Some(message.uid()) {
            conn.append("INBOX", &[], mail(message.uid() + 100).as_bytes())
                .await?;
        }
        if let Some(target) = self.file_into {
            message.file_into(conn, target).await?;
        }
        Ok(())
    }
}

fn params(initial_scan: InitialScan) -> Params {
    Params {
        mailbox: "INBOX".to_owned(),
        poll_interval: Duration::ZERO,
        idle_timeout: Duration::from_secs(900),
        initial_scan,
    }
}

fn mail(n: u32) -> String {
    format!("From: sender{n}@example.com\r\nSubject: message {n}\r\n\r\nbody\r\n")
}

fn deliver(mailbox: &str, n: u32) -> Event {
    Event::Deliver {
        mailbox: mailbox.to_owned(),
        raw: mail(n).into_bytes(),
    }
}

/// A server with two unseen messages around a seen one.
fn seeded_server() -> Server {
    let server = Server::new();
    server.deliver("INBOX", mail(1));
    server.deliver_with_flags("INBOX", mail(2), &["\\Seen"]);
    server.deliver("INBOX", mail(3));
    server
}

#[test]
fn wait_policy_selection() {
    let idle: Capabilities = ["IMAP4rev1", "IDLE"].into_iter().collect();
    let plain: Capabilities = ["IMAP4rev1"].into_iter().collect();
    let idle_timeout = Duration::from_secs(900);
    let poll = Duration::from_secs(30);

    assert_eq!(
        WaitPolicy::negotiate(&idle, Duration::ZERO, idle_timeout),
        WaitPolicy::Idle {
            max_duration: idle_timeout
        }
    );
    assert_eq!(
        WaitPolicy::negotiate(&idle, poll, idle_timeout),
        WaitPolicy::Poll { interval: poll }
    );
    assert_eq!(
        WaitPolicy::negotiate(&plain, Duration::ZERO, idle_timeout),
        WaitPolicy::Poll {
            interval: FALLBACK_POLL_INTERVAL
        }
    );
    assert_eq!(
        WaitPolicy::negotiate(&plain, poll, idle_timeout),
        WaitPolicy::Poll { interval: poll }
    );
}

#[test]
fn cursor_only_moves_forward() {
    let mut cursor = Cursor::new(10);

    assert_eq!(cursor.unhandled(vec![12, 9, 10, 12]), vec![10, 12]);

    cursor.pass(3);
    assert_eq!(cursor.get(), 10);
    cursor.pass(12);
    assert_eq!(cursor.get(), 13);
    assert_eq!(cursor.unhandled(vec![12]), Vec::<u32>::new());
}

#[tokio::test(start_paused = true)]
async fn every_new_uid_is_handled_once_in_order() {
    let server = seeded_server();
    let cancel = CancellationToken::new();
    for event in [
        deliver("INBOX", 4),
        deliver("Other", 1),
        deliver("INBOX", 5),
        Event::Timeout,
        deliver("INBOX", 6),
        Event::Cancel(cancel.clone()),
    ] {
        server.push_event(event);
    }

    let mut recorder = Recorder::default();
    run(
        &FakeConnector(server.clone()),
        &params(InitialScan::Unseen),
        &mut recorder,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(recorder.handled, vec![1, 3, 4, 5, 6]);
    assert!(recorder.handled.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(
        server.commands().last().map(String::as_str),
        Some("LOGOUT")
    );
}

#[tokio::test(start_paused = true)]
async fn initial_scan_modes() {
    for (mode, expected) in [
        (InitialScan::Unseen, vec![1, 3, 4]),
        (InitialScan::All, vec![1, 2, 3, 4]),
        (InitialScan::None, vec![4]),
    ] {
        let server = seeded_server();
        let cancel = CancellationToken::new();
        server.push_event(deliver("INBOX", 4));
        server.push_event(Event::Cancel(cancel.clone()));

        let mut recorder = Recorder::default();
        run(&FakeConnector(server), &params(mode), &mut recorder, &cancel)
            .await
            .unwrap();

        assert_eq!(recorder.handled, expected, "{mode:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn polls_when_the_server_cannot_idle() {
    let server = Server::new().with_capabilities(&["IMAP4rev1", "MOVE"]);
    let cancel = CancellationToken::new();
    server.push_event(deliver("INBOX", 1));
    server.push_event(Event::Cancel(cancel.clone()));

    let mut recorder = Recorder::default();
    run(
        &FakeConnector(server.clone()),
        &params(InitialScan::Unseen),
        &mut recorder,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(recorder.handled, vec![1]);
    let commands = server.commands();
    assert!(commands.iter().any(|c| c == "NOOP"));
    assert!(!commands.iter().any(|c| c == "IDLE"));
}

#[tokio::test(start_paused = true)]
async fn configured_poll_interval_wins_over_idle() {
    let server = Server::new();
    let cancel = CancellationToken::new();
    server.push_event(Event::Cancel(cancel.clone()));

    let params = Params {
        poll_interval: Duration::from_secs(5),
        ..params(InitialScan::Unseen)
    };
    run(
        &FakeConnector(server.clone()),
        &params,
        &mut Recorder::default(),
        &cancel,
    )
    .await
    .unwrap();

    let commands = server.commands();
    assert!(commands.iter().any(|c| c == "NOOP"));
    assert!(!commands.iter().any(|c| c == "IDLE"));
}

#[tokio::test]
async fn lost_connection_ends_the_session() {
    let server = Server::new();
    server.push_event(Event::Disconnect);

    let result = run(
        &FakeConnector(server),
        &params(InitialScan::Unseen),
        &mut Recorder::default(),
        &CancellationToken::new(),
    )
    .await;

    let Err(RunError::Imap(error)) = result else {
        panic!("expected an IMAP error, got {result:?}");
    };
    assert!(error.is_connection_lost());
}

#[tokio::test]
async fn refused_connection() {
    let server = Server::new();
    server.refuse_connects(1);

    let result = run(
        &FakeConnector(server),
        &params(InitialScan::Unseen),
        &mut Recorder::default(),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(RunError::Connect(imap_fake::Error::Refused))
    ));
}

#[tokio::test]
async fn failing_message_is_skipped() {
    let server = Server::new();
    server.deliver("INBOX", mail(1));
    server.deliver("INBOX", mail(2));
    let cancel = CancellationToken::new();
    server.push_event(Event::Cancel(cancel.clone()));

    let mut recorder = Recorder {
        fail: BTreeSet::from([1]),
        ..Recorder::default()
    };
    run(
        &FakeConnector(server),
        &params(InitialScan::Unseen),
        &mut recorder,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(recorder.handled, vec![1, 2]);
}

#[tokio::test]
async fn handler_failure_with_lost_connection_ends_the_session() {
    let server = Server::new();
    server.deliver("INBOX", mail(1));
    server.deliver("INBOX", mail(2));
    server.push_event(Event::Disconnect);

    let mut recorder = Recorder {
        fail: BTreeSet::from([1]),
        noop_on: Some(1),
        ..Recorder::default()
    };
    let result = run(
        &FakeConnector(server),
        &params(InitialScan::Unseen),
        &mut recorder,
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(RunError::Handler(_))));
    assert_eq!(recorder.handled, vec![1]);
}

#[tokio::test]
async fn watched_mailbox_is_reselected_before_waiting() {
    let server = Server::new();
    server.create_mailbox("Sent");
    server.deliver("INBOX", mail(1));
    let cancel = CancellationToken::new();
    server.push_event(Event::Cancel(cancel.clone()));

    let mut recorder = Recorder {
        peek_at: Some("Sent"),
        ..Recorder::default()
    };
    run(
        &FakeConnector(server.clone()),
        &params(InitialScan::Unseen),
        &mut recorder,
        &cancel,
    )
    .await
    .unwrap();

    let commands = server.commands();
    let idle = commands.iter().position(|c| c == "IDLE").unwrap();
    let last_examine = commands[..idle]
        .iter()
        .rev()
        .find(|c| c.starts_with("EXAMINE"))
        .unwrap();
    assert_eq!(last_examine, "EXAMINE INBOX");
}

#[tokio::test]
async fn mail_arriving_during_handling_is_picked_up() {
    let server = Server::new();
    server.create_mailbox("Sent");
    server.deliver("INBOX", mail(1));
    let cancel = CancellationToken::new();
    server.push_event(Event::Cancel(cancel.clone()));

    let mut recorder = Recorder {
        peek_at: Some("Sent"),
        deliver_on: Some(1),
        file_into: Some("Spam"),
        ..Recorder::default()
    };
    run(
        &FakeConnector(server.clone()),
        &params(InitialScan::Unseen),
        &mut recorder,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(recorder.handled, vec![1, 2]);
    assert!(server.uids("INBOX").is_empty());
    assert_eq!(server.uids("Spam").len(), 2);
}

#[tokio::test]
async fn idle_runs_on_a_read_only_selection() {
    let server = Server::new();
    server.deliver("INBOX", mail(1));
    let cancel = CancellationToken::new();
    server.push_event(Event::Cancel(cancel.clone()));

    let mut recorder = Recorder {
        file_into: Some("Spam"),
        ..Recorder::default()
    };
    run(
        &FakeConnector(server.clone()),
        &params(InitialScan::Unseen),
        &mut recorder,
        &cancel,
    )
    .await
    .unwrap();

    let commands = server.commands();
    assert!(commands.iter().any(|c| c == "SELECT INBOX"));
    let idle = commands.iter().position(|c| c == "IDLE").unwrap();
    let last_selection = commands[..idle]
        .iter()
        .rev()
        .find(|c| c.starts_with("SELECT") || c.starts_with("EXAMINE"))
        .unwrap();
    assert_eq!(last_selection, "EXAMINE INBOX");
}
