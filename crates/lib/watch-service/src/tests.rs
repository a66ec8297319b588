use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watch_session::Connector as _;

use super::*;

#[tokio::test(start_paused = true)]
async fn sleep_runs_to_completion() {
    let cancel = CancellationToken::new();
    let flow = sleep_unless_cancelled(&cancel, Duration::from_secs(60)).await;
    assert_eq!(flow, ControlFlow::Continue(()));
}

#[tokio::test(start_paused = true)]
async fn sleep_is_interrupted_by_cancel() {
    let cancel = CancellationToken::new();
    let sleep = sleep_unless_cancelled(&cancel, Duration::from_secs(3600));
    cancel.cancel();
    assert_eq!(sleep.await, ControlFlow::Break(()));
}

#[test]
fn jitter_stays_in_range() {
    assert_eq!(jitter(Duration::ZERO), Duration::ZERO);

    let max = Duration::from_secs(5);
    for _ in 0..100 {
        assert!(jitter(max) <= max);
    }
}

fn unreachable_server(port: u16) -> config_bringup::Server {
    config_bringup::Server {
        server_name: "local".to_owned(),
        host: "127.0.0.1".to_owned(),
        port,
        tls_mode: imap_tls::TlsMode::Disabled,
        tls_server_name: "127.0.0.1".to_owned(),
        ca_file: None,
        verification: imap_session::Verification::Full,
        auth: config_bringup::ServerAuth::Login {
            username: "me".to_owned(),
            password: "secret".to_owned(),
        },
        poll_interval: Duration::ZERO,
        idle_timeout: Duration::from_secs(900),
        backoff: config_bringup::Backoff {
            min: Duration::from_secs(1),
            max: Duration::from_secs(1),
            jitter: Duration::ZERO,
            reset_after: None,
        },
    }
}

async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let connector = ServerConnector::new(Arc::new(unreachable_server(closed_port().await)));
    let error = connector.connect().await.unwrap_err();
    assert!(matches!(error, imap_session::Error::Connect(_)));
}

#[tokio::test]
async fn cancelled_watches_stop_retrying() {
    let server = Arc::new(unreachable_server(closed_port().await));
    let policy = Arc::new(mail_policy::Policy::new(
        mail_policy::Config::default(),
        None,
    ));
    let mailboxes = [config_bringup::Mailbox {
        server,
        mailbox: "INBOX".to_owned(),
        initial_scan: watch_session::InitialScan::Unseen,
        policy_name: "default".to_owned(),
        policy,
    }];

    let cancel = CancellationToken::new();
    let mut join_set = tokio::task::JoinSet::new();
    spawn_watches(&mailboxes, &mut join_set, &cancel);
    assert_eq!(join_set.len(), 1);

    cancel.cancel();
    let joined = tokio::time::timeout(Duration::from_secs(30), join_set.join_next())
        .await
        .unwrap();
    assert!(joined.unwrap().is_ok());
}
