use std::time::Duration;

use super::*;

fn parse(yaml: &str) -> config_core::Config {
    config_yaml::parse_yaml_str(yaml).unwrap()
}

const MINIMAL: &str = r#"
servers:
  home:
    host: imap.example.com
    authentication:
      method: login
      username: me
      password: secret
    mailboxes:
      INBOX: strict
policies:
  strict: {}
"#;

#[test]
fn defaults_are_filled_in() {
    let config = parse(MINIMAL);
    let mailboxes = mailboxes(&config, &[]).unwrap();
    assert_eq!(mailboxes.len(), 1);

    let mailbox = &mailboxes[0];
    assert_eq!(mailbox.mailbox, "INBOX");
    assert_eq!(mailbox.policy_name, "strict");
    assert_eq!(mailbox.initial_scan, watch_session::InitialScan::Unseen);

    let server = &mailbox.server;
    assert_eq!(server.server_name, "home");
    assert_eq!(server.port, 993);
    assert_eq!(server.tls_mode, imap_tls::TlsMode::Enabled);
    assert_eq!(server.tls_server_name, "imap.example.com");
    assert_eq!(server.verification, imap_session::Verification::Full);
    assert_eq!(server.poll_interval, Duration::ZERO);
    assert_eq!(server.idle_timeout, Duration::from_secs(DEFAULT_IDLE_SECS));
    assert_eq!(
        server.backoff,
        Backoff {
            min: Duration::from_secs(1),
            max: Duration::from_secs(300),
            jitter: DEFAULT_JITTER,
            reset_after: None,
        }
    );

    let policy = mailbox.policy.config();
    assert_eq!(policy, &mail_policy::Config::default());
}

#[test]
fn starttls_defaults_to_port_143() {
    let config = parse(
        r#"
servers:
  home:
    host: imap.example.com
    tls:
      mode: starttls
      server_name: mail.example.com
    authentication:
      method: login
      username: me
      password: secret
"#,
    );
    let (name, server) = select_servers(&config, &[]).unwrap()[0];
    let server = internal::server(name, server).unwrap();
    assert_eq!(server.port, 143);
    assert_eq!(server.tls_mode, imap_tls::TlsMode::StartTls);
    assert_eq!(server.tls_server_name, "mail.example.com");
}

#[test]
fn explicit_port_wins() {
    let config = parse(
        r#"
servers:
  home:
    host: imap.example.com
    port: 1993
    poll: 60
    idle: 120
    backoff_reset_after_secs: 600
    authentication:
      method: plain
      identity: me
      password: secret
"#,
    );
    let server = internal::server("home", &config.servers["home"]).unwrap();
    assert_eq!(server.port, 1993);
    assert_eq!(server.poll_interval, Duration::from_secs(60));
    assert_eq!(server.idle_timeout, Duration::from_secs(120));
    assert_eq!(server.backoff.reset_after, Some(Duration::from_secs(600)));
    assert!(matches!(server.auth, ServerAuth::Plain { .. }));
}

#[test]
fn invalid_backoff_is_rejected() {
    let mut config = parse(MINIMAL);
    let server = config.servers.get_mut("home").unwrap();
    server.min_backoff = Some(10);
    server.max_backoff = Some(5);

    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Server {
            source: ServerError::InvalidBackoff { min: 10, max: 5 },
            ..
        }
    ));

    let server = config.servers.get_mut("home").unwrap();
    server.min_backoff = Some(0);
    server.max_backoff = None;
    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Server {
            source: ServerError::InvalidBackoff { min: 0, .. },
            ..
        }
    ));
}

#[test]
fn certificate_verification_settings() {
    use config_core::VerifyMode;
    use imap_session::Verification;

    for (verify_mode, check_hostname, expected) in [
        (VerifyMode::Required, None, Verification::Full),
        (VerifyMode::Required, Some(true), Verification::Full),
        (VerifyMode::Optional, None, Verification::Full),
        (VerifyMode::Required, Some(false), Verification::AnyName),
        (VerifyMode::Optional, Some(false), Verification::AnyName),
        (VerifyMode::None, None, Verification::Off),
        (VerifyMode::None, Some(false), Verification::Off),
    ] {
        let mut config = parse(MINIMAL);
        let tls = &mut config.servers.get_mut("home").unwrap().tls;
        tls.verify_mode = verify_mode;
        tls.check_hostname = check_hostname;

        let mailboxes = mailboxes(&config, &[]).unwrap();
        assert_eq!(
            mailboxes[0].server.verification, expected,
            "{verify_mode:?} {check_hostname:?}"
        );
    }
}

#[test]
fn hostname_check_needs_verification() {
    let mut config = parse(MINIMAL);
    let tls = &mut config.servers.get_mut("home").unwrap().tls;
    tls.verify_mode = config_core::VerifyMode::None;
    tls.check_hostname = Some(true);

    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Server {
            source: ServerError::HostnameCheckWithoutVerification,
            ..
        }
    ));
}

#[test]
fn zero_idle_is_rejected() {
    let mut config = parse(MINIMAL);
    config.servers.get_mut("home").unwrap().idle = Some(0);

    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Server {
            source: ServerError::ZeroIdle,
            ..
        }
    ));
}

#[test]
fn unknown_policy_is_rejected() {
    let mut config = parse(MINIMAL);
    config.policies.clear();

    let error = mailboxes(&config, &[]).unwrap_err();
    let ConfigError::Server {
        name,
        source: ServerError::UnknownPolicy { mailbox, policy },
    } = error
    else {
        panic!("expected an unknown policy error");
    };
    assert_eq!(name, "home");
    assert_eq!(mailbox, "INBOX");
    assert_eq!(policy, "strict");
}

#[test]
fn unknown_server_is_rejected() {
    let config = parse(MINIMAL);
    let error = mailboxes(&config, &["work".to_owned()]).unwrap_err();
    assert!(matches!(error, ConfigError::UnknownServer { name } if name == "work"));
}

const THREE_SERVERS: &str = r#"
servers:
  a:
    host: a.example.com
    authentication: { method: login, username: me, password: secret }
  b:
    host: b.example.com
    default: true
    authentication: { method: login, username: me, password: secret }
  c:
    host: c.example.com
    authentication: { method: login, username: me, password: secret }
"#;

fn selected(config: &config_core::Config, names: &[&str]) -> Vec<String> {
    let names: Vec<String> = names.iter().map(|name| (*name).to_owned()).collect();
    select_servers(config, &names)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name.to_owned())
        .collect()
}

#[test]
fn default_servers_are_selected() {
    let config = parse(THREE_SERVERS);
    assert_eq!(selected(&config, &[]), ["b"]);
}

#[test]
fn all_servers_without_defaults() {
    let mut config = parse(THREE_SERVERS);
    config.servers.get_mut("b").unwrap().default = false;
    assert_eq!(selected(&config, &[]), ["a", "b", "c"]);
}

#[test]
fn named_servers_override_defaults() {
    let config = parse(THREE_SERVERS);
    assert_eq!(selected(&config, &["c", "a"]), ["c", "a"]);
}

#[test]
fn policies_are_shared_between_mailboxes() {
    let config = parse(
        r#"
servers:
  home:
    host: imap.example.com
    authentication: { method: login, username: me, password: secret }
    mailboxes:
      INBOX: strict
      Other:
        policy: strict
        initial_scan: none
      Lists: lenient
policies:
  strict:
    ham: [INBOX, "Archive/*"]
    ttl_days: 3
    my_addresses: ["Me <ME@Example.com>"]
  lenient:
    spam: [Junk]
"#,
    );
    let mailboxes = mailboxes(&config, &[]).unwrap();
    let by_name = |name: &str| {
        mailboxes
            .iter()
            .find(|mailbox| mailbox.mailbox == name)
            .unwrap()
    };

    let inbox = by_name("INBOX");
    let other = by_name("Other");
    let lists = by_name("Lists");
    assert!(Arc::ptr_eq(&inbox.policy, &other.policy));
    assert!(!Arc::ptr_eq(&inbox.policy, &lists.policy));
    assert!(Arc::ptr_eq(&inbox.server, &lists.server));
    assert_eq!(other.initial_scan, watch_session::InitialScan::None);

    let strict = inbox.policy.config();
    assert_eq!(strict.ham, ["INBOX", "Archive/*"]);
    assert_eq!(strict.sent, ["Sent"]);
    assert_eq!(strict.ttl_days, 3);
    assert!(strict.my_addresses.contains("me@example.com"));
    assert!(strict.challenge.is_none());

    assert_eq!(lists.policy.config().spam, ["Junk"]);
}

#[test]
fn empty_folder_list_is_rejected() {
    let mut config = parse(MINIMAL);
    config.policies.get_mut("strict").unwrap().spam = Some(Vec::new());

    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Policy {
            source: PolicyError::EmptyFolders("spam"),
            ..
        }
    ));
}

const CHALLENGING: &str = r#"
servers:
  home:
    host: imap.example.com
    authentication: { method: login, username: me, password: secret }
    mailboxes:
      INBOX: strict
policies:
  strict:
    my_addresses: [me@example.com]
    challenge:
      from: Me <me@example.com>
      transport: relay
transports:
  relay:
    host: smtp.example.com
    port: 2525
    tls: disabled
"#;

#[tokio::test]
async fn challenge_uses_default_body() {
    let config = parse(CHALLENGING);
    let mailboxes = mailboxes(&config, &[]).unwrap();

    let challenge = mailboxes[0].policy.config().challenge.clone().unwrap();
    assert_eq!(challenge.from.email.to_string(), "me@example.com");
    assert_eq!(challenge.from.name.as_deref(), Some("Me"));
    assert_eq!(challenge.body, DEFAULT_CHALLENGE_BODY);
}

#[tokio::test]
async fn invalid_challenge_sender_is_rejected() {
    let mut config = parse(CHALLENGING);
    let policy = config.policies.get_mut("strict").unwrap();
    policy.challenge.as_mut().unwrap().from = "not an address".to_owned();

    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Policy {
            source: PolicyError::InvalidSender { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_transport_is_rejected() {
    let mut config = parse(CHALLENGING);
    config.transports.clear();

    let error = mailboxes(&config, &[]).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::Policy {
            source: PolicyError::UnknownTransport(name),
            ..
        } if name == "relay"
    ));
}

#[test]
fn transport_without_host_drops_mail() {
    let transport = internal::transport(&config_core::TransportConfig::default()).unwrap();
    assert!(matches!(transport, mail_transport::AnyTransport::Null(_)));
}

#[tokio::test]
async fn transport_with_host_is_smtp() {
    let transport = internal::transport(&config_core::TransportConfig {
        host: Some("smtp.example.com".to_owned()),
        tls: config_core::SmtpTlsMode::Disabled,
        username: Some("me".to_owned()),
        password: Some("secret".to_owned()),
        ..Default::default()
    })
    .unwrap();
    assert!(matches!(transport, mail_transport::AnyTransport::Smtp(_)));
}

#[test]
fn transport_credentials_come_in_pairs() {
    let error = internal::transport(&config_core::TransportConfig {
        host: Some("smtp.example.com".to_owned()),
        username: Some("me".to_owned()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(error, TransportError::IncompleteCredentials));
}

#[test]
fn transport_settings_need_a_host() {
    let error = internal::transport(&config_core::TransportConfig {
        port: Some(25),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(error, TransportError::MissingHost));
}

#[test]
fn auth_debug_hides_secrets() {
    let auth = ServerAuth::OAuth2 {
        user: "me@example.com".to_owned(),
        access_token: "token123".to_owned(),
        mechanism: imap_session::auth::Mechanism::OAuthBearer,
        vendor: None,
    };
    let debug = format!("{auth:?}");
    assert!(debug.contains("me@example.com"));
    assert!(!debug.contains("token123"));
}
