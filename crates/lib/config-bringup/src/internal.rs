//! Internal utils.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::*;

/// Built transports by name.
pub type Transports = BTreeMap<String, Arc<mail_transport::AnyTransport>>;

/// Bringup the server config.
pub fn server(name: &str, server: &config_core::ServerConfig) -> Result<types::Server, ServerError> {
    let tls_mode = match server.tls.mode {
        config_core::TlsMode::Disabled => imap_tls::TlsMode::Disabled,
        config_core::TlsMode::Enabled => imap_tls::TlsMode::Enabled,
        config_core::TlsMode::StartTls => imap_tls::TlsMode::StartTls,
    };

    let port = server.port.unwrap_or_else(|| tls_mode.default_port());

    let tls_server_name = server
        .tls
        .server_name
        .clone()
        .unwrap_or_else(|| server.host.clone());

    let verification = match (server.tls.verify_mode, server.tls.check_hostname) {
        (config_core::VerifyMode::None, Some(true)) => {
            return Err(ServerError::HostnameCheckWithoutVerification);
        }
        (config_core::VerifyMode::None, _) => imap_session::Verification::Off,
        (_, Some(false)) => imap_session::Verification::AnyName,
        (_, _) => imap_session::Verification::Full,
    };

    let idle_secs = server.idle.unwrap_or(DEFAULT_IDLE_SECS);
    if idle_secs == 0 {
        return Err(ServerError::ZeroIdle);
    }

    Ok(types::Server {
        server_name: name.to_owned(),
        host: server.host.clone(),
        port,
        tls_mode,
        tls_server_name,
        ca_file: server.tls.ca_file.clone(),
        verification,
        auth: server_auth(&server.authentication),
        poll_interval: Duration::from_secs(server.poll.unwrap_or(DEFAULT_POLL_SECS)),
        idle_timeout: Duration::from_secs(idle_secs),
        backoff: backoff(server)?,
    })
}

/// Bringup the retry settings.
fn backoff(server: &config_core::ServerConfig) -> Result<Backoff, ServerError> {
    let min = server.min_backoff.unwrap_or(DEFAULT_MIN_BACKOFF_SECS);
    let max = server.max_backoff.unwrap_or(DEFAULT_MAX_BACKOFF_SECS);
    if min == 0 || max < min {
        return Err(ServerError::InvalidBackoff { min, max });
    }

    Ok(Backoff {
        min: Duration::from_secs(min),
        max: Duration::from_secs(max),
        jitter: DEFAULT_JITTER,
        reset_after: server.backoff_reset_after_secs.map(Duration::from_secs),
    })
}

/// Bringup the server auth config.
pub fn server_auth(auth: &config_core::Auth) -> ServerAuth {
    match auth {
        config_core::Auth::Login(credentials) => ServerAuth::Login {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        },
        config_core::Auth::Plain(credentials) => ServerAuth::Plain {
            identity: credentials.identity.clone(),
            password: credentials.password.clone(),
            authorization_identity: credentials.authorization_identity.clone(),
        },
        config_core::Auth::OAuth2(oauth2) => ServerAuth::OAuth2 {
            user: oauth2.user.clone(),
            access_token: oauth2.access_token.clone(),
            mechanism: match oauth2.mechanism {
                None | Some(config_core::OAuth2Mechanism::Xoauth2) => {
                    imap_session::auth::Mechanism::XOAuth2
                }
                Some(config_core::OAuth2Mechanism::Oauthbearer) => {
                    imap_session::auth::Mechanism::OAuthBearer
                }
            },
            vendor: oauth2.vendor.clone(),
        },
    }
}

/// Bringup an outgoing transport.
pub fn transport(
    transport: &config_core::TransportConfig,
) -> Result<mail_transport::AnyTransport, TransportError> {
    let credentials = match (&transport.username, &transport.password) {
        (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
        (None, None) => None,
        _ => return Err(TransportError::IncompleteCredentials),
    };

    let Some(host) = &transport.host else {
        if transport.port.is_some() || credentials.is_some() {
            return Err(TransportError::MissingHost);
        }
        return Ok(mail_transport::AnyTransport::Null(mail_transport::Null));
    };

    let tls_mode = match transport.tls {
        config_core::SmtpTlsMode::Disabled => mail_transport::TlsMode::Disabled,
        config_core::SmtpTlsMode::Enabled => mail_transport::TlsMode::Enabled,
        config_core::SmtpTlsMode::StartTls => mail_transport::TlsMode::StartTls,
    };

    let smtp = mail_transport::Smtp::new(mail_transport::SmtpParams {
        host: host.as_str(),
        port: transport.port,
        tls_mode,
        credentials,
    })
    .map_err(TransportError::Smtp)?;

    Ok(mail_transport::AnyTransport::Smtp(smtp))
}

/// Bringup a policy.
pub fn policy(
    policy: &config_core::PolicyConfig,
    transports: &Transports,
) -> Result<types::Policy, PolicyError> {
    let defaults = mail_policy::Config::default();

    let folders = |configured: &Option<Vec<String>>, default: Vec<String>, kind| match configured {
        Some(folders) if folders.is_empty() => Err(PolicyError::EmptyFolders(kind)),
        Some(folders) => Ok(folders.clone()),
        None => Ok(default),
    };

    let my_addresses = policy
        .my_addresses
        .iter()
        .map(|raw| {
            mail_query::normalize_address(raw).ok_or_else(|| PolicyError::InvalidAddress(raw.clone()))
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    let (challenge, transport) = match &policy.challenge {
        None => (None, None),
        Some(challenge) => {
            let from = challenge
                .from
                .parse::<lettre::message::Mailbox>()
                .map_err(|source| PolicyError::InvalidSender {
                    from: challenge.from.clone(),
                    source,
                })?;
            let transport = transports
                .get(&challenge.transport)
                .ok_or_else(|| PolicyError::UnknownTransport(challenge.transport.clone()))?;
            let challenge = mail_policy::ChallengeConfig {
                from,
                body: challenge
                    .body
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CHALLENGE_BODY.to_owned()),
            };
            (Some(challenge), Some(Arc::clone(transport)))
        }
    };

    let config = mail_policy::Config {
        sent: folders(&policy.sent, defaults.sent, "sent")?,
        spam: folders(&policy.spam, defaults.spam, "spam")?,
        ham: folders(&policy.ham, defaults.ham, "ham")?,
        ttl_days: policy.ttl_days.unwrap_or(defaults.ttl_days),
        my_addresses,
        challenge,
    };

    Ok(mail_policy::Policy::new(config, transport))
}

/// Bringup the initial scan mode of a mailbox.
pub fn initial_scan(initial_scan: Option<config_core::InitialScan>) -> watch_session::InitialScan {
    match initial_scan {
        None => watch_session::InitialScan::default(),
        Some(config_core::InitialScan::Unseen) => watch_session::InitialScan::Unseen,
        Some(config_core::InitialScan::All) => watch_session::InitialScan::All,
        Some(config_core::InitialScan::None) => watch_session::InitialScan::None,
    }
}

/// The policy name and initial scan of a mailbox binding.
pub fn binding(binding: &config_core::MailboxBinding) -> (&str, Option<config_core::InitialScan>) {
    match binding {
        config_core::MailboxBinding::Policy(policy) => (policy, None),
        config_core::MailboxBinding::Detailed(mailbox) => (&mailbox.policy, mailbox.initial_scan),
    }
}
