//! Lift raw config into watched mailboxes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

mod error;
mod internal;
mod types;

pub use error::*;
pub use types::*;

/// Default poll interval (seconds); zero prefers IDLE.
pub const DEFAULT_POLL_SECS: u64 = 0;

/// Default IDLE duration (seconds).
pub const DEFAULT_IDLE_SECS: u64 = 900;

/// Default initial retry delay (seconds).
pub const DEFAULT_MIN_BACKOFF_SECS: u64 = 1;

/// Default retry delay cap (seconds).
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 300;

/// Upper bound of the random delay added to every retry.
pub const DEFAULT_JITTER: Duration = Duration::from_secs(5);

/// Challenge text used when a policy does not set one.
pub const DEFAULT_CHALLENGE_BODY: &str = "\
Your message has been held because your address is not known to me yet.

Please reply to this message to confirm you are a person; your mail will
then be delivered, along with anything else you send me.
";

/// Pick the servers to run.
///
/// Explicit names are used as given. Without names, the servers flagged as
/// `default` run, or all of them when none is flagged.
pub fn select_servers<'a>(
    config: &'a config_core::Config,
    names: &[String],
) -> Result<Vec<(&'a str, &'a config_core::ServerConfig)>, ConfigError> {
    if !names.is_empty() {
        return names
            .iter()
            .map(|name| {
                config
                    .servers
                    .get_key_value(name)
                    .map(|(name, server)| (name.as_str(), server))
                    .ok_or_else(|| ConfigError::UnknownServer { name: name.clone() })
            })
            .collect();
    }

    let flagged: Vec<_> = config
        .servers
        .iter()
        .filter(|(_, server)| server.default)
        .map(|(name, server)| (name.as_str(), server))
        .collect();
    if !flagged.is_empty() {
        return Ok(flagged);
    }

    Ok(config
        .servers
        .iter()
        .map(|(name, server)| (name.as_str(), server))
        .collect())
}

/// Build the watched mailboxes of the selected servers.
///
/// SMTP transports are built here, so this must run within a Tokio runtime.
pub fn mailboxes(
    config: &config_core::Config,
    servers: &[String],
) -> Result<Vec<Mailbox>, ConfigError> {
    let selected = select_servers(config, servers)?;

    let mut transports = internal::Transports::new();
    for (name, transport) in &config.transports {
        let transport = internal::transport(transport).map_err(|source| ConfigError::Transport {
            name: name.clone(),
            source,
        })?;
        transports.insert(name.clone(), Arc::new(transport));
    }

    let mut policies: BTreeMap<&str, Arc<Policy>> = BTreeMap::new();
    let mut mailboxes = Vec::new();

    for (server_name, server_config) in selected {
        let server_error = |source| ConfigError::Server {
            name: server_name.to_owned(),
            source,
        };

        let server = Arc::new(internal::server(server_name, server_config).map_err(server_error)?);

        for (mailbox, binding) in &server_config.mailboxes {
            let (policy_name, initial_scan) = internal::binding(binding);

            let policy = match policies.get(policy_name) {
                Some(policy) => Arc::clone(policy),
                None => {
                    let Some((policy_name, policy_config)) =
                        config.policies.get_key_value(policy_name)
                    else {
                        return Err(server_error(ServerError::UnknownPolicy {
                            mailbox: mailbox.clone(),
                            policy: policy_name.to_owned(),
                        }));
                    };
                    let policy = internal::policy(policy_config, &transports).map_err(|source| {
                        ConfigError::Policy {
                            name: policy_name.clone(),
                            source,
                        }
                    })?;
                    let policy = Arc::new(policy);
                    policies.insert(policy_name.as_str(), Arc::clone(&policy));
                    policy
                }
            };

            mailboxes.push(Mailbox {
                server: Arc::clone(&server),
                mailbox: mailbox.clone(),
                initial_scan: internal::initial_scan(initial_scan),
                policy_name: policy_name.to_owned(),
                policy,
            });
        }
    }

    tracing::debug!(mailboxes = mailboxes.len(), "config brought up");

    Ok(mailboxes)
}

#[cfg(test)]
mod tests;
