//! Shared configuration types for imaplar.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// IMAP servers to watch, by name.
    pub servers: BTreeMap<String, ServerConfig>,

    /// Named policy configurations mailboxes bind to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub policies: BTreeMap<String, PolicyConfig>,

    /// Named outgoing mail transports.
    #[cfg_attr(feature = "serde", serde(default))]
    pub transports: BTreeMap<String, TransportConfig>,
}

/// A watched IMAP server.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Hostname or IP address of the IMAP server.
    pub host: String,

    /// Optional port override.
    pub port: Option<u16>,

    /// TLS settings.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tls: TlsConfig,

    /// Authentication settings.
    pub authentication: Auth,

    /// Whether this server is watched when none are named explicitly.
    #[cfg_attr(feature = "serde", serde(default))]
    pub default: bool,

    /// Poll interval (seconds); zero prefers IDLE.
    pub poll: Option<u64>,

    /// Maximum duration of a single IDLE (seconds).
    pub idle: Option<u64>,

    /// Initial retry delay after a failure (seconds).
    pub min_backoff: Option<u64>,

    /// Upper bound of the retry delay (seconds).
    pub max_backoff: Option<u64>,

    /// Reset the retry delay after a session ran this long (seconds).
    pub backoff_reset_after_secs: Option<u64>,

    /// Mailboxes to watch on this server, bound to policy names.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mailboxes: BTreeMap<String, MailboxBinding>,
}

/// TLS configuration for a server.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", default))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsConfig {
    /// TLS mode.
    pub mode: TlsMode,

    /// Optional override for the TLS server name (SNI).
    pub server_name: Option<String>,

    /// Extra trust anchors (PEM).
    #[cfg_attr(feature = "serde", serde(alias = "cafile"))]
    pub ca_file: Option<PathBuf>,

    /// Whether the server certificate is verified.
    pub verify_mode: VerifyMode,

    /// Whether the certificate must name the server; on unless
    /// `verify_mode` is `none`.
    pub check_hostname: Option<bool>,
}

/// Server certificate verification.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum VerifyMode {
    /// Accept any certificate.
    None,

    /// Verify the certificate the server presents; a server always presents one.
    Optional,

    /// Verify the certificate.
    #[default]
    Required,
}

/// Supported TLS modes.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum TlsMode {
    /// Plain text.
    Disabled,

    /// Implicit TLS (usually port 993).
    #[default]
    Enabled,

    /// STARTTLS upgrade (usually port 143).
    #[cfg_attr(feature = "serde", serde(rename = "starttls", alias = "start_tls"))]
    StartTls,
}

/// IMAP authentication settings.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "method", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    /// Login via username/password.
    Login(LoginCredentials),

    /// SASL PLAIN.
    Plain(PlainCredentials),

    /// OAuth 2 bearer token.
    #[cfg_attr(feature = "serde", serde(rename = "oauth2"))]
    OAuth2(OAuth2Credentials),
}

/// Login credentials for IMAP authentication.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct LoginCredentials {
    /// Username for IMAP authentication.
    pub username: String,

    /// Password for IMAP authentication.
    pub password: String,
}

/// SASL PLAIN credentials.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlainCredentials {
    /// Authentication identity.
    #[cfg_attr(feature = "serde", serde(alias = "username"))]
    pub identity: String,

    /// Password of the authentication identity.
    pub password: String,

    /// Identity to act as.
    pub authorization_identity: Option<String>,
}

/// OAuth 2 credentials for IMAP authentication.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct OAuth2Credentials {
    /// Username for OAuth 2 IMAP authentication.
    pub user: String,

    /// Access token for OAuth 2 IMAP authentication.
    pub access_token: String,

    /// SASL mechanism; `xoauth2` when absent.
    pub mechanism: Option<OAuth2Mechanism>,

    /// Vendor name sent with `XOAUTH2`.
    pub vendor: Option<String>,
}

/// SASL mechanisms carrying an OAuth 2 token.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OAuth2Mechanism {
    /// `XOAUTH2`.
    #[cfg_attr(feature = "serde", serde(alias = "XOAUTH2"))]
    Xoauth2,

    /// `OAUTHBEARER`.
    #[cfg_attr(feature = "serde", serde(alias = "OAUTHBEARER"))]
    Oauthbearer,
}

/// A mailbox bound to a policy, either by name alone or with options.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum MailboxBinding {
    /// Just the policy name.
    Policy(String),

    /// Policy name plus options.
    Detailed(MailboxConfig),
}

/// A watched mailbox with options.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct MailboxConfig {
    /// The policy applied to new messages.
    pub policy: String,

    /// Which messages present at startup are handled.
    pub initial_scan: Option<InitialScan>,
}

/// Which messages already in the mailbox are handled when a session starts.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InitialScan {
    /// Messages without `\Seen`.
    Unseen,

    /// Every message.
    All,

    /// None.
    None,
}

/// A challenge-response policy.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyConfig {
    /// Folders holding mail we sent; the first is primary.
    pub sent: Option<Vec<String>>,

    /// Folders holding unwanted mail; the first is primary.
    pub spam: Option<Vec<String>>,

    /// Folders holding wanted mail; the first is primary.
    pub ham: Option<Vec<String>>,

    /// Days a challenge suppresses another one to the same address.
    pub ttl_days: Option<u64>,

    /// Our own addresses.
    #[cfg_attr(feature = "serde", serde(default))]
    pub my_addresses: Vec<String>,

    /// Challenge settings; challenges are disabled when absent.
    pub challenge: Option<ChallengeConfig>,
}

/// How challenges are sent.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeConfig {
    /// Sender of challenges, e.g. `Me <me@example.com>`.
    pub from: String,

    /// Name of the transport in [`Config::transports`].
    pub transport: String,

    /// Challenge text; a built-in text when absent.
    pub body: Option<String>,
}

/// An outgoing mail transport.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportConfig {
    /// SMTP relay host; messages are logged and dropped when absent.
    pub host: Option<String>,

    /// Optional port override.
    pub port: Option<u16>,

    /// Connection security.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tls: SmtpTlsMode,

    /// Login username.
    pub username: Option<String>,

    /// Login password.
    pub password: Option<String>,
}

/// SMTP connection security.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SmtpTlsMode {
    /// Plain text.
    Disabled,

    /// Implicit TLS.
    Enabled,

    /// STARTTLS upgrade.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "starttls", alias = "start_tls"))]
    StartTls,
}
