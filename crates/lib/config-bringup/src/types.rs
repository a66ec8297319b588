//! Config structs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The policy type mailboxes are bound to.
pub type Policy = mail_policy::Policy<Arc<mail_transport::AnyTransport>>;

/// Fully resolved server configuration shared across mailboxes.
#[derive(Debug, Clone)]
pub struct Server {
    /// Human-friendly name for logging and identification.
    pub server_name: String,

    /// Hostname or IP address of the IMAP server.
    pub host: String,

    /// IMAP port.
    pub port: u16,

    /// TLS mode.
    pub tls_mode: imap_tls::TlsMode,

    /// TLS server name (SNI).
    pub tls_server_name: String,

    /// Extra trust anchors (PEM).
    pub ca_file: Option<PathBuf>,

    /// How the server certificate is checked.
    pub verification: imap_session::Verification,

    /// IMAP authentication.
    pub auth: ServerAuth,

    /// Poll interval; zero prefers IDLE.
    pub poll_interval: Duration,

    /// Maximum duration of a single IDLE.
    pub idle_timeout: Duration,

    /// Retry behaviour after failures.
    pub backoff: Backoff,
}

impl Server {
    /// Parameters for establishing a session with this server.
    pub fn session_params(&self) -> imap_session::Params<'_> {
        imap_session::Params {
            connect: imap_session::ConnectParams {
                host: &self.host,
                port: self.port,
                tls_mode: self.tls_mode,
                tls_server_name: &self.tls_server_name,
                ca_file: self.ca_file.as_deref(),
                verification: self.verification,
            },
            auth: self.auth.params(),
        }
    }
}

/// Retry behaviour after failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Initial delay.
    pub min: Duration,

    /// Upper bound of the delay.
    pub max: Duration,

    /// Upper bound of the random delay added to every retry.
    pub jitter: Duration,

    /// Reset the delay after an attempt ran this long.
    pub reset_after: Option<Duration>,
}

/// Fully-resolved IMAP authentication config.
#[derive(Clone, PartialEq)]
pub enum ServerAuth {
    /// Login with username/password.
    Login {
        /// Username for IMAP authentication.
        username: String,

        /// Password for IMAP authentication.
        password: String,
    },

    /// SASL PLAIN.
    Plain {
        /// Authentication identity.
        identity: String,

        /// Password of the authentication identity.
        password: String,

        /// Identity to act as.
        authorization_identity: Option<String>,
    },

    /// OAuth 2 bearer token.
    OAuth2 {
        /// Username for OAuth2 IMAP authentication.
        user: String,

        /// Access token for OAuth2 IMAP authentication.
        access_token: String,

        /// SASL mechanism.
        mechanism: imap_session::auth::Mechanism,

        /// Vendor name sent with `XOAUTH2`.
        vendor: Option<String>,
    },
}

impl ServerAuth {
    /// Borrow as session auth params.
    pub fn params(&self) -> imap_session::auth::Params<'_> {
        match self {
            Self::Login { username, password } => imap_session::auth::Params::Login {
                username,
                password,
            },
            Self::Plain {
                identity,
                password,
                authorization_identity,
            } => imap_session::auth::Params::Plain {
                identity,
                password,
                authorization_identity: authorization_identity.as_deref(),
            },
            Self::OAuth2 {
                user,
                access_token,
                mechanism,
                vendor,
            } => imap_session::auth::Params::OAuth2 {
                user,
                access_token,
                mechanism: *mechanism,
                vendor: vendor.as_deref(),
            },
        }
    }
}

impl std::fmt::Debug for ServerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets stay out of logs.
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Plain {
                identity,
                authorization_identity,
                ..
            } => f
                .debug_struct("Plain")
                .field("identity", identity)
                .field("authorization_identity", authorization_identity)
                .finish_non_exhaustive(),
            Self::OAuth2 {
                user,
                mechanism,
                vendor,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("user", user)
                .field("mechanism", mechanism)
                .field("vendor", vendor)
                .finish_non_exhaustive(),
        }
    }
}

/// Fully resolved configuration of one watched mailbox.
#[derive(Debug, Clone)]
pub struct Mailbox {
    /// A shared server.
    pub server: Arc<Server>,

    /// Mailbox name (e.g. INBOX).
    pub mailbox: String,

    /// Which messages present at startup are handled.
    pub initial_scan: watch_session::InitialScan,

    /// Name of the bound policy.
    pub policy_name: String,

    /// The bound policy, shared by every mailbox using it.
    pub policy: Arc<Policy>,
}

impl Mailbox {
    /// Parameters for a watch session on this mailbox.
    pub fn watch_params(&self) -> watch_session::Params {
        watch_session::Params {
            mailbox: self.mailbox.clone(),
            poll_interval: self.server.poll_interval,
            idle_timeout: self.server.idle_timeout,
            initial_scan: self.initial_scan,
        }
    }
}
