//! Error types.

/// Config bringup error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A server was requested that is not configured.
    #[error("unknown server \"{name}\"")]
    UnknownServer {
        /// The requested name.
        name: String,
    },

    /// Failed to bringup server.
    #[error("server \"{name}\": {source}")]
    Server {
        /// The server name.
        name: String,

        /// The cause.
        #[source]
        source: ServerError,
    },

    /// Failed to bringup policy.
    #[error("policy \"{name}\": {source}")]
    Policy {
        /// The policy name.
        name: String,

        /// The cause.
        #[source]
        source: PolicyError,
    },

    /// Failed to bringup transport.
    #[error("transport \"{name}\": {source}")]
    Transport {
        /// The transport name.
        name: String,

        /// The cause.
        #[source]
        source: TransportError,
    },
}

/// Server bringup error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The backoff bounds are unusable.
    #[error("backoff bounds must satisfy 0 < min_backoff <= max_backoff (got {min}..{max})")]
    InvalidBackoff {
        /// Configured minimum (seconds).
        min: u64,

        /// Configured maximum (seconds).
        max: u64,
    },

    /// A zero IDLE duration.
    #[error("idle must be positive")]
    ZeroIdle,

    /// `check_hostname` is on while certificates are not verified.
    #[error("check_hostname requires a verify_mode other than none")]
    HostnameCheckWithoutVerification,

    /// A mailbox names a policy that is not configured.
    #[error("mailbox \"{mailbox}\": unknown policy \"{policy}\"")]
    UnknownPolicy {
        /// The mailbox.
        mailbox: String,

        /// The policy name.
        policy: String,
    },
}

/// Policy bringup error.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The challenge sender is not a valid mailbox.
    #[error("challenge sender \"{from}\": {source}")]
    InvalidSender {
        /// The configured sender.
        from: String,

        /// The cause.
        #[source]
        source: lettre::address::AddressError,
    },

    /// One of our own addresses is not an address.
    #[error("invalid own address \"{0}\"")]
    InvalidAddress(String),

    /// The challenge names a transport that is not configured.
    #[error("unknown transport \"{0}\"")]
    UnknownTransport(String),

    /// A folder list is present but empty.
    #[error("{0} folder list is empty")]
    EmptyFolders(&'static str),
}

/// Transport bringup error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The SMTP relay could not be configured.
    #[error("smtp: {0}")]
    Smtp(#[source] mail_transport::BuildError),

    /// Only one of username and password is set.
    #[error("username and password must be given together")]
    IncompleteCredentials,

    /// Settings that only apply to a relay were given without a host.
    #[error("port or credentials given without a host")]
    MissingHost,
}
