//! Choosing how to wait for new mail.

use std::time::Duration;

use imap_client_core::Capabilities;

/// The poll interval used when the server cannot IDLE and none is configured.
pub const FALLBACK_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// How a connection waits for new mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// IDLE, re-issued after `max_duration`.
    Idle {
        /// Maximum duration of a single IDLE.
        max_duration: Duration,
    },

    /// NOOP every `interval`.
    Poll {
        /// Time between NOOPs.
        interval: Duration,
    },
}

impl WaitPolicy {
    /// Pick the wait policy for a freshly established connection.
    ///
    /// A non-zero poll interval always polls.
    pub fn negotiate(
        capabilities: &Capabilities,
        poll_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        if !poll_interval.is_zero() {
            return Self::Poll {
                interval: poll_interval,
            };
        }

        if capabilities.has("IDLE") {
            Self::Idle {
                max_duration: idle_timeout,
            }
        } else {
            Self::Poll {
                interval: FALLBACK_POLL_INTERVAL,
            }
        }
    }
}
