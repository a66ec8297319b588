//! Outbound mail delivery.

use std::future::Future;

mod null;
mod smtp;

pub use null::Null;
pub use smtp::{BuildError, Params as SmtpParams, Smtp, TlsMode};

/// Delivers composed messages.
pub trait Transport: Send + Sync {
    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a message to the recipients in its envelope.
    fn send(
        &self,
        message: &lettre::Message,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Errors returned by [`AnyTransport`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// SMTP delivery failed.
    #[error("SMTP: {0}")]
    Smtp(#[source] lettre::transport::smtp::Error),
}

/// One of the supported transports, picked by configuration.
#[derive(Debug, Clone)]
pub enum AnyTransport {
    /// SMTP relay.
    Smtp(Smtp),

    /// Drops messages.
    Null(Null),
}

impl Transport for AnyTransport {
    type Error = SendError;

    async fn send(&self, message: &lettre::Message) -> Result<(), Self::Error> {
        match self {
            Self::Smtp(smtp) => smtp.send(message).await.map_err(SendError::Smtp),
            Self::Null(null) => match null.send(message).await {
                Ok(()) => Ok(()),
                Err(never) => match never {},
            },
        }
    }
}

impl<T> Transport for std::sync::Arc<T>
where
    T: Transport,
{
    type Error = T::Error;

    fn send(
        &self,
        message: &lettre::Message,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        T::send(self, message)
    }
}

#[cfg(test)]
mod tests;
