//! Supervised watches of the configured mailboxes.

use core::ops::ControlFlow;
use core::time::Duration;
use std::sync::Arc;

use rand::Rng as _;
use tracing::Instrument as _;
use tokio_util::sync::CancellationToken;

/// Connect to a server based on provided settings.
pub async fn connect_to_server(
    server: &config_bringup::Server,
) -> Result<imap_client_async::Client, imap_session::Error> {
    let session = imap_session::establish(server.session_params()).await?;
    tracing::debug!(
        server = %server.server_name,
        imap_host = %server.host,
        imap_port = server.port,
        "session established"
    );
    Ok(imap_client_async::Client::new(session))
}

/// Opens sessions with one server.
#[derive(Debug, Clone)]
pub struct ServerConnector {
    /// The server.
    server: Arc<config_bringup::Server>,
}

impl ServerConnector {
    /// A connector for the given server.
    pub fn new(server: Arc<config_bringup::Server>) -> Self {
        Self { server }
    }
}

impl watch_session::Connector for ServerConnector {
    type Client = imap_client_async::Client;
    type Error = imap_session::Error;

    async fn connect(&self) -> Result<Self::Client, Self::Error> {
        connect_to_server(&self.server).await
    }
}

/// Runs every message through a policy.
#[derive(Debug, Clone)]
pub struct PolicyHandler {
    /// The policy.
    policy: Arc<config_bringup::Policy>,
}

impl PolicyHandler {
    /// A handler applying the given policy.
    pub fn new(policy: Arc<config_bringup::Policy>) -> Self {
        Self { policy }
    }
}

impl<C> watch_session::Handler<C> for PolicyHandler
where
    C: imap_client_core::Client,
{
    type Error = mail_policy::Error<C::Error>;

    async fn handle(
        &mut self,
        conn: &mut mail_message::Connection<C>,
        message: &mut mail_message::Message,
    ) -> Result<(), Self::Error> {
        self.policy.classify(conn, message).await?;
        Ok(())
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn sleep_unless_cancelled(
    cancel: &CancellationToken,
    duration: Duration,
) -> ControlFlow<()> {
    tokio::select! {
        () = cancel.cancelled() => ControlFlow::Break(()),
        () = tokio::time::sleep(duration) => ControlFlow::Continue(()),
    }
}

/// A random delay in `0..=max`.
pub fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    rand::thread_rng().gen_range(Duration::ZERO..=max)
}

/// Spawn a supervised watch for every mailbox.
///
/// Each watch is retried with backoff after failures and ends once `cancel`
/// fires.
pub fn spawn_watches(
    mailboxes: &[config_bringup::Mailbox],
    join_set: &mut tokio::task::JoinSet<()>,
    cancel: &CancellationToken,
) {
    for mailbox in mailboxes {
        let connector = ServerConnector::new(Arc::clone(&mailbox.server));
        let handler = PolicyHandler::new(Arc::clone(&mailbox.policy));
        let params = mailbox.watch_params();
        let backoff = mailbox.server.backoff;
        let server_name = mailbox.server.server_name.clone();
        let cancel = cancel.clone();

        join_set.spawn(async move {
            let work = {
                let server_name = server_name.clone();
                let params = params.clone();
                let cancel = cancel.clone();
                move || {
                    let connector = connector.clone();
                    let mut handler = handler.clone();
                    let params = params.clone();
                    let cancel = cancel.clone();
                    let server_name = server_name.clone();

                    std::panic::AssertUnwindSafe(async move {
                        let span = tracing::info_span!(
                            "watch",
                            server = %server_name,
                            imap_mailbox = %params.mailbox
                        );
                        watch_session::run(&connector, &params, &mut handler, &cancel)
                            .instrument(span)
                            .await
                    })
                }
            };

            let notifier = {
                let mailbox = params.mailbox.clone();
                move |event| {
                    log_event(&server_name, &mailbox, event);
                    core::future::ready(())
                }
            };

            let sleep = move |duration| {
                let cancel = cancel.clone();
                async move { sleep_unless_cancelled(&cancel, duration).await }
            };

            supervisor::run(supervisor::Params {
                work,
                notifier,
                sleep,
                jitter: move || jitter(backoff.jitter),
                retries_backoff: exp_backoff::State::doubling(backoff.min, backoff.max),
                reset_after: backoff.reset_after,
            })
            .await;
        });
    }
}

/// Log a supervisor event of one watch.
fn log_event<E>(server: &str, mailbox: &str, event: supervisor::SupervisorEvent<(), E>)
where
    E: std::error::Error,
{
    match event {
        supervisor::SupervisorEvent::Started => {
            tracing::info!(%server, imap_mailbox = %mailbox, "watch started");
        }
        supervisor::SupervisorEvent::Done { value: () } => {
            tracing::info!(%server, imap_mailbox = %mailbox, "watch finished");
        }
        supervisor::SupervisorEvent::Error {
            error,
            next_retry_in,
        } => {
            tracing::error!(
                %server,
                imap_mailbox = %mailbox,
                %error,
                ?next_retry_in,
                "watch failed"
            );
        }
        supervisor::SupervisorEvent::Panicked { next_retry_in, .. } => {
            tracing::error!(%server, imap_mailbox = %mailbox, ?next_retry_in, "watch panicked");
        }
        supervisor::SupervisorEvent::Cancelled => {
            tracing::info!(%server, imap_mailbox = %mailbox, "watch cancelled while backing off");
        }
    }
}

#[cfg(test)]
mod tests;
