//! The watch loop.

use imap_client_core::{Access, Client, IdleOutcome, Uid};
use mail_message::{Connection, Message};
use mail_query::Query;
use tokio_util::sync::CancellationToken;

use crate::{Connector, Cursor, Handler, Params, RunError, WaitPolicy};

/// The error type of [`run`] for a connector and handler.
type RunErrorOf<Conn, H> = RunError<
    <Conn as Connector>::Error,
    <<Conn as Connector>::Client as Client>::Error,
    <H as Handler<<Conn as Connector>::Client>>::Error,
>;

/// How a wait for new mail ended.
enum Wake {
    /// Something arrived in the watched mailbox.
    NewMail,

    /// The watch was cancelled.
    Cancelled,
}

/// Watch a mailbox, handing every new message to `handler`.
///
/// Returns `Ok` only once `cancel` fires while waiting for mail; any
/// connection failure is returned as an error for the caller to retry.
pub async fn run<Conn, H>(
    connector: &Conn,
    params: &Params,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<(), RunErrorOf<Conn, H>>
where
    Conn: Connector,
    H: Handler<Conn::Client>,
{
    let Params {
        mailbox,
        poll_interval,
        idle_timeout,
        initial_scan,
    } = params;

    let client = connector.connect().await.map_err(RunError::Connect)?;
    let mut conn = Connection::new(client).await.map_err(RunError::Imap)?;
    let wait = WaitPolicy::negotiate(conn.capabilities(), *poll_interval, *idle_timeout);

    let status = conn
        .select(mailbox, Access::ReadOnly)
        .await
        .map_err(RunError::Imap)?;
    let start = match status.uid_next {
        Some(uid_next) => uid_next,
        None => conn
            .search(mailbox, &Query::All)
            .await
            .map_err(RunError::Imap)?
            .last()
            .map_or(1, |highest| highest.saturating_add(1)),
    };
    let mut cursor = Cursor::new(start);

    tracing::info!(
        imap_mailbox = %mailbox,
        exists = status.exists,
        cursor = cursor.get(),
        wait_policy = ?wait,
        "watching mailbox"
    );

    let uids = conn
        .search(mailbox, &initial_scan.query())
        .await
        .map_err(RunError::Imap)?;
    dispatch(&mut conn, mailbox, handler, &mut cursor, uids).await?;

    loop {
        // Handlers may leave another mailbox selected, or ours read-write;
        // IDLE and NOOP must report on a read-only view of the watched one.
        if conn.selection() != Some((mailbox.as_str(), Access::ReadOnly)) {
            conn.select(mailbox, Access::ReadOnly)
                .await
                .map_err(RunError::Imap)?;
        }

        let query = Query::UidFrom(cursor.get()).and(Query::Unseen);
        let found = conn.search(mailbox, &query).await.map_err(RunError::Imap)?;
        let uids = cursor.unhandled(found);
        if !uids.is_empty() {
            tracing::debug!(
                imap_mailbox = %mailbox,
                cursor = cursor.get(),
                count = uids.len(),
                "new messages"
            );
            dispatch(&mut conn, mailbox, handler, &mut cursor, uids).await?;
            // Mail delivered while handlers ran raises no notification.
            continue;
        }

        match wait_for_mail(&mut conn, wait, cancel)
            .await
            .map_err(RunError::Imap)?
        {
            Wake::NewMail => {}
            Wake::Cancelled => {
                if let Err(error) = conn.logout().await {
                    tracing::debug!(imap_mailbox = %mailbox, %error, "logout failed");
                }
                tracing::info!(imap_mailbox = %mailbox, "watch cancelled");
                return Ok(());
            }
        }
    }
}

/// Hand messages to the handler in ascending UID order.
///
/// A failing message is skipped unless the connection went down with it.
async fn dispatch<C, H, ConnectError>(
    conn: &mut Connection<C>,
    mailbox: &str,
    handler: &mut H,
    cursor: &mut Cursor,
    mut uids: Vec<Uid>,
) -> Result<(), RunError<ConnectError, C::Error, H::Error>>
where
    C: Client,
    H: Handler<C>,
{
    uids.sort_unstable();
    for uid in uids {
        tracing::debug!(imap_mailbox = %mailbox, uid, "handling message");
        let mut message = Message::new(mailbox, uid);
        let result = handler.handle(conn, &mut message).await;
        cursor.pass(uid);

        if let Err(error) = result {
            if conn.is_lost() {
                return Err(RunError::Handler(error));
            }
            tracing::warn!(imap_mailbox = %mailbox, uid, %error, "skipping message");
        }
    }
    Ok(())
}

/// Block until new mail arrives or the watch is cancelled.
async fn wait_for_mail<C>(
    conn: &mut Connection<C>,
    wait: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<Wake, mail_message::Error<C::Error>>
where
    C: Client,
{
    match wait {
        WaitPolicy::Idle { max_duration } => loop {
            match conn.idle(max_duration, cancel).await? {
                IdleOutcome::NewMail => {
                    tracing::debug!("idle notified of new mail");
                    return Ok(Wake::NewMail);
                }
                IdleOutcome::Timeout => {
                    tracing::debug!("idle timeout elapsed, re-issuing IDLE");
                }
                IdleOutcome::Cancelled => return Ok(Wake::Cancelled),
            }
        },
        WaitPolicy::Poll { interval } => loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(Wake::Cancelled),
                () = tokio::time::sleep(interval) => {}
            }
            if conn.noop().await? {
                tracing::debug!("poll found new mail");
                return Ok(Wake::NewMail);
            }
        },
    }
}
