//! IMAP connectivity helpers.

use std::time::Duration;

/// A connection over the production client.
pub type Connection = mail_message::Connection<imap_client_async::Client>;

/// Connects to the IMAP server with retries until it is ready.
pub async fn connect_with_retry(
    server: &config_bringup::Server,
) -> Result<Connection, std::io::Error> {
    let try_connect = || async move {
        let client = watch_service::connect_to_server(server)
            .await
            .map_err(std::io::Error::other)?;
        mail_message::Connection::new(client)
            .await
            .map_err(std::io::Error::other)
    };

    let mut attempts = 60u8;
    loop {
        let err = match try_connect().await {
            Ok(conn) => return Ok(conn),
            Err(err) => err,
        };

        let Some(attempts_left) = attempts.checked_sub(1) else {
            return Err(err);
        };

        attempts = attempts_left;
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
