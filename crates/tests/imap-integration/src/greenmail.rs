//! GreenMail container helpers.

use testcontainers::{
    GenericImage, ImageExt as _, core::IntoContainerPort as _, runners::AsyncRunner as _,
};

/// A running GreenMail container; stopped on drop.
pub struct GreenMail {
    /// The container.
    container: testcontainers::ContainerAsync<GenericImage>,
}

impl GreenMail {
    /// Starts a GreenMail container with one account.
    pub async fn start(user: &str, password: &str) -> Result<Self, testcontainers::TestcontainersError> {
        let container = GenericImage::new("greenmail/standalone", "latest")
            .with_exposed_port(crate::IMAP_PORT.tcp())
            .with_wait_for(testcontainers::core::WaitFor::message_on_stdout(
                "Starting GreenMail API server at",
            ))
            .with_env_var("GREENMAIL_USERS", format!("{user}:{password}"))
            .start()
            .await?;

        Ok(Self { container })
    }

    /// Host and mapped port of the plain IMAP listener.
    pub async fn imap_endpoint(&self) -> Result<(String, u16), testcontainers::TestcontainersError> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(crate::IMAP_PORT).await?;
        Ok((host.to_string(), port))
    }
}
