/// A transport that logs and drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Null;

impl crate::Transport for Null {
    type Error = core::convert::Infallible;

    async fn send(&self, message: &lettre::Message) -> Result<(), Self::Error> {
        let envelope = message.envelope();
        let to: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
        tracing::info!(
            from = ?envelope.from().map(ToString::to_string),
            to = ?to,
            "dropping outgoing message"
        );
        Ok(())
    }
}
