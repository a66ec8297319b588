use super::*;

fn message() -> lettre::Message {
    lettre::Message::builder()
        .from("Me <me@example.com>".parse().unwrap())
        .to("you@example.com".parse().unwrap())
        .subject("hello")
        .body(String::from("hi"))
        .unwrap()
}

#[tokio::test]
async fn null_transport_accepts_everything() {
    let transport = AnyTransport::Null(Null);

    transport.send(&message()).await.unwrap();
}

#[tokio::test]
async fn smtp_builds_for_every_tls_mode() {
    for tls_mode in [TlsMode::Disabled, TlsMode::Enabled, TlsMode::StartTls] {
        Smtp::new(SmtpParams {
            host: "smtp.example.com",
            port: Some(2525),
            tls_mode,
            credentials: Some(("me@example.com", "secret")),
        })
        .unwrap();
    }
}

#[tokio::test]
async fn shared_transports_delegate() {
    let transport = std::sync::Arc::new(Null);

    Transport::send(&transport, &message()).await.unwrap();
}
