use super::*;

#[test]
fn missing_ca_file() {
    let path = std::env::temp_dir().join("imap-tls-rustls-does-not-exist.pem");

    let err = connector(Some(&path), Verification::Full).unwrap_err();

    assert!(
        matches!(&err, TlsConnectError::CaFile { path: reported, .. } if *reported == path),
        "{err:?}"
    );
}

#[test]
fn ca_file_without_certificates() {
    let path = std::env::temp_dir().join(format!(
        "imap-tls-rustls-empty-{}.pem",
        std::process::id()
    ));
    std::fs::write(&path, "this is not a certificate\n").unwrap();

    let err = connector(Some(&path), Verification::Full).unwrap_err();
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(err, TlsConnectError::EmptyCaFile(_)), "{err:?}");
}

fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

/// Accept one handshake presenting a `localhost` certificate issued by
/// `testdata/ca.pem`.
async fn localhost_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    let certs = load_pem(&testdata("localhost.pem")).unwrap();
    let key_file = std::fs::File::open(testdata("localhost.key")).unwrap();
    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_file))
        .unwrap()
        .unwrap();
    let config =
        rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .unwrap();
    let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = acceptor.accept(stream).await;
    });
    (addr, handle)
}

async fn handshake(
    verification: Verification,
    ca_file: Option<&Path>,
    tls_server_name: &str,
) -> Result<TlsStream, TlsConnectError> {
    let (addr, server) = localhost_server().await;
    let connector = connector(ca_file, verification).unwrap();
    let tcp_stream = tokio::net::TcpStream::connect(addr).await.unwrap();

    let result = connect(&connector, tls_server_name, tcp_stream).await;
    server.await.unwrap();
    result
}

#[tokio::test]
async fn full_verification_accepts_a_trusted_certificate() {
    let ca = testdata("ca.pem");

    handshake(Verification::Full, Some(&ca), "localhost")
        .await
        .unwrap();
}

#[tokio::test]
async fn full_verification_rejects_an_untrusted_certificate() {
    let err = handshake(Verification::Full, None, "localhost")
        .await
        .unwrap_err();

    assert!(matches!(err, TlsConnectError::Io(_)), "{err:?}");
}

#[tokio::test]
async fn full_verification_rejects_another_name() {
    let ca = testdata("ca.pem");

    let err = handshake(Verification::Full, Some(&ca), "imap.example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, TlsConnectError::Io(_)), "{err:?}");
}

#[tokio::test]
async fn any_name_still_needs_a_trusted_chain() {
    let ca = testdata("ca.pem");

    handshake(Verification::AnyName, Some(&ca), "imap.example.com")
        .await
        .unwrap();

    let err = handshake(Verification::AnyName, None, "imap.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, TlsConnectError::Io(_)), "{err:?}");
}

#[tokio::test]
async fn verification_off_accepts_anything() {
    handshake(Verification::Off, None, "imap.example.com")
        .await
        .unwrap();
}

#[test]
fn verification_off_skips_the_trust_store() {
    let path = std::env::temp_dir().join("imap-tls-rustls-does-not-exist.pem");

    connector(Some(&path), Verification::Off).unwrap();
}
