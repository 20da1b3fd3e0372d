use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use registry_browser::{ApiError, AuthConfig, AuthError, RegistryClient, RegistryConfig, TlsMode};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

struct TestPki {
    ca_pem: String,
    leaf_der: CertificateDer<'static>,
    leaf_key: Vec<u8>,
}

fn issue_pki(common_name: &str) -> TestPki {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    ca_params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let leaf_key = KeyPair::generate().unwrap();
    let leaf_params =
        CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()]).unwrap();
    let leaf = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

    TestPki {
        ca_pem: ca_cert.pem(),
        leaf_der: leaf.der().clone(),
        leaf_key: leaf_key.serialize_der(),
    }
}

fn self_signed() -> TestPki {
    let certified =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
            .unwrap();
    TestPki {
        ca_pem: certified.cert.pem(),
        leaf_der: certified.cert.der().clone(),
        leaf_key: certified.key_pair.serialize_der(),
    }
}

fn acceptor(pki: &TestPki) -> TlsAcceptor {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![pki.leaf_der.clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(pki.leaf_key.clone())),
        )
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

/// Serves the token endpoint and the catalog, over TLS when an acceptor is
/// given and plain HTTP otherwise.
async fn spawn_server(acceptor: Option<TlsAcceptor>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                match acceptor {
                    Some(acceptor) => {
                        if let Ok(tls) = acceptor.accept(stream).await {
                            respond(tls).await;
                        }
                    }
                    None => respond(stream).await,
                }
            });
        }
    });

    addr
}

async fn respond<S: AsyncRead + AsyncWrite + Unpin>(mut stream: S) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request.split_whitespace().nth(1).unwrap_or("/");
    let body = if path.starts_with("/auth") {
        r#"{"token":"tls-token"}"#
    } else if path == "/v2/_catalog" {
        r#"{"repositories":["alpine"]}"#
    } else {
        "{}"
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn config(registry: &str, auth: &str, tls: TlsMode) -> RegistryConfig {
    RegistryConfig::new(registry, auth, AuthConfig::new("alice", "wonderland"), tls).unwrap()
}

fn ca_file(pem: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(pem.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn insecure_mode_accepts_certificate_from_unknown_ca() {
    let pki = issue_pki("registry test ca");
    let addr = spawn_server(Some(acceptor(&pki))).await;

    let client = RegistryClient::new(config(
        &format!("https://{}/v2/", addr),
        &format!("https://{}/auth", addr),
        TlsMode::Insecure,
    ))
    .unwrap();

    let repositories = client.list_repositories().await.unwrap();
    assert_eq!(repositories.repositories, vec!["alpine"]);
}

#[tokio::test]
async fn insecure_mode_accepts_self_signed_certificate() {
    let pki = self_signed();
    let addr = spawn_server(Some(acceptor(&pki))).await;

    let client = RegistryClient::new(config(
        &format!("https://{}/v2/", addr),
        &format!("https://{}/auth", addr),
        TlsMode::Insecure,
    ))
    .unwrap();

    let repositories = client.list_repositories().await.unwrap();
    assert_eq!(repositories.repositories, vec!["alpine"]);
}

#[tokio::test]
async fn verified_mode_trusts_the_supplied_ca() {
    let pki = issue_pki("registry test ca");
    let addr = spawn_server(Some(acceptor(&pki))).await;
    let bundle = ca_file(&pki.ca_pem);

    let client = RegistryClient::new(config(
        &format!("https://{}/v2/", addr),
        &format!("https://{}/auth", addr),
        TlsMode::verified_from_file(bundle.path()).unwrap(),
    ))
    .unwrap();

    let repositories = client.list_repositories().await.unwrap();
    assert_eq!(repositories.repositories, vec!["alpine"]);
}

#[tokio::test]
async fn verified_mode_with_unrelated_ca_fails_registry_leg_as_unreachable() {
    let server_pki = issue_pki("registry test ca");
    let unrelated = issue_pki("some other ca");

    let registry = spawn_server(Some(acceptor(&server_pki))).await;
    let auth = spawn_server(None).await;
    let bundle = ca_file(&unrelated.ca_pem);

    let client = RegistryClient::new(config(
        &format!("https://{}/v2/", registry),
        &format!("http://{}/auth", auth),
        TlsMode::verified_from_file(bundle.path()).unwrap(),
    ))
    .unwrap();

    let err = client.list_repositories().await.unwrap_err();
    assert!(matches!(err, ApiError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn verified_mode_with_unrelated_ca_fails_auth_leg_first() {
    let server_pki = issue_pki("registry test ca");
    let unrelated = issue_pki("some other ca");

    let addr = spawn_server(Some(acceptor(&server_pki))).await;
    let bundle = ca_file(&unrelated.ca_pem);

    let client = RegistryClient::new(config(
        &format!("https://{}/v2/", addr),
        &format!("https://{}/auth", addr),
        TlsMode::verified_from_file(bundle.path()).unwrap(),
    ))
    .unwrap();

    let err = client.list_repositories().await.unwrap_err();
    assert!(
        matches!(err, ApiError::AuthFailed(AuthError::Unreachable(_))),
        "got {err:?}"
    );
    assert!(err.is_unreachable());
}
