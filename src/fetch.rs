use crate::chain::PeerCertificate;
use crate::encoding::decode_certificates;
use crate::error::{Error, Result};
use crate::types::{Target, TlsOptions};
use log::{debug, info, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// Accepts whatever the peer presents. Signatures over the handshake are
/// still checked so the session itself is sound.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Connects to `target`, completes a TLS handshake with SNI set to the
/// target's domain and returns the peer chain in presentation order.
pub fn fetch_peer_chain(target: &Target, tls: &TlsOptions) -> Result<Vec<PeerCertificate>> {
    let server_name = ServerName::try_from(target.domain.clone())
        .map_err(|e| Error::DnsName(format!("Invalid DNS name '{}': {}", target.domain, e)))?;

    let config = client_config(tls)?;
    let mut conn = ClientConnection::new(Arc::new(config), server_name)
        .map_err(|e| Error::Tls(format!("Failed to create TLS connection: {}", e)))?;

    let addr = target.address();
    let mut sock = connect(&addr, tls.timeout)?;
    sock.set_read_timeout(Some(tls.timeout))?;
    sock.set_write_timeout(Some(tls.timeout))?;

    while conn.is_handshaking() {
        conn.complete_io(&mut sock)
            .map_err(|e| handshake_error(e, &addr, tls.timeout))?;
    }
    flush_tls(&mut conn, &mut sock).map_err(|e| handshake_error(e, &addr, tls.timeout))?;

    info!(
        "Handshake with {} (SNI {}) complete: {:?}, {:?}",
        addr,
        target.domain,
        conn.protocol_version(),
        conn.negotiated_cipher_suite().map(|s| s.suite())
    );

    let raw_certs: Vec<Vec<u8>> = conn
        .peer_certificates()
        .map(|certs| certs.iter().map(|c| c.to_vec()).collect())
        .unwrap_or_default();
    debug!("Peer presented {} certificate(s)", raw_certs.len());

    conn.send_close_notify();
    flush_tls(&mut conn, &mut sock).map_err(|e| Error::Close(e.to_string()))?;

    raw_certs.into_iter().map(PeerCertificate::from_der).collect()
}

fn client_config(tls: &TlsOptions) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let config = if tls.insecure_skip_verify {
        warn!("Certificate verification is disabled; the peer is not authenticated");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
            .with_no_client_auth()
    } else {
        builder
            .with_root_certificates(root_store(tls)?)
            .with_no_client_auth()
    };

    Ok(config)
}

fn root_store(tls: &TlsOptions) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        warn!("Failed to load a platform root certificate: {}", err);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(
        "Loaded {} platform root certificate(s), ignored {}",
        added, ignored
    );

    for path in &tls.ca_files {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("Cannot read CA file {}: {}", path.display(), e))
        })?;
        for der in decode_certificates(&text)? {
            roots.add(CertificateDer::from(der))?;
        }
        debug!("Added trust anchors from {}", path.display());
    }

    if roots.is_empty() {
        warn!("No trusted root certificates available; verification will fail");
    }
    Ok(roots)
}

/// Tries every resolved address in turn, each bounded by `timeout`.
fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| Error::Connection(format!("Failed to resolve {}: {}", addr, e)))?
        .collect();

    let mut last_err = None;
    for sock_addr in &addrs {
        debug!("Connecting to {}", sock_addr);
        match TcpStream::connect_timeout(sock_addr, timeout) {
            Ok(sock) => return Ok(sock),
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) => Err(connect_error(e, addr, timeout)),
        None => Err(Error::Connection(format!("No addresses found for {}", addr))),
    }
}

fn connect_error(err: io::Error, addr: &str, timeout: Duration) -> Error {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout {
            addr: addr.to_string(),
            timeout,
        },
        _ => Error::Connection(format!("Failed to connect to {}: {}", addr, err)),
    }
}

fn handshake_error(err: io::Error, addr: &str, timeout: Duration) -> Error {
    if let Some(tls_err) = err.get_ref().and_then(|e| e.downcast_ref::<rustls::Error>()) {
        return Error::Tls(format!("Handshake with {} failed: {}", addr, tls_err));
    }
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout {
            addr: addr.to_string(),
            timeout,
        },
        _ => Error::Tls(format!("Handshake with {} failed: {}", addr, err)),
    }
}

fn flush_tls(conn: &mut ClientConnection, sock: &mut TcpStream) -> io::Result<()> {
    while conn.wants_write() {
        conn.write_tls(sock)?;
    }
    sock.flush()
}
