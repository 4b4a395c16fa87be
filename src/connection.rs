//! IMAP connection and TLS helpers
//!
//! Provides the low-level `connect()` and `select()` functions used by
//! [`Session`](crate::Session). The transport is secured according to
//! the account's [`Security`] mode before logging in.

use crate::config::{AccountConfig, Security};
use crate::error::{Error, Result};
use futures::io::{AsyncRead, AsyncWrite};
use rustls::pki_types::ServerName;
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info};

/// Any byte stream an IMAP session can run over.
pub trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

impl<T> ImapStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

/// An authenticated IMAP session over a TLS or plaintext stream.
pub type ImapSession = async_imap::Session<Box<dyn ImapStream>>;

/// Build a TLS connector.
///
/// Certificates are checked against the Mozilla root store unless
/// `accept_invalid_certs` is set, in which case any certificate is
/// accepted.
fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| Error::Tls(e.to_string()))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

async fn tls_handshake(config: &AccountConfig, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let connector = tls_connector(config.accept_invalid_certs)?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| Error::Tls(e.to_string()))
}

/// Open a fresh IMAP session.
///
/// Connects to `config.host:config.port` via TCP, secures the stream
/// (implicit TLS, STARTTLS, or nothing), and logs in with the
/// account's address and password. A single attempt is made.
pub async fn connect(config: &AccountConfig) -> Result<ImapSession> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!("Connecting to IMAP server at {} ({:?})", addr, config.security);

    let tcp_stream = TcpStream::connect(&addr).await?;

    let stream: Box<dyn ImapStream> = match config.security {
        Security::Tls => Box::new(tls_handshake(config, tcp_stream).await?.compat()),
        Security::StartTls => {
            let mut client = async_imap::Client::new(tcp_stream.compat());
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;

            let inner = client.into_inner().into_inner();
            Box::new(tls_handshake(config, inner).await?.compat())
        }
        Security::Plain => Box::new(tcp_stream.compat()),
    };

    let session = async_imap::Client::new(stream)
        .login(&config.email_address, &config.password)
        .await
        .map_err(|(e, _)| Error::Imap(format!("Login failed: {e}")))?;

    info!("Connected to {} as {}", addr, config.email_address);
    Ok(session)
}

/// SELECT a mailbox on an existing session.
pub async fn select(session: &mut ImapSession, mailbox: &str) -> Result<()> {
    session
        .select(mailbox)
        .await
        .map_err(|e| Error::Imap(format!("Failed to select {mailbox}: {e}")))?;
    Ok(())
}

/// Certificate verifier that accepts all certificates
/// (for local servers with self-signed certs).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
