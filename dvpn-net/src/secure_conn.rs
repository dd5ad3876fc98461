//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Secure connection: drives a TLS handshake over a connected byte stream and
// exposes one inbound/outbound application-record stream to its owner.
//
// Record framing at this layer is transparent — one write is one TLS
// application record, but the owner is responsible for framing whatever it
// puts inside one (the session layer length-prefixes its own payloads).
//

use std::sync::Arc;

use dvpn_id::NodeId;
use rustls_pki_types::CertificateDer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::{TlsAcceptor, TlsConnector, client, server};

use crate::error::Error;
use crate::tls::HANDSHAKE_TIMEOUT;

pub enum Role {
    Client,
    Server,
}

/// A connected, authenticated TLS session. Holds a split read/write handle;
/// the caller drives `record_send`/`record_recv` directly rather than
/// through callbacks, since async/await already gives a natural call site
/// for "handshake done" and "connection lost" (the end of this function and
/// an `Err` from a subsequent I/O call, respectively).
pub struct SecureConn<S> {
    stream: S,
    role: Role,
    cipher_suite: String,
    peer_ids: Vec<NodeId>,
}

impl SecureConn<client::TlsStream<TcpStream>> {
    /// Connects as a client: completes the handshake, then asks `verify` to
    /// accept or reject the peer based on the fingerprints of its
    /// certificate chain. `verify` rejecting tears the connection down
    /// immediately, before the caller ever sees a `SecureConn`.
    pub async fn connect(
        tcp: TcpStream,
        connector: TlsConnector,
        server_name: rustls_pki_types::ServerName<'static>,
        verify: impl FnOnce(&[NodeId]) -> bool,
    ) -> Result<SecureConn<client::TlsStream<TcpStream>>, Error> {
        let stream = timeout(HANDSHAKE_TIMEOUT, connector.connect(server_name, tcp))
            .await
            .map_err(|_| {
                Error::Transport(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "TLS handshake timed out",
                ))
            })?
            .map_err(Error::Transport)?;

        let candidates = peer_fingerprints(stream.get_ref().1.peer_certificates());
        if !verify(&candidates) {
            return Err(Error::Auth);
        }

        let cipher_suite = describe_cipher_suite(
            stream.get_ref().1.negotiated_cipher_suite(),
        );

        Ok(SecureConn {
            stream,
            role: Role::Client,
            cipher_suite,
            peer_ids: candidates,
        })
    }
}

impl SecureConn<server::TlsStream<TcpStream>> {
    /// Accepts as a server, symmetric to [`SecureConn::connect`].
    pub async fn accept(
        tcp: TcpStream,
        acceptor: TlsAcceptor,
        verify: impl FnOnce(&[NodeId]) -> bool,
    ) -> Result<SecureConn<server::TlsStream<TcpStream>>, Error> {
        let stream = timeout(HANDSHAKE_TIMEOUT, acceptor.accept(tcp))
            .await
            .map_err(|_| {
                Error::Transport(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "TLS handshake timed out",
                ))
            })?
            .map_err(Error::Transport)?;

        let candidates = peer_fingerprints(stream.get_ref().1.peer_certificates());
        if !verify(&candidates) {
            return Err(Error::Auth);
        }

        let cipher_suite = describe_cipher_suite(
            stream.get_ref().1.negotiated_cipher_suite(),
        );

        Ok(SecureConn {
            stream,
            role: Role::Server,
            cipher_suite,
            peer_ids: candidates,
        })
    }
}

impl<S> SecureConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    /// Fingerprints offered during the handshake: the end-entity
    /// certificate first, followed by any role certificates in the chain.
    pub fn peer_ids(&self) -> &[NodeId] {
        &self.peer_ids
    }

    /// Writes one application record. On failure the connection must be
    /// treated as dead; this type does not attempt to retry partial writes.
    pub async fn record_send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.stream.write_all(data).await.map_err(Error::Transport)
    }

    /// Reads up to `buf.len()` bytes of the next application data. Returns
    /// `Ok(0)` on a clean peer close.
    pub async fn record_recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.stream.read(buf).await.map_err(Error::Transport)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn peer_fingerprints(certs: Option<&[CertificateDer<'_>]>) -> Vec<NodeId> {
    let Some(certs) = certs else {
        return Vec::new();
    };
    certs
        .iter()
        .filter_map(|der| NodeId::from_certificate_der(der).ok())
        .collect()
}

fn describe_cipher_suite(
    suite: Option<rustls::SupportedCipherSuite>,
) -> String {
    match suite {
        Some(s) => format!("{:?}", s.suite()),
        None => "unknown".to_string(),
    }
}
