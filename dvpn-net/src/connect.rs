//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Outbound dialer: DNS resolution, sequential connect attempts across the
// resolved addresses, and exponential-backoff retry once they're exhausted.
//

use std::net::SocketAddr;
use std::time::Duration;

use dvpn_id::NodeId;
use dvpn_util::Backoff;
use rustls_pki_types::ServerName;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tokio_rustls::{TlsConnector, client};
use tracing::warn;

use crate::error::Error;
use crate::secure_conn::SecureConn;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
pub const BACKOFF_CEILING: Duration = Duration::from_secs(120);

async fn resolve(hostname: &str, port: u16) -> Result<Vec<SocketAddr>, Error> {
    let addrs = lookup_host((hostname, port))
        .await
        .map_err(Error::Transport)?
        .collect::<Vec<_>>();
    Ok(addrs)
}

/// One dial attempt: resolves `hostname`, then tries each address in turn
/// with a per-attempt connect timeout, advancing to the next on any
/// failure. The expected peer fingerprint is known up front, so the
/// handshake's key-ID check compares against that single value.
pub async fn dial_once(
    hostname: &str,
    port: u16,
    connector: TlsConnector,
    server_name: ServerName<'static>,
    expected: NodeId,
) -> Result<SecureConn<client::TlsStream<TcpStream>>, Error> {
    let addrs = resolve(hostname, port).await?;

    for addr in addrs {
        let tcp = match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(error)) => {
                warn!(%addr, %error, "connect failed, trying next address");
                continue;
            }
            Err(_) => {
                warn!(%addr, "connect timed out, trying next address");
                continue;
            }
        };

        match SecureConn::connect(tcp, connector.clone(), server_name.clone(), |candidates| {
            candidates.contains(&expected)
        })
        .await
        {
            Ok(conn) => return Ok(conn),
            Err(error) => {
                error.log();
                continue;
            }
        }
    }

    Err(Error::Transport(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "every resolved address for this peer failed",
    )))
}

/// Dials forever, retrying with exponential backoff (reset after a
/// successful connection) until one attempt succeeds.
pub async fn dial_with_backoff(
    hostname: &str,
    port: u16,
    connector: TlsConnector,
    server_name: ServerName<'static>,
    expected: NodeId,
) -> SecureConn<client::TlsStream<TcpStream>> {
    let mut backoff = Backoff::new(BACKOFF_INITIAL, BACKOFF_CEILING);
    loop {
        match dial_once(hostname, port, connector.clone(), server_name.clone(), expected).await {
            Ok(conn) => return conn,
            Err(error) => {
                error.log();
                let delay = backoff.next();
                warn!(?delay, %hostname, "retrying outbound connection");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
