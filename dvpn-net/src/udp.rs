//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// LSA query protocol: a UDP topology probe. A client sends a zero-byte
// datagram to a node's overlay address; that node replies with one datagram
// containing its currently-originated LSA.
//

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dvpn_id::NodeId;
use dvpn_lsa::{Lsa, codec};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::warn;

use crate::error::Error;

pub const QUERY_PORT: u16 = 19275;
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DATAGRAM: usize = 65507;

/// Sends a zero-byte probe to `target_addr` and waits for the LSA currently
/// originated by `target_id`.
pub async fn query_lsa(
    target_addr: SocketAddr,
    target_id: NodeId,
) -> Result<Lsa, Error> {
    let socket = UdpSocket::bind("[::]:0").await.map_err(Error::Transport)?;
    socket.connect(target_addr).await.map_err(Error::Transport)?;
    socket.send(&[]).await.map_err(Error::Transport)?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    let n = timeout(QUERY_TIMEOUT, socket.recv(&mut buf))
        .await
        .map_err(|_| {
            Error::Transport(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "topology probe timed out",
            ))
        })?
        .map_err(Error::Transport)?;

    validate_response(&buf[..n], target_id)
}

/// The response must decode as a well-formed LSA and must describe the
/// node that was actually queried; a target answering for someone else (or
/// a spoofed reply) is rejected here.
fn validate_response(raw: &[u8], target_id: NodeId) -> Result<Lsa, Error> {
    let lsa = codec::deserialise(raw).map_err(|e| Error::Protocol(e.to_string()))?;
    if lsa.id() != target_id {
        return Err(Error::Protocol(
            "probe response described a different node".to_string(),
        ));
    }
    Ok(lsa)
}

/// Serves inbound probes forever: every zero-byte datagram gets `lookup`'s
/// answer serialised back to the sender. Anything else — a non-empty
/// datagram, or no locally-originated LSA to answer with — is ignored.
pub async fn serve_queries(
    socket: UdpSocket,
    lookup: impl Fn() -> Option<Arc<Lsa>>,
) -> Result<(), Error> {
    let mut buf = [0u8; 1];
    loop {
        let (n, peer) = socket.recv_from(&mut buf).await.map_err(Error::Transport)?;
        if n != 0 {
            continue;
        }
        let Some(lsa) = lookup() else {
            continue;
        };
        let bytes = codec::serialise(&lsa);
        if let Err(error) = socket.send_to(&bytes, peer).await {
            warn!(%peer, %error, "failed to answer topology probe");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvpn_id::NODE_ID_LEN;

    fn node(byte: u8) -> NodeId {
        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[0] = byte;
        NodeId::from_bytes(bytes)
    }

    #[test]
    fn accepts_response_describing_the_queried_node() {
        let id = node(7);
        let lsa = Lsa::try_from_attrs(id, vec![]).unwrap();
        let bytes = codec::serialise(&lsa);
        let decoded = validate_response(&bytes, id).unwrap();
        assert_eq!(decoded.id(), id);
    }

    #[test]
    fn rejects_response_describing_a_different_node() {
        let lsa = Lsa::try_from_attrs(node(7), vec![]).unwrap();
        let bytes = codec::serialise(&lsa);
        assert!(validate_response(&bytes, node(8)).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(validate_response(&[0xff, 0xff, 0xff], node(1)).is_err());
    }
}
