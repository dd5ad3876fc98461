//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Listen socket: accepts inbound connections and binds each one to a
// configured listen entry by the fingerprint it presents during the TLS
// handshake.
//

use std::cell::Cell;
use std::sync::Arc;

use dvpn_id::NodeId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::{TlsAcceptor, server};
use tracing::warn;

use crate::error::Error;
use crate::secure_conn::SecureConn;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    Fingerprint(NodeId),
    Wildcard,
}

/// One configured acceptance rule. `new_conn` runs after the fingerprint
/// match and may still refuse the connection (e.g. a quota).
pub struct ListenEntry {
    pub name: String,
    pub kind: EntryKind,
    pub new_conn: Box<dyn Fn() -> bool + Send + Sync>,
}

/// An ordered collection of [`ListenEntry`]. A wildcard entry, if present,
/// should be last, but matching does not depend on this: every exact
/// fingerprint is tried before the wildcard regardless of position.
#[derive(Default)]
pub struct ListenTable {
    entries: Vec<ListenEntry>,
}

impl ListenTable {
    pub fn new() -> ListenTable {
        ListenTable::default()
    }

    pub fn push(&mut self, entry: ListenEntry) {
        self.entries.push(entry);
    }

    /// Candidates are tried in order; the first one with an exact-fingerprint
    /// entry wins. Only if none of them match anything is the wildcard (if
    /// any) tried.
    fn find(&self, candidates: &[NodeId]) -> Option<&ListenEntry> {
        for id in candidates {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|e| e.kind == EntryKind::Fingerprint(*id))
            {
                return Some(entry);
            }
        }
        self.entries.iter().find(|e| e.kind == EntryKind::Wildcard)
    }
}

/// Performs the TLS handshake for one accepted TCP connection and matches
/// it against `table`. Returns the matched entry's name alongside the
/// established connection.
pub async fn accept_one(
    tcp: TcpStream,
    acceptor: TlsAcceptor,
    table: &ListenTable,
) -> Result<(String, SecureConn<server::TlsStream<TcpStream>>), Error> {
    let matched: Cell<Option<String>> = Cell::new(None);

    let conn = SecureConn::accept(tcp, acceptor, |candidates| {
        match table.find(candidates) {
            Some(entry) if (entry.new_conn)() => {
                matched.set(Some(entry.name.clone()));
                true
            }
            _ => false,
        }
    })
    .await?;

    let name = matched.into_inner().ok_or(Error::Auth)?;
    Ok((name, conn))
}

/// Runs the accept loop forever, handing each matched connection to
/// `accepted`. A failed handshake or an unmatched fingerprint is logged and
/// dropped; it never stops the loop.
pub async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    table: Arc<ListenTable>,
    accepted: mpsc::Sender<(String, SecureConn<server::TlsStream<TcpStream>>)>,
) {
    loop {
        let (tcp, peer_addr) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                Error::Transport(e).log();
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let table = table.clone();
        let accepted = accepted.clone();
        tokio::spawn(async move {
            match accept_one(tcp, acceptor, &table).await {
                Ok((name, conn)) => {
                    if accepted.send((name, conn)).await.is_err() {
                        warn!("listen socket owner dropped its receiver");
                    }
                }
                Err(error) => {
                    error.log();
                    warn!(%peer_addr, "rejected inbound connection");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(byte: u8) -> NodeId {
        let mut bytes = [0u8; 32];
        bytes[0] = byte;
        NodeId::from_bytes(bytes)
    }

    fn entry(name: &str, kind: EntryKind) -> ListenEntry {
        ListenEntry {
            name: name.to_string(),
            kind,
            new_conn: Box::new(|| true),
        }
    }

    #[test]
    fn exact_fingerprint_wins_over_wildcard() {
        let f1 = node(1);
        let f2 = node(2);
        let mut table = ListenTable::new();
        table.push(entry("alice", EntryKind::Fingerprint(f1)));
        table.push(entry("guest", EntryKind::Wildcard));

        assert_eq!(table.find(&[f1]).map(|e| e.name.as_str()), Some("alice"));
        assert_eq!(table.find(&[f2]).map(|e| e.name.as_str()), Some("guest"));
        assert_eq!(table.find(&[]).map(|e| e.name.as_str()), Some("guest"));
    }

    #[test]
    fn no_match_without_a_wildcard_is_rejected() {
        let f1 = node(1);
        let f2 = node(2);
        let mut table = ListenTable::new();
        table.push(entry("alice", EntryKind::Fingerprint(f1)));

        assert!(table.find(&[f2]).is_none());
    }

    #[test]
    fn new_conn_hook_can_still_refuse_a_matched_entry() {
        let f1 = node(1);
        let mut table = ListenTable::new();
        table.push(ListenEntry {
            name: "alice".to_string(),
            kind: EntryKind::Fingerprint(f1),
            new_conn: Box::new(|| false),
        });

        // `find` itself doesn't run `new_conn` (that's done by the caller in
        // `accept_one`); this test documents that contract.
        assert!(table.find(&[f1]).is_some());
        assert!(!(table.find(&[f1]).unwrap().new_conn)());
    }
}
