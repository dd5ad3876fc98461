//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-net: TLS transport, the inbound listen table, the outbound dialer,
// and the UDP topology-probe protocol.
//

pub mod connect;
pub mod error;
pub mod listen;
pub mod secure_conn;
pub mod tls;
pub mod udp;

pub use connect::{dial_once, dial_with_backoff};
pub use error::Error;
pub use listen::{EntryKind, ListenEntry, ListenTable, accept_loop, accept_one};
pub use secure_conn::{Role, SecureConn};
pub use udp::{query_lsa, serve_queries};
