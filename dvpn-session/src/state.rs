//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// The session's own lifecycle states and the events that move it between
// them. `Dialing`/`TlsHandshake` are driven by `dvpn_net::connect`/`listen`
// before a `Session` is ever constructed — a `Session` starts at
// `KeyVerified`, once those have already produced an authenticated
// connection, and its own loop only ever runs forward from there.
//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Dialing,
    TlsHandshake,
    KeyVerified,
    Connected,
    Dead,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionEvent {
    HandshakeDone,
    RxTimeout,
    SendError,
    PeerClosed,
    Cancel,
}
