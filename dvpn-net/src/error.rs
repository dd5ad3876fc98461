//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Errors raised by the transport layer (secure connections, listen socket,
// outbound dialer, topology probe).
//

use tracing::{error, warn};

#[derive(Debug)]
pub enum Error {
    /// Malformed LSA, truncated record, duplicate attribute: the session
    /// carrying it is killed, not retried.
    Protocol(String),
    /// No listen entry matched the candidate fingerprints, or the one
    /// fingerprint an outbound dial expected was not presented.
    Auth,
    /// Connect refused, handshake failed, write error, rx timeout: the
    /// session dies; outbound dials get a retry with backoff, inbound
    /// connections just close.
    Transport(std::io::Error),
    /// fd or tunnel-registration exhaustion: the connection is refused or
    /// killed, the rest of the event loop keeps running.
    Resource(String),
}

impl Error {
    pub fn log(&self) {
        match self {
            Error::Protocol(msg) => warn!(%msg, "protocol error, killing session"),
            Error::Auth => warn!("peer fingerprint not accepted"),
            Error::Transport(io) => warn!(error = %io, "transport error"),
            Error::Resource(msg) => error!(%msg, "resource exhausted"),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Auth => write!(f, "fingerprint not accepted"),
            Error::Transport(io) => write!(f, "transport error: {io}"),
            Error::Resource(msg) => write!(f, "resource error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Error {
        Error::Transport(io)
    }
}
