//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

/// Errors that tear a session down.
#[derive(Debug)]
pub enum Error {
    Net(dvpn_net::Error),
    /// A record's type byte or length made no sense.
    Malformed(&'static str),
    /// The peer closed its write side, or we hit EOF mid-record.
    ConnectionClosed,
}

impl Error {
    pub fn log(&self) {
        warn!(error = %self, "session torn down");
    }
}

impl From<dvpn_net::Error> for Error {
    fn from(e: dvpn_net::Error) -> Error {
        Error::Net(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Net(e) => write!(f, "{e}"),
            Error::Malformed(why) => write!(f, "malformed record: {why}"),
            Error::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for Error {}
