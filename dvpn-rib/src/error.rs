//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

/// Errors raised by an Adj-RIB or the Loc-RIB.
#[derive(Debug)]
pub enum Error {
    /// A listener tried to mutate the RIB it is currently being called back
    /// from. Callbacks may observe the RIB but never re-enter it.
    Reentrant,
}

impl Error {
    pub fn log(&self) {
        warn!(error = %self, "RIB operation rejected");
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Reentrant => {
                write!(f, "re-entrant mutation of RIB from within a listener callback")
            }
        }
    }
}

impl std::error::Error for Error {}
