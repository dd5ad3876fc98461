//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

use crate::config;

/// Startup-only errors; any of these is fatal (spec's `ConfigError`).
#[derive(Debug)]
pub enum Error {
    Config(config::Error),
    Io(std::io::Error),
    Tls(rustls::Error),
    Identity(String),
}

impl From<config::Error> for Error {
    fn from(e: config::Error) -> Error {
        Error::Config(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Error {
        Error::Tls(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "{e}"),
            Error::Tls(e) => write!(f, "{e}"),
            Error::Identity(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
