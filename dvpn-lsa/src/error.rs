//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-lsa decoding errors.
//

use tracing::warn;

/// Errors returned while deserialising an LSA from the wire.
///
/// These never indicate a bug in the decoder itself — they are the expected
/// outcome of feeding it attacker-controlled or truncated bytes, so callers
/// should treat them as ordinary protocol errors rather than panics.
#[derive(Debug, Eq, PartialEq)]
pub enum DecodeError {
    /// `total_len` did not match the number of bytes actually supplied.
    LengthMismatch { declared: usize, actual: usize },
    /// An attribute's key or data would read past the end of the buffer.
    ReadOutOfBounds,
    /// The same `(type, key)` pair appeared twice in the same LSA.
    DuplicateAttribute { attr_type: u8 },
    /// The buffer was shorter than the fixed LSA header (length + node ID).
    Truncated,
}

impl DecodeError {
    pub fn log(&self) {
        warn!(error = %self, "failed to decode LSA");
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "declared length {declared} does not match buffer \
                     length {actual}"
                )
            }
            DecodeError::ReadOutOfBounds => {
                write!(f, "attribute would read past the end of the buffer")
            }
            DecodeError::DuplicateAttribute { attr_type } => {
                write!(f, "duplicate attribute (type={attr_type})")
            }
            DecodeError::Truncated => {
                write!(f, "buffer shorter than the LSA header")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
