//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-id: node identity derivation and IPv6 address mapping.
//
// A node's identity is the SHA-256 fingerprint of the DER-encoded subject
// public key of its X.509 certificate. It never changes once a node is
// provisioned and is used both as the routing-plane key and as the source
// of the node's overlay IPv6 addresses.
//

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const NODE_ID_LEN: usize = 32;

/// The 32-byte fingerprint of a node's public key.
///
/// Ordered lexicographically over its bytes; this ordering is load-bearing
/// for Loc-RIB tie-breaking (lowest owner wins) and for picking a canonical
/// direction when combining both ends' declared peering into one edge.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    pub const fn from_bytes(bytes: [u8; NODE_ID_LEN]) -> NodeId {
        NodeId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// Derives a node ID from the DER encoding of an X.509
    /// SubjectPublicKeyInfo structure.
    pub fn from_der_public_key(spki_der: &[u8]) -> NodeId {
        let digest = Sha256::digest(spki_der);
        NodeId(digest.into())
    }

    /// Derives a node ID from a full DER-encoded X.509 certificate by
    /// extracting and hashing its SubjectPublicKeyInfo.
    pub fn from_certificate_der(
        cert_der: &[u8],
    ) -> Result<NodeId, x509_parser::error::X509Error> {
        use x509_parser::prelude::*;

        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|_| x509_parser::error::X509Error::InvalidCertificate)?;
        Ok(NodeId::from_der_public_key(
            cert.public_key().raw,
        ))
    }

    /// Global overlay address: fixed `2001:0000::/32` prefix followed by
    /// the first 12 bytes of the node ID.
    ///
    /// The exact byte-level mapping is an external constant not specified
    /// by the routing protocol itself (see DESIGN.md, Open Question i); this
    /// is the scheme this implementation commits to.
    pub fn to_ipv6_global(&self) -> std::net::Ipv6Addr {
        let mut octets = [0u8; 16];
        octets[0] = 0x20;
        octets[1] = 0x01;
        octets[4..16].copy_from_slice(&self.0[0..12]);
        std::net::Ipv6Addr::from(octets)
    }

    /// Link-local overlay address: fixed `fe80::/64` prefix followed by the
    /// first 10 bytes of the node ID.
    pub fn to_ipv6_link_local(&self) -> std::net::Ipv6Addr {
        let mut octets = [0u8; 16];
        octets[0] = 0xfe;
        octets[1] = 0x80;
        octets[6..16].copy_from_slice(&self.0[0..10]);
        std::net::Ipv6Addr::from(octets)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl From<[u8; NODE_ID_LEN]> for NodeId {
    fn from(bytes: [u8; NODE_ID_LEN]) -> NodeId {
        NodeId(bytes)
    }
}

/// Error returned by [`NodeId`]'s [`std::str::FromStr`] impl.
#[derive(Debug, Eq, PartialEq)]
pub struct ParseNodeIdError;

impl fmt::Display for ParseNodeIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {NODE_ID_LEN} colon- or bare-hex-encoded bytes")
    }
}

impl std::error::Error for ParseNodeIdError {}

/// Parses the colon-separated hex form produced by [`NodeId`]'s `Display`,
/// or the same bytes with the colons omitted.
impl std::str::FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<NodeId, ParseNodeIdError> {
        let hex: String = s.chars().filter(|c| *c != ':').collect();
        if hex.len() != NODE_ID_LEN * 2 {
            return Err(ParseNodeIdError);
        }
        let mut bytes = [0u8; NODE_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseNodeIdError)?;
        }
        Ok(NodeId(bytes))
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_colon_separated_hex() {
        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[0] = 0xab;
        bytes[1] = 0x01;
        bytes[31] = 0xff;
        let id = NodeId::from_bytes(bytes);
        let s = id.to_string();
        assert!(s.starts_with("ab:01:"));
        assert!(s.ends_with(":ff"));
        assert_eq!(s.matches(':').count(), NODE_ID_LEN - 1);
    }

    #[test]
    fn parses_its_own_display_output() {
        let id = NodeId::from_bytes([0x42; NODE_ID_LEN]);
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("ab:cd".parse::<NodeId>().is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = NodeId::from_bytes([0u8; NODE_ID_LEN]);
        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[0] = 1;
        let b = NodeId::from_bytes(bytes);
        assert!(a < b);
    }

    #[test]
    fn global_address_carries_fixed_prefix() {
        let id = NodeId::from_bytes([0x42; NODE_ID_LEN]);
        let addr = id.to_ipv6_global();
        let seg = addr.segments();
        assert_eq!(seg[0], 0x2001);
        assert_eq!(seg[1], 0x0000);
    }

    #[test]
    fn link_local_address_carries_fixed_prefix() {
        let id = NodeId::from_bytes([0x42; NODE_ID_LEN]);
        let addr = id.to_ipv6_link_local();
        let seg = addr.segments();
        assert_eq!(seg[0], 0xfe80);
        assert_eq!(seg[1], 0x0000);
        assert_eq!(seg[2], 0x0000);
    }

    #[test]
    fn from_der_public_key_is_sha256() {
        let spki = b"fake-der-encoded-spki";
        let id = NodeId::from_der_public_key(spki);
        let expected: [u8; 32] = Sha256::digest(spki).into();
        assert_eq!(id.as_bytes(), &expected);
    }
}
