//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// LSA attributes.
//

use crate::consts::PeerType;

/// Maximum length, in bytes, of an attribute's key or data (§3: `0..32767`).
pub const ATTR_MAX_FIELD_LEN: usize = 0x7fff;

/// A single LSA attribute.
///
/// Ordered by `(type, key)`: attributes without a key (`key: None`) sort
/// before any keyed attribute of the same type.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct LsaAttr {
    pub attr_type: u8,
    pub key: Option<Vec<u8>>,
    pub data: Vec<u8>,
}

impl LsaAttr {
    pub fn new(attr_type: u8, key: Option<Vec<u8>>, data: Vec<u8>) -> LsaAttr {
        LsaAttr {
            attr_type,
            key,
            data,
        }
    }

    /// Builds a [`crate::consts::ATTR_PEER`] attribute advertising a peering
    /// with `peer`, carrying `metric` and `peer_type`.
    pub fn peer(
        peer: &dvpn_id::NodeId,
        metric: u16,
        peer_type: PeerType,
    ) -> LsaAttr {
        let mut data = Vec::with_capacity(4);
        data.extend_from_slice(&metric.to_be_bytes());
        data.push(peer_type.as_u8());
        data.push(0);
        LsaAttr::new(
            crate::consts::ATTR_PEER,
            Some(peer.as_bytes().to_vec()),
            data,
        )
    }

    /// Decodes the `(metric, peer_type)` payload of a
    /// [`crate::consts::ATTR_PEER`] attribute, if this is one.
    pub fn as_peer_data(&self) -> Option<(u16, PeerType)> {
        if self.attr_type != crate::consts::ATTR_PEER || self.data.len() < 4 {
            return None;
        }
        let metric = u16::from_be_bytes([self.data[0], self.data[1]]);
        let peer_type = PeerType::from_u8(self.data[2])?;
        Some((metric, peer_type))
    }
}
