//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Attribute type values used inside an LSA.
//
// Only the types the routing plane itself depends on are listed here;
// an originator is free to carry attribute types this crate does not know
// about — `deserialise` never fails because of an unrecognised `type`.
//

/// Free-form display name for a node.
pub const ATTR_NODE_NAME: u8 = 1;
/// A peering: `key` is the peer's node ID, `data` is a [`super::attr::PeerData`].
pub const ATTR_PEER: u8 = 2;
/// Marks the LSA as eligible for re-advertisement to further neighbours.
pub const ATTR_ADVERTISE: u8 = 3;

/// Business relationship of a peering, carried in a [`ATTR_PEER`] attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[repr(u8)]
pub enum PeerType {
    EPeer = 1,
    Customer = 2,
    Transit = 3,
    IPeer = 4,
}

impl PeerType {
    pub fn from_u8(v: u8) -> Option<PeerType> {
        match v {
            1 => Some(PeerType::EPeer),
            2 => Some(PeerType::Customer),
            3 => Some(PeerType::Transit),
            4 => Some(PeerType::IPeer),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
