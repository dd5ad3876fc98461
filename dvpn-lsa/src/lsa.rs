//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// The in-memory LSA record.
//

use std::collections::BTreeSet;

use dvpn_id::NodeId;

use crate::attr::LsaAttr;
use crate::error::DecodeError;

/// A link-state advertisement: a node's self-description.
///
/// Immutable after construction — an "edit" produces a new `Lsa`. Shared
/// ownership across Adj-RIBs and Loc-RIB listeners is expressed by wrapping
/// this type in an `Arc` at the call site.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lsa {
    id: NodeId,
    attrs: BTreeSet<LsaAttr>,
}

impl Lsa {
    /// Builds an LSA from an already-deduplicated, pre-sorted attribute set.
    pub fn new(id: NodeId, attrs: BTreeSet<LsaAttr>) -> Lsa {
        Lsa { id, attrs }
    }

    /// Builds an LSA from a list of attributes, rejecting duplicate
    /// `(type, key)` pairs so that locally-originated LSAs can never carry
    /// one (the wire decoder enforces the same rule on received LSAs).
    pub fn try_from_attrs(
        id: NodeId,
        attrs: Vec<LsaAttr>,
    ) -> Result<Lsa, DecodeError> {
        let mut set = BTreeSet::new();
        for attr in attrs {
            let key = (attr.attr_type, attr.key.clone());
            if set.iter().any(|a: &LsaAttr| {
                (a.attr_type, a.key.clone()) == key
            }) {
                return Err(DecodeError::DuplicateAttribute {
                    attr_type: attr.attr_type,
                });
            }
            set.insert(attr);
        }
        Ok(Lsa { id, attrs: set })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn attrs(&self) -> impl Iterator<Item = &LsaAttr> {
        self.attrs.iter()
    }

    pub fn attrs_of_type(
        &self,
        attr_type: u8,
    ) -> impl Iterator<Item = &LsaAttr> {
        self.attrs
            .iter()
            .filter(move |attr| attr.attr_type == attr_type)
    }

    /// Canonical serialisation, used as the basis of "byte-identical"
    /// comparison by the Adj-RIB when deciding whether an update is a
    /// no-op.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        crate::codec::serialise(self)
    }
}

impl std::hash::Hash for Lsa {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical_bytes().hash(state);
    }
}
