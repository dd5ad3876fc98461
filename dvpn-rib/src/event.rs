//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;

use dvpn_lsa::Lsa;

/// An update emitted by an Adj-RIB or the Loc-RIB.
#[derive(Clone, Debug)]
pub enum RibEvent {
    Add(Arc<Lsa>),
    Mod(Arc<Lsa>, Arc<Lsa>),
    Del(Arc<Lsa>),
}

impl RibEvent {
    /// The node ID the event pertains to.
    pub fn node_id(&self) -> dvpn_id::NodeId {
        match self {
            RibEvent::Add(lsa) | RibEvent::Del(lsa) => lsa.id(),
            RibEvent::Mod(_, new) => new.id(),
        }
    }
}

pub type RibListener = Box<dyn Fn(RibEvent) + Send + Sync>;
