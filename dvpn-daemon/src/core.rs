//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// The single task that owns every Adj-RIB-In, the Loc-RIB they merge into,
// and the CSPF tree recomputed from it. Nothing outside this module ever
// mutates an Adj-RIB or the Loc-RIB directly — peer sessions only ever
// deliver events into it.
//

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use dvpn_cspf::{Graph, RoutingTree, compute};
use dvpn_id::NodeId;
use dvpn_lsa::Lsa;
use dvpn_rib::{AdjRibTable, LocRib, RibEvent};
use tracing::debug;

pub struct Core {
    local_id: NodeId,
    peers: BTreeMap<NodeId, AdjRibTable>,
    loc_rib: LocRib,
    pending: Arc<Mutex<VecDeque<RibEvent>>>,
    tree: Option<RoutingTree>,
}

impl Core {
    pub fn new(local_id: NodeId) -> Core {
        Core {
            local_id,
            peers: BTreeMap::new(),
            loc_rib: LocRib::new(),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            tree: None,
        }
    }

    pub fn tree(&self) -> Option<&RoutingTree> {
        self.tree.as_ref()
    }

    /// Applies an LSA received from `from` to that peer's Adj-RIB-In, then
    /// lets the change ripple through the Loc-RIB and a CSPF recompute.
    pub fn handle_lsa(&mut self, from: NodeId, lsa: Arc<Lsa>) {
        if let Err(error) = self.adj_rib_mut(from).add_lsa(lsa) {
            error.log();
            return;
        }
        self.drain_to_loc_rib(from);
    }

    /// A peer session died: its whole Adj-RIB-In is withdrawn.
    pub fn handle_peer_down(&mut self, peer: NodeId) {
        if let Some(table) = self.peers.get_mut(&peer) {
            if let Err(error) = table.flush() {
                error.log();
                return;
            }
        }
        self.drain_to_loc_rib(peer);
    }

    fn adj_rib_mut(&mut self, peer: NodeId) -> &mut AdjRibTable {
        self.peers.entry(peer).or_insert_with(|| {
            let mut table = AdjRibTable::new(peer);
            let pending = self.pending.clone();
            table.subscribe(Box::new(move |event| {
                pending.lock().unwrap().push_back(event);
            }));
            table
        })
    }

    fn drain_to_loc_rib(&mut self, owner: NodeId) {
        let events: Vec<RibEvent> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain(..).collect()
        };
        if events.is_empty() {
            return;
        }

        let peers = &self.peers;
        for event in events {
            self.loc_rib.handle_event(owner, event, |id| {
                peers
                    .iter()
                    .filter(|(p, _)| **p != owner)
                    .filter_map(|(p, table)| table.get(&id).map(|lsa| (*p, lsa.clone())))
                    .min_by_key(|(p, _)| *p)
            });
        }

        self.recompute_cspf();
    }

    fn recompute_cspf(&mut self) {
        let lsas: Vec<Arc<Lsa>> = self.loc_rib.iter().cloned().collect();
        let graph = Graph::from_lsas(lsas.iter().map(|lsa| lsa.as_ref()));
        let tree = compute(&graph, self.local_id);
        debug!(routes = tree.len(), "recomputed routing tree");
        self.tree = Some(tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvpn_lsa::{LsaAttr, PeerType};

    fn node(byte: u8) -> NodeId {
        let mut bytes = [0u8; 32];
        bytes[0] = byte;
        NodeId::from_bytes(bytes)
    }

    #[test]
    fn lsa_from_one_peer_produces_a_route() {
        let a = node(1);
        let b = node(2);
        let mut core = Core::new(a);

        let lsa = Arc::new(
            Lsa::try_from_attrs(b, vec![LsaAttr::peer(&a, 1, PeerType::Transit)]).unwrap(),
        );
        core.handle_lsa(b, lsa);

        let tree = core.tree().unwrap();
        assert_eq!(tree.get(&b).unwrap().cost, 1);
    }

    #[test]
    fn peer_down_withdraws_its_routes() {
        let a = node(1);
        let b = node(2);
        let mut core = Core::new(a);

        let lsa = Arc::new(
            Lsa::try_from_attrs(b, vec![LsaAttr::peer(&a, 1, PeerType::Transit)]).unwrap(),
        );
        core.handle_lsa(b, lsa);
        assert!(core.tree().unwrap().get(&b).is_some());

        core.handle_peer_down(b);
        assert!(core.tree().unwrap().get(&b).is_none());
    }
}
