//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Loc-RIB: the locally merged, best-LSA-per-node view.
//
// `LocRib` does not own the Adj-RIB-In tables it is fed from — those live
// wherever their owning peer session lives. Each Adj-RIB-In forwards its
// events here (directly, or across a channel if it runs on another task);
// `handle_event` is the single entry point, and is a pure function of its
// arguments plus the current merged state, independent of subscription
// order.
//

use std::collections::BTreeMap;
use std::sync::Arc;

use dvpn_id::NodeId;
use dvpn_lsa::Lsa;

use crate::event::{RibEvent, RibListener};

pub struct LocRib {
    chosen: BTreeMap<NodeId, (NodeId, Arc<Lsa>)>,
    listeners: Vec<RibListener>,
}

impl Default for LocRib {
    fn default() -> LocRib {
        LocRib::new()
    }
}

impl LocRib {
    pub fn new() -> LocRib {
        LocRib {
            chosen: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: RibListener) {
        self.listeners.push(listener);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.chosen.values().map(|(_, lsa)| lsa)
    }

    pub fn owner_of(&self, id: &NodeId) -> Option<NodeId> {
        self.chosen.get(id).map(|(owner, _)| *owner)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Arc<Lsa>> {
        self.chosen.get(id).map(|(_, lsa)| lsa)
    }

    /// Applies one Adj-RIB-In event from `owner`.
    ///
    /// On a deletion that strips away the currently-chosen LSA, `rescan` is
    /// asked to find the best surviving candidate across every *other*
    /// subscribed Adj-RIB-In (lowest owner node ID wins, per the same rule
    /// as `Add`). Passing a rescan closure rather than owning the Adj-RIBs
    /// directly keeps `LocRib` usable regardless of how many tasks the
    /// peer sessions that own those tables are split across.
    pub fn handle_event(
        &mut self,
        owner: NodeId,
        event: RibEvent,
        rescan: impl FnOnce(NodeId) -> Option<(NodeId, Arc<Lsa>)>,
    ) {
        match event {
            RibEvent::Add(lsa) => self.handle_add(owner, lsa),
            RibEvent::Mod(old, new) => self.handle_mod(owner, old, new),
            RibEvent::Del(lsa) => self.handle_del(owner, lsa, rescan),
        }
    }

    fn handle_add(&mut self, owner: NodeId, lsa: Arc<Lsa>) {
        let id = lsa.id();
        match self.chosen.get(&id) {
            None => {
                self.chosen.insert(id, (owner, lsa.clone()));
                self.emit(RibEvent::Add(lsa));
            }
            Some((cur_owner, _)) => {
                if owner < *cur_owner {
                    let (_, old) =
                        self.chosen.insert(id, (owner, lsa.clone())).unwrap();
                    self.emit(RibEvent::Mod(old, lsa));
                }
                // else: a worse (or equal) owner advertised the same node;
                // ignored.
            }
        }
    }

    fn handle_mod(&mut self, owner: NodeId, old: Arc<Lsa>, new: Arc<Lsa>) {
        let id = new.id();
        if let Some((cur_owner, _)) = self.chosen.get(&id) {
            if *cur_owner == owner {
                self.chosen.insert(id, (owner, new.clone()));
                self.emit(RibEvent::Mod(old, new));
            }
        }
    }

    fn handle_del(
        &mut self,
        owner: NodeId,
        lsa: Arc<Lsa>,
        rescan: impl FnOnce(NodeId) -> Option<(NodeId, Arc<Lsa>)>,
    ) {
        let id = lsa.id();
        let Some((cur_owner, _)) = self.chosen.get(&id) else {
            return;
        };
        if *cur_owner != owner {
            return;
        }

        match rescan(id) {
            Some((new_owner, new_lsa)) => {
                let (_, old) = self
                    .chosen
                    .insert(id, (new_owner, new_lsa.clone()))
                    .unwrap();
                self.emit(RibEvent::Mod(old, new_lsa));
            }
            None => {
                self.chosen.remove(&id);
                self.emit(RibEvent::Del(lsa));
            }
        }
    }

    fn emit(&self, event: RibEvent) {
        for listener in &self.listeners {
            listener(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn node(byte: u8) -> NodeId {
        let mut bytes = [0u8; 32];
        bytes[0] = byte;
        NodeId::from_bytes(bytes)
    }

    fn lsa(id: NodeId) -> Arc<Lsa> {
        Arc::new(Lsa::try_from_attrs(id, vec![]).unwrap())
    }

    #[test]
    fn lowest_owner_wins_and_substitutes_on_deletion() {
        // Owners N1 < N2 both hold an LSA for node X; Loc-RIB reports N1's
        // LSA. Deleting from N1's table emits `mod` to N2's LSA.
        let n1 = node(1);
        let n2 = node(2);
        let x = node(10);

        let mut loc = LocRib::new();
        let events: Arc<Mutex<Vec<RibEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events2 = events.clone();
        loc.subscribe(Box::new(move |e| events2.lock().unwrap().push(e)));

        let lsa_from_n1 = lsa(x);
        let lsa_from_n2 = lsa(x);

        loc.handle_event(n2, RibEvent::Add(lsa_from_n2.clone()), |_| None);
        loc.handle_event(n1, RibEvent::Add(lsa_from_n1.clone()), |_| None);

        assert_eq!(loc.owner_of(&x), Some(n1));

        // Deleting N1's copy should surface N2's as a substitute (`mod`,
        // not `del`).
        loc.handle_event(n1, RibEvent::Del(lsa_from_n1), |id| {
            assert_eq!(id, x);
            Some((n2, lsa_from_n2.clone()))
        });

        assert_eq!(loc.owner_of(&x), Some(n2));
        let evs = events.lock().unwrap();
        assert!(matches!(evs.last().unwrap(), RibEvent::Mod(..)));
    }

    #[test]
    fn deletion_without_substitute_emits_del() {
        let n1 = node(1);
        let x = node(10);
        let mut loc = LocRib::new();
        let l = lsa(x);
        loc.handle_event(n1, RibEvent::Add(l.clone()), |_| None);
        loc.handle_event(n1, RibEvent::Del(l), |_| None);
        assert_eq!(loc.owner_of(&x), None);
    }

    #[test]
    fn higher_owner_add_is_ignored() {
        let n1 = node(1);
        let n2 = node(2);
        let x = node(10);
        let mut loc = LocRib::new();
        loc.handle_event(n1, RibEvent::Add(lsa(x)), |_| None);
        loc.handle_event(n2, RibEvent::Add(lsa(x)), |_| None);
        assert_eq!(loc.owner_of(&x), Some(n1));
    }

    #[test]
    fn mod_from_non_owner_is_ignored() {
        let n1 = node(1);
        let n2 = node(2);
        let x = node(10);
        let mut loc = LocRib::new();
        let l1 = lsa(x);
        loc.handle_event(n1, RibEvent::Add(l1.clone()), |_| None);
        loc.handle_event(n2, RibEvent::Mod(lsa(x), lsa(x)), |_| None);
        // Still N1's original LSA.
        assert_eq!(loc.owner_of(&x), Some(n1));
    }
}
