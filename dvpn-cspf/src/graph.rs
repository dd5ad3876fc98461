//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Building the topology graph out of Loc-RIB contents.
//

use std::collections::BTreeMap;

use dvpn_id::NodeId;
use dvpn_lsa::{Lsa, PeerType};

/// The business relationship effective on a directed edge, after
/// canonicalisation of both ends' declarations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EffectiveRel {
    Customer,
    Transit,
    EPeer,
    IPeer,
}

fn canonicalise(fwd: PeerType, rev: PeerType) -> EffectiveRel {
    use PeerType::*;
    if matches!(fwd, IPeer) && matches!(rev, IPeer) {
        return EffectiveRel::IPeer;
    }
    let fwd_up = matches!(fwd, Customer | IPeer);
    let rev_down_from_fwd = matches!(rev, Transit | IPeer);
    if fwd_up && rev_down_from_fwd {
        return EffectiveRel::Customer;
    }
    let fwd_down = matches!(fwd, Transit | IPeer);
    let rev_up_from_fwd = matches!(rev, Customer | IPeer);
    if fwd_down && rev_up_from_fwd {
        return EffectiveRel::Transit;
    }
    EffectiveRel::EPeer
}

#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub to: NodeId,
    pub metric: u16,
    pub rel: EffectiveRel,
}

/// The directed, valley-free-annotated topology graph.
#[derive(Debug, Default)]
pub struct Graph {
    edges: BTreeMap<NodeId, Vec<Edge>>,
}

impl Graph {
    /// Builds a graph from every LSA currently in the Loc-RIB.
    ///
    /// An edge is admitted only if both `u` and `v` declared a peering with
    /// each other; a half-declared peering is dropped.
    pub fn from_lsas<'a>(lsas: impl Iterator<Item = &'a Lsa>) -> Graph {
        // declared[(u, v)] = (metric, peer_type) as advertised by u's LSA.
        let mut declared: BTreeMap<(NodeId, NodeId), (u16, PeerType)> =
            BTreeMap::new();

        for lsa in lsas {
            let u = lsa.id();
            for attr in lsa.attrs_of_type(dvpn_lsa::consts::ATTR_PEER) {
                let Some(v_bytes) = attr.key.as_ref() else {
                    continue;
                };
                let Ok(v_arr) = <[u8; 32]>::try_from(v_bytes.as_slice())
                else {
                    continue;
                };
                let v = NodeId::from_bytes(v_arr);
                if let Some((metric, peer_type)) = attr.as_peer_data() {
                    declared.insert((u, v), (metric, peer_type));
                }
            }
        }

        let mut edges: BTreeMap<NodeId, Vec<Edge>> = BTreeMap::new();
        for (&(u, v), &(metric, fwd_type)) in declared.iter() {
            let Some(&(_, rev_type)) = declared.get(&(v, u)) else {
                continue;
            };
            let rel = canonicalise(fwd_type, rev_type);
            edges.entry(u).or_default().push(Edge { to: v, metric, rel });
        }

        Graph { edges }
    }

    pub fn edges_from(&self, node: NodeId) -> &[Edge] {
        self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvpn_lsa::LsaAttr;

    fn node(byte: u8) -> NodeId {
        let mut bytes = [0u8; 32];
        bytes[0] = byte;
        NodeId::from_bytes(bytes)
    }

    #[test]
    fn half_declared_peering_is_dropped() {
        let a = node(1);
        let b = node(2);
        let lsa_a =
            Lsa::try_from_attrs(a, vec![LsaAttr::peer(&b, 1, PeerType::Customer)])
                .unwrap();
        // b never declares a.
        let graph = Graph::from_lsas([&lsa_a].into_iter());
        assert!(graph.edges_from(a).is_empty());
    }

    #[test]
    fn symmetric_declaration_is_admitted() {
        let a = node(1);
        let b = node(2);
        let lsa_a =
            Lsa::try_from_attrs(a, vec![LsaAttr::peer(&b, 1, PeerType::Customer)])
                .unwrap();
        let lsa_b =
            Lsa::try_from_attrs(b, vec![LsaAttr::peer(&a, 1, PeerType::Transit)])
                .unwrap();
        let graph = Graph::from_lsas([&lsa_a, &lsa_b].into_iter());
        let edges = graph.edges_from(a);
        assert_eq!(edges.len(), 1);
        assert!(matches!(edges[0].rel, EffectiveRel::Customer));
    }
}
