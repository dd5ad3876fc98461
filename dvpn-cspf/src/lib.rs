//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-cspf: constrained shortest-path computation with valley-free
// business-relationship policy.
//

pub mod graph;
pub mod spf;

pub use graph::{EffectiveRel, Graph};
pub use spf::{Route, RoutingTree, compute};

#[cfg(test)]
mod tests {
    use super::*;
    use dvpn_id::NodeId;
    use dvpn_lsa::{Lsa, LsaAttr, PeerType};

    fn node(byte: u8) -> NodeId {
        let mut bytes = [0u8; 32];
        bytes[0] = byte;
        NodeId::from_bytes(bytes)
    }

    fn peering(
        from: NodeId,
        to: &NodeId,
        metric: u16,
        ty: PeerType,
    ) -> Lsa {
        Lsa::try_from_attrs(from, vec![LsaAttr::peer(to, metric, ty)]).unwrap()
    }

    #[test]
    fn three_node_customer_chain_goes_all_the_way_up() {
        let a = node(1);
        let b = node(2);
        let c = node(3);

        let lsa_a = peering(a, &b, 1, PeerType::Customer);
        let lsa_b = {
            let attrs = vec![
                LsaAttr::peer(&a, 1, PeerType::Transit),
                LsaAttr::peer(&c, 1, PeerType::Customer),
            ];
            Lsa::try_from_attrs(b, attrs).unwrap()
        };
        let lsa_c = peering(c, &b, 1, PeerType::Transit);

        let lsas = [&lsa_a, &lsa_b, &lsa_c];
        let graph = Graph::from_lsas(lsas.into_iter());

        let tree = compute(&graph, a);
        assert_eq!(tree.get(&b).unwrap().cost, 1);
        assert_eq!(tree.get(&c).unwrap().cost, 2);
        assert_eq!(tree.get(&c).unwrap().next_hop, b);

        let tree_from_c = compute(&graph, c);
        assert_eq!(tree_from_c.get(&b).unwrap().cost, 1);
        assert_eq!(tree_from_c.get(&a).unwrap().cost, 2);
    }

    #[test]
    fn second_peer_hop_is_unreachable() {
        // A -customer-> B -peer(EPEER)-> C -peer(EPEER)-> D
        let a = node(1);
        let b = node(2);
        let c = node(3);
        let d = node(4);

        let lsa_a = peering(a, &b, 1, PeerType::Customer);
        let lsa_b = {
            let attrs = vec![
                LsaAttr::peer(&a, 1, PeerType::Transit),
                LsaAttr::peer(&c, 1, PeerType::EPeer),
            ];
            Lsa::try_from_attrs(b, attrs).unwrap()
        };
        let lsa_c = {
            let attrs = vec![
                LsaAttr::peer(&b, 1, PeerType::EPeer),
                LsaAttr::peer(&d, 1, PeerType::EPeer),
            ];
            Lsa::try_from_attrs(c, attrs).unwrap()
        };
        let lsa_d = peering(d, &c, 1, PeerType::EPeer);

        let lsas = [&lsa_a, &lsa_b, &lsa_c, &lsa_d];
        let graph = Graph::from_lsas(lsas.into_iter());

        let tree = compute(&graph, a);
        assert!(tree.get(&c).is_some());
        assert!(
            tree.get(&d).is_none(),
            "a second peer hop must not be reachable"
        );
    }
}
