//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Constrained shortest path computation over the doubled valley-free graph.
//

use std::collections::BTreeMap;

use dvpn_id::NodeId;

use crate::graph::{EffectiveRel, Graph};

/// Which half of a node's doubled state we are in.
///
/// `A` = reachable via an up-only path, may still take the single allowed
/// peer hop. `B` = reachable post-peer (or still purely "down" from the
/// root), may only continue downward.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Sub {
    A,
    B,
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct SubNode {
    pub node: NodeId,
    pub sub: Sub,
}

impl SubNode {
    fn new(node: NodeId, sub: Sub) -> SubNode {
        SubNode { node, sub }
    }
}

#[derive(Clone, Debug)]
struct Vertex {
    id: SubNode,
    cost: u32,
    predecessor: Option<SubNode>,
    first_hop: Option<NodeId>,
}

/// One destination's best route, as materialised out of the shortest-path
/// tree.
#[derive(Clone, Debug)]
pub struct Route {
    pub dest: NodeId,
    pub cost: u32,
    pub next_hop: NodeId,
    /// Full path, from the source node through to `dest` inclusive.
    pub path: Vec<NodeId>,
}

/// A computed routing tree rooted at one source node.
#[derive(Debug, Default)]
pub struct RoutingTree {
    routes: BTreeMap<NodeId, Route>,
}

impl RoutingTree {
    pub fn get(&self, dest: &NodeId) -> Option<&Route> {
        self.routes.get(dest)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Computes the constrained shortest-path tree rooted at `src`.
///
/// Complexity: `O((V + E) log V)`, using a `BTreeMap` keyed by
/// `(cost, sub-node)` as the candidate priority queue (decrease-key is a
/// remove-then-reinsert, same approach as a conventional binary heap here).
pub fn compute(graph: &Graph, src: NodeId) -> RoutingTree {
    let root = SubNode::new(src, Sub::A);
    let root_v = Vertex {
        id: root,
        cost: 0,
        predecessor: None,
        first_hop: None,
    };

    let mut spt: BTreeMap<SubNode, Vertex> = BTreeMap::new();
    let mut cand: BTreeMap<(u32, SubNode), Vertex> = BTreeMap::new();
    cand.insert((0, root), root_v);

    while let Some(((_, vid), vertex)) = cand.pop_first() {
        spt.insert(vid, vertex);
        let vertex = spt.get(&vid).unwrap().clone();

        let mut relax = |to: SubNode, metric: u32| {
            if spt.contains_key(&to) {
                return;
            }

            let distance = vertex.cost.saturating_add(metric);
            let first_hop = if to.node == vertex.id.node {
                vertex.first_hop
            } else {
                vertex.first_hop.or(Some(to.node))
            };

            if let Some((&cand_key, cand_v)) =
                cand.iter_mut().find(|(_, v)| v.id == to)
            {
                match distance.cmp(&cand_v.cost) {
                    std::cmp::Ordering::Less => {
                        cand.remove(&cand_key);
                    }
                    // Equal-cost ties keep the existing (first-found)
                    // parent; a strictly worse path is dropped.
                    std::cmp::Ordering::Equal
                    | std::cmp::Ordering::Greater => return,
                }
            }

            cand.insert(
                (distance, to),
                Vertex {
                    id: to,
                    cost: distance,
                    predecessor: Some(vertex.id),
                    first_hop,
                },
            );
        };

        // A node in sub `a` may drop straight into `b` for free: the up
        // segment of a valley-free path is allowed to be empty, so "all
        // down, no peer hop" has to be reachable without paying for an
        // edge that doesn't exist in the declared topology.
        if vertex.id.sub == Sub::A {
            relax(SubNode::new(vertex.id.node, Sub::B), 0);
        }

        for edge in graph.edges_from(vertex.id.node) {
            let Some(to_sub) = transition(vertex.id.sub, edge.rel) else {
                continue;
            };
            relax(SubNode::new(edge.to, to_sub), edge.metric as u32);
        }
    }

    materialise(src, &spt)
}

/// Valley-free sub-graph transition table. `a` is the up-and-maybe-one-peer-
/// hop half; `b` is the down-only half, entered either by the one allowed
/// peer hop or for free from the same node's `a` (see the `relax` call
/// above).
fn transition(from: Sub, rel: EffectiveRel) -> Option<Sub> {
    match (from, rel) {
        (Sub::A, EffectiveRel::Customer) => Some(Sub::A),
        (Sub::A, EffectiveRel::IPeer) => Some(Sub::A),
        (Sub::A, EffectiveRel::EPeer) => Some(Sub::B),
        (Sub::B, EffectiveRel::Transit) => Some(Sub::B),
        (Sub::B, EffectiveRel::IPeer) => Some(Sub::B),
        _ => None,
    }
}

fn materialise(src: NodeId, spt: &BTreeMap<SubNode, Vertex>) -> RoutingTree {
    let mut best: BTreeMap<NodeId, &Vertex> = BTreeMap::new();
    for vertex in spt.values() {
        if vertex.id.node == src {
            continue;
        }
        best.entry(vertex.id.node)
            .and_modify(|cur| {
                if vertex.cost < cur.cost {
                    *cur = vertex;
                }
            })
            .or_insert(vertex);
    }

    let mut routes = BTreeMap::new();
    for (dest, vertex) in best {
        let Some(next_hop) = vertex.first_hop else {
            continue;
        };
        let path = reconstruct_path(spt, vertex.id);
        routes.insert(
            dest,
            Route {
                dest,
                cost: vertex.cost,
                next_hop,
                path,
            },
        );
    }

    RoutingTree { routes }
}

fn reconstruct_path(
    spt: &BTreeMap<SubNode, Vertex>,
    mut id: SubNode,
) -> Vec<NodeId> {
    let mut path = Vec::new();
    loop {
        path.push(id.node);
        match spt.get(&id).and_then(|v| v.predecessor) {
            Some(pred) => id = pred,
            None => break,
        }
    }
    path.reverse();
    path
}
