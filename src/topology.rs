use std::collections::{HashMap, HashSet};

use petgraph::{
    algo::{all_simple_paths, astar},
    graph::{DiGraph, NodeIndex},
};

use crate::{index::RelationshipIndex, relationship::RelType};

/// petgraph view of AS relationships, one node per ASN.
///
/// A full topology stores provider->customer links once and each peer
/// link once (lower ASN first). Graphs returned by
/// [`RelationshipIndex::valley_free_of`] instead orient every edge in the
/// direction a route travels away from its origin.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub graph: DiGraph<u32, RelType>,
    nodes: HashMap<u32, NodeIndex>,
}

impl Topology {
    pub fn from_index(index: &RelationshipIndex) -> Self {
        let mut topo = Topology::default();

        let mut asns = index.all_asns().iter().copied().collect::<Vec<u32>>();
        asns.sort_unstable();

        for asn in asns {
            topo.add_asn(asn);
            for customer in sorted(index.customers_of(asn)) {
                topo.add_link(asn, customer, RelType::ProviderToCustomer);
            }
            for peer in sorted(index.peers_of(asn)) {
                if asn < peer {
                    topo.add_link(asn, peer, RelType::PeerToPeer);
                }
            }
        }

        topo
    }

    pub(crate) fn add_asn(&mut self, asn: u32) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .nodes
            .entry(asn)
            .or_insert_with(|| graph.add_node(asn))
    }

    pub(crate) fn add_link(&mut self, asn1: u32, asn2: u32, rel: RelType) {
        let asn1 = self.add_asn(asn1);
        let asn2 = self.add_asn(asn2);
        self.graph.add_edge(asn1, asn2, rel);
    }

    pub fn asn_of(&self, index: NodeIndex) -> u32 {
        self.graph[index]
    }

    pub fn index_of(&self, asn: u32) -> Option<NodeIndex> {
        self.nodes.get(&asn).copied()
    }

    pub fn all_asns(&self) -> HashSet<u32> {
        self.nodes.keys().copied().collect()
    }

    pub fn has_connection(&self, asn1: u32, asn2: u32) -> bool {
        match (self.index_of(asn1), self.index_of(asn2)) {
            (Some(asn1), Some(asn2)) => self.graph.find_edge(asn1, asn2).is_some(),
            _ => false,
        }
    }

    /// Relationship carried by the edge `asn1 -> asn2`, if there is one.
    pub fn link(&self, asn1: u32, asn2: u32) -> Option<RelType> {
        let edge = self
            .graph
            .find_edge(self.index_of(asn1)?, self.index_of(asn2)?)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Fewest-hop path from `from` to `to` following edge direction.
    pub fn shortest_path_to(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;

        let (_, path) = astar(&self.graph, start, |node| node == goal, |_| 1u32, |_| 0)?;
        Some(path.into_iter().map(|node| self.asn_of(node)).collect())
    }

    /// Every simple path from `from` to `to` following edge direction.
    pub fn paths_to(&self, from: u32, to: u32) -> Vec<Vec<u32>> {
        let (start, goal) = match (self.index_of(from), self.index_of(to)) {
            (Some(start), Some(goal)) => (start, goal),
            _ => return Vec::new(),
        };
        if start == goal {
            return vec![vec![from]];
        }

        all_simple_paths::<Vec<_>, _>(&self.graph, start, goal, 0, None)
            .map(|path| path.into_iter().map(|node| self.asn_of(node)).collect())
            .collect()
    }
}

pub(crate) fn sorted(set: Option<&HashSet<u32>>) -> Vec<u32> {
    let mut asns = set
        .map(|set| set.iter().copied().collect::<Vec<u32>>())
        .unwrap_or_default();
    asns.sort_unstable();
    asns
}
