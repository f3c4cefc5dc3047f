//! Valley-free reachability from a single origin AS.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, warn};

use crate::{
    index::RelationshipIndex,
    relationship::RelType,
    topology::{sorted, Topology},
};

impl RelationshipIndex {
    /*
     * Given the following topology:
     *
     *               ┌─────┐
     *               │     │
     *               └──┬──┘
     *           ┌──────┴─────┐
     *        ┌──▼──┐      ┌──▼──┐
     *        │     ◄──────►     │
     *        └──┬──┘      └──┬──┘
     *     ┌─────┴────┐  ┌────┴────┐
     *  ┌──▼──┐     ┌─▼──▼┐     ┌──▼──┐
     *  │     │     │     │     │     │
     *  └─────┘     └─────┘     └─────┘
     *
     * this method returns a DAG of every link a route originated by `origin`
     * may cross under valley-free export rules: up through providers, across
     * at most one peering link, then down to customers.
     *
     *              ┌─────┐
     *              │     │
     *              └──▲──┘
     *          ┌──────┴─────┐
     *       ┌──┴──┐      ┌──▼──┐
     *       │     ├──────►     │
     *       └──▲──┘      └──┬──┘
     *    ┌─────┴────┐  ┌────┴────┐
     * ┌──┴──┐     ┌─▼──▼┐     ┌──▼──┐
     * │     │     │     │     │     │
     * └─────┘     └─────┘     └─────┘
     *
     * Each AS is placed in the earliest phase that reaches it. ASes reached
     * on the way up never receive peer or customer edges, so every path of
     * the DAG, read from the origin, is accepted by the valley-free
     * validator. Links that would close a provider/customer cycle in
     * inconsistent data are left out.
     */
    pub fn valley_free_of(&self, origin: u32) -> Topology {
        let mut topo = Topology::default();
        topo.add_asn(origin);

        // up: origin and its transitive providers
        let mut up_order = vec![origin];
        let mut up_set = HashSet::from([origin]);
        let mut up_edges = Vec::new();
        let mut next = 0;
        while next < up_order.len() {
            let asn = up_order[next];
            next += 1;
            for provider in sorted(self.providers_of(asn)) {
                up_edges.push((asn, provider));
                if up_set.insert(provider) {
                    up_order.push(provider);
                }
            }
        }

        let up_rank = topological_rank(&up_order, &up_edges);
        for (customer, provider) in up_edges {
            if up_rank[&customer] < up_rank[&provider] {
                topo.add_link(customer, provider, RelType::CustomerToProvider);
            } else {
                warn!(
                    "AS{} -> AS{} closes a provider cycle, leaving it out",
                    customer, provider
                );
            }
        }

        // one peering hop out of the uphill set
        let mut outside = Vec::new();
        let mut outside_set = HashSet::new();
        for &asn in &up_order {
            for peer in sorted(self.peers_of(asn)) {
                if up_set.contains(&peer) {
                    continue;
                }
                topo.add_link(asn, peer, RelType::PeerToPeer);
                if outside_set.insert(peer) {
                    outside.push(peer);
                }
            }
        }

        // down: customers of everything reached so far
        let mut down_edges = Vec::new();
        let mut expanded = HashSet::new();
        let mut stack = up_order
            .iter()
            .chain(outside.iter())
            .rev()
            .copied()
            .collect::<Vec<u32>>();
        while let Some(asn) = stack.pop() {
            if !expanded.insert(asn) {
                continue;
            }
            for customer in sorted(self.customers_of(asn)) {
                if up_set.contains(&customer) {
                    continue;
                }
                down_edges.push((asn, customer));
                if outside_set.insert(customer) {
                    outside.push(customer);
                }
                stack.push(customer);
            }
        }

        let inner_edges = down_edges
            .iter()
            .copied()
            .filter(|(provider, _)| !up_set.contains(provider))
            .collect::<Vec<_>>();
        let down_rank = topological_rank(&outside, &inner_edges);
        for (provider, customer) in down_edges {
            if up_set.contains(&provider) || down_rank[&provider] < down_rank[&customer] {
                topo.add_link(provider, customer, RelType::ProviderToCustomer);
            } else {
                warn!(
                    "AS{} -> AS{} closes a customer cycle, leaving it out",
                    provider, customer
                );
            }
        }

        debug!(
            "valley-free graph of AS{}: {} ASes, {} links",
            origin,
            topo.graph.node_count(),
            topo.graph.edge_count()
        );
        topo
    }
}

/// Kahn ordering of `nodes` over `edges`. Members of a cycle are ranked last,
/// in input order.
fn topological_rank(nodes: &[u32], edges: &[(u32, u32)]) -> HashMap<u32, usize> {
    let mut indegree = nodes.iter().map(|&asn| (asn, 0)).collect::<HashMap<u32, usize>>();
    let mut successors: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(from, to) in edges {
        successors.entry(from).or_default().push(to);
        *indegree.entry(to).or_default() += 1;
    }

    let mut ready = nodes
        .iter()
        .copied()
        .filter(|asn| indegree[asn] == 0)
        .collect::<VecDeque<u32>>();
    let mut rank = HashMap::with_capacity(nodes.len());
    while let Some(asn) = ready.pop_front() {
        let position = rank.len();
        rank.insert(asn, position);
        for to in successors.get(&asn).into_iter().flatten() {
            if let Some(degree) = indegree.get_mut(to) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(*to);
                }
            }
        }
    }

    for &asn in nodes {
        if !rank.contains_key(&asn) {
            let position = rank.len();
            rank.insert(asn, position);
        }
    }
    rank
}

#[cfg(test)]
mod tests {
    use petgraph::algo::is_cyclic_directed;
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    use super::*;
    use crate::validator::is_valley_free;

    fn assert_all_paths_valley_free(index: &RelationshipIndex, origin: u32) {
        let topo = index.valley_free_of(origin);
        assert!(!is_cyclic_directed(&topo.graph));

        for asn in topo.all_asns() {
            for path in topo.paths_to(origin, asn) {
                let result = is_valley_free(index, &path);
                assert!(result.valid, "{:?} is not valley-free", path);
                assert!(result.unknown_hops.is_empty());
            }
        }
    }

    #[test]
    /* Input:
     *               ┌─────┐
     *               │  1  │
     *               └──┬──┘
     *           ┌──────┴─────┐
     *        ┌──▼──┐      ┌──▼──┐
     *        │  2  ◄──────►  3  │
     *        └──┬──┘      └──┬──┘
     *     ┌─────┴────┐  ┌────┴────┐
     *  ┌──▼──┐     ┌─▼──▼─┐    ┌──▼──┐
     *  │  4  │     │  05  │    │  6  │
     *  └─────┘     └──────┘    └─────┘
     *
     * Expected output:
     *               ┌─────┐
     *               │  1  │
     *               └──▲──┘
     *           ┌──────┴─────┐
     *        ┌──┴──┐      ┌──▼──┐
     *        │  2  ├──────►  3  │
     *        └──▲──┘      └──┬──┘
     *     ┌─────┴────┐  ┌────┴────┐
     *  ┌──┴──┐     ┌─▼──▼─┐    ┌──▼──┐
     *  │  4  │     │  05  │    │  6  │
     *  └─────┘     └──────┘    └─────┘
     */
    fn test_valley_free_graph() {
        let index = RelationshipIndex::from_edges(vec![
            (1, 2, RelType::ProviderToCustomer),
            (1, 3, RelType::ProviderToCustomer),
            (2, 4, RelType::ProviderToCustomer),
            (2, 5, RelType::ProviderToCustomer),
            (2, 3, RelType::PeerToPeer),
            (3, 5, RelType::ProviderToCustomer),
            (3, 6, RelType::ProviderToCustomer),
        ]);

        let topo = index.valley_free_of(4);

        assert_eq!(topo.link(4, 2), Some(RelType::CustomerToProvider));
        assert_eq!(topo.link(2, 1), Some(RelType::CustomerToProvider));
        assert_eq!(topo.link(2, 3), Some(RelType::PeerToPeer));
        assert_eq!(topo.link(2, 5), Some(RelType::ProviderToCustomer));
        assert_eq!(topo.link(1, 3), Some(RelType::ProviderToCustomer));
        assert_eq!(topo.link(3, 5), Some(RelType::ProviderToCustomer));
        assert_eq!(topo.link(3, 6), Some(RelType::ProviderToCustomer));

        assert_eq!(topo.graph.edge_count(), 7);
        assert!(!is_cyclic_directed(&topo.graph));

        assert_eq!(topo.shortest_path_to(4, 6), Some(vec![4, 2, 3, 6]));
        assert_all_paths_valley_free(&index, 4);
    }

    #[test]
    /*
     *       ┌───────┐
     *       │   1   │
     *       └──▲─▲──┘
     *     ┌────┘ └────┐
     * ┌───┴───┐   ┌───┴───┐
     * │   2   │   │   3   │
     * └───▲───┘   └───▲───┘
     *     └────┐ ┌────┘
     *       ┌──┴─┴──┐
     *       │   4   │
     *       └───────┘
     */
    fn test_peering_between_uphill_ases_is_left_out() {
        let index = RelationshipIndex::from_edges(vec![
            (1, 2, RelType::ProviderToCustomer),
            (1, 3, RelType::ProviderToCustomer),
            (3, 2, RelType::PeerToPeer),
            (3, 4, RelType::ProviderToCustomer),
            (2, 4, RelType::ProviderToCustomer),
        ]);

        let topo = index.valley_free_of(4);

        assert!(topo.has_connection(4, 2));
        assert!(topo.has_connection(4, 3));
        assert!(topo.has_connection(2, 1));
        assert!(topo.has_connection(3, 1));
        assert!(!topo.has_connection(2, 3));
        assert!(!topo.has_connection(3, 2));
        assert!(!topo.has_connection(1, 2));
        assert_eq!(topo.graph.edge_count(), 4);

        assert_all_paths_valley_free(&index, 4);
    }

    #[test]
    /*
     * ┌───────┐    ┌───────┐
     * │   1   │◄──►│   2   │
     * └───────┘    └───┬───┘
     *                  │
     *                  ▼
     *              ┌───────┐
     *              │   3   │
     *              └───────┘
     */
    fn test_peer_then_down() {
        let index = RelationshipIndex::from_edges(vec![
            (1, 2, RelType::PeerToPeer),
            (2, 3, RelType::ProviderToCustomer),
        ]);

        let topo = index.valley_free_of(1);
        assert_eq!(topo.paths_to(1, 3), vec![vec![1, 2, 3]]);

        let topo = index.valley_free_of(3);
        assert_eq!(topo.paths_to(3, 1), vec![vec![3, 2, 1]]);
        assert_eq!(topo.link(2, 1), Some(RelType::PeerToPeer));

        // origin in the middle: one peer link, one customer link
        let topo = index.valley_free_of(2);
        assert_eq!(topo.link(2, 1), Some(RelType::PeerToPeer));
        assert_eq!(topo.graph.edge_count(), 2);
    }

    #[test]
    fn test_unknown_origin() {
        let index = RelationshipIndex::from_edges(vec![(1, 2, RelType::ProviderToCustomer)]);

        let topo = index.valley_free_of(42);
        assert_eq!(topo.all_asns(), [42].into());
        assert_eq!(topo.graph.edge_count(), 0);
    }

    #[test]
    fn test_provider_cycle_stays_acyclic() {
        // 1 -> 2 -> 3 -> 1 is inconsistent data
        let (index, _) = RelationshipIndex::build(["1|2|-1", "2|3|-1", "3|1|-1", "3|4|-1"]);

        for origin in 1..=4 {
            let topo = index.valley_free_of(origin);
            assert!(!is_cyclic_directed(&topo.graph));
        }
    }

    #[test]
    fn test_never_generates_cycles() {
        let index = RelationshipIndex::from_edges(vec![
            (1, 2, RelType::PeerToPeer),
            (1, 3, RelType::ProviderToCustomer),
            (1, 4, RelType::ProviderToCustomer),
            (2, 5, RelType::ProviderToCustomer),
            (2, 6, RelType::ProviderToCustomer),
            (3, 4, RelType::PeerToPeer),
            (4, 6, RelType::PeerToPeer),
            (3, 7, RelType::ProviderToCustomer),
            (4, 7, RelType::ProviderToCustomer),
            (5, 7, RelType::ProviderToCustomer),
            (6, 8, RelType::ProviderToCustomer),
            (7, 8, RelType::PeerToPeer),
        ]);

        index
            .all_asns()
            .iter()
            .copied()
            .collect::<Vec<u32>>()
            .into_par_iter()
            .for_each(|origin| assert_all_paths_valley_free(&index, origin));
    }

    #[test]
    fn test_topological_rank() {
        let rank = topological_rank(&[1, 2, 3], &[(1, 2), (2, 3), (1, 3)]);
        assert!(rank[&1] < rank[&2]);
        assert!(rank[&2] < rank[&3]);

        let rank = topological_rank(&[1, 2, 3], &[(1, 2), (2, 1)]);
        assert_eq!(rank[&3], 0);
        assert_eq!(rank.len(), 3);
    }
}
