//! Time-respecting all-pairs routing over the state sequence.
//!
//! The route table holds, for every state `k` and ordered pair `(i, j)`,
//! the minimum delay of a message issued at the start of state `k` and
//! the first relay it should be handed to. Seeding runs backwards over
//! the states:
//! - `0` when the pair is linked in state `k`,
//! - `distance[k+1] + duration[k]` when it must wait for the next state,
//! - unreachable otherwise.
//!
//! A relaxation over every intermediate node then combines a leg `i -> n`
//! issued in state `k` with a leg `n -> j` issued in the state that starts
//! when the first leg completes. Delays are always sums of whole state
//! durations, so the first leg always ends on a state boundary.

use serde::Serialize;

use crate::topology::TimeExpandedTopology;

/// Maximum number of hops followed while resolving a next-hop chain
pub const NEXT_HOP_CHAIN_CAP: usize = 1000;

#[derive(Debug, Clone)]
pub struct RouteTable {
    states: usize,
    nodes: usize,
    distance: Vec<Option<u64>>,
    next_hop: Vec<Option<usize>>,
    unresolved_chains: usize,
}

/// Delay summary for one ordered pair over all states
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairDelay {
    pub source: usize,
    pub destination: usize,
    /// States from which the destination cannot be reached
    pub unrouted_states: usize,
    pub max_delay: Option<u64>,
    /// Mean over routed states, truncated; `None` when no state is routed
    pub avg_delay: Option<u64>,
}

/// Global delay statistics of a route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub pairs: Vec<PairDelay>,
    /// Unreachable (state, ordered pair) entries
    pub unrouted: usize,
    /// Largest finite per-pair maximum delay
    pub max_max_delay: u64,
    /// Largest finite per-pair average delay
    pub max_avg_delay: u64,
}

/// How many relayed routes rely on one active link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkUsage {
    pub state: usize,
    pub a: usize,
    pub b: usize,
    /// Destinations other than `b` routed from `a` through `b`
    pub forward: usize,
    /// Destinations other than `a` routed from `b` through `a`
    pub backward: usize,
}

impl LinkUsage {
    pub fn total(&self) -> usize {
        self.forward + self.backward
    }
}

impl RouteTable {
    fn index(&self, k: usize, i: usize, j: usize) -> usize {
        (k * self.nodes + i) * self.nodes + j
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Minimum delay from `i` to `j` for a message issued at the start of
    /// state `k`, `None` when unreachable.
    pub fn distance(&self, k: usize, i: usize, j: usize) -> Option<u64> {
        self.distance[self.index(k, i, j)]
    }

    pub fn next_hop(&self, k: usize, i: usize, j: usize) -> Option<usize> {
        self.next_hop[self.index(k, i, j)]
    }

    /// Number of next-hop chains that hit the resolution cap.
    pub fn unresolved_chains(&self) -> usize {
        self.unresolved_chains
    }

    /// Per-pair and global delay statistics.
    pub fn stats(&self) -> RouteStats {
        let mut pairs = Vec::with_capacity(self.nodes * self.nodes.saturating_sub(1));
        let mut unrouted = 0;
        let mut max_max_delay = 0;
        let mut max_avg_delay = 0;

        for i in 0..self.nodes {
            for j in 0..self.nodes {
                if i == j {
                    continue;
                }
                let mut unrouted_states = 0;
                let mut sum = 0u64;
                let mut max_delay: Option<u64> = None;
                for k in 0..self.states {
                    match self.distance(k, i, j) {
                        Some(d) => {
                            sum += d;
                            max_delay = Some(max_delay.map_or(d, |m| m.max(d)));
                        }
                        None => unrouted_states += 1,
                    }
                }
                let routed = self.states - unrouted_states;
                let avg_delay = (routed > 0).then(|| sum / routed as u64);

                unrouted += unrouted_states;
                if let Some(m) = max_delay {
                    max_max_delay = max_max_delay.max(m);
                }
                if let Some(a) = avg_delay {
                    max_avg_delay = max_avg_delay.max(a);
                }
                pairs.push(PairDelay { source: i, destination: j, unrouted_states, max_delay, avg_delay });
            }
        }

        RouteStats { pairs, unrouted, max_max_delay, max_avg_delay }
    }

    /// Next-hop usage of every active link of `topology`.
    pub fn link_usage(&self, topology: &TimeExpandedTopology) -> Vec<LinkUsage> {
        let mut usage = Vec::new();
        for k in 0..self.states {
            for a in 0..self.nodes {
                for b in (a + 1)..self.nodes {
                    if !topology.is_active(k, a, b) {
                        continue;
                    }
                    let count = |from: usize, via: usize| {
                        (0..self.nodes)
                            .filter(|&d| d != via && self.next_hop(k, from, d) == Some(via))
                            .count()
                    };
                    usage.push(LinkUsage { state: k, a, b, forward: count(a, b), backward: count(b, a) });
                }
            }
        }
        usage
    }

    /// Active links that carry no relayed route, i.e. candidates for removal.
    pub fn unused_links(&self, topology: &TimeExpandedTopology) -> Vec<(usize, usize, usize)> {
        self.link_usage(topology)
            .into_iter()
            .filter(|u| u.total() == 0)
            .map(|u| (u.state, u.a, u.b))
            .collect()
    }
}

/// Compute the route table of `topology`, using the logical adjacency once
/// solved and the physical one otherwise.
pub fn compute_routes(topology: &TimeExpandedTopology) -> RouteTable {
    let n = topology.node_count();
    let states = topology.state_count();
    let starts = topology.state_starts();
    let mut table = RouteTable {
        states,
        nodes: n,
        distance: vec![None; states * n * n],
        next_hop: vec![None; states * n * n],
        unresolved_chains: 0,
    };

    for k in (0..states).rev() {
        for i in 0..n {
            for j in 0..n {
                let idx = table.index(k, i, j);
                let (distance, hop) = if i == j {
                    (Some(0), Some(i))
                } else if topology.is_active(k, i, j) {
                    (Some(0), Some(j))
                } else if k + 1 < states {
                    match table.distance(k + 1, i, j) {
                        Some(d) => (Some(d + topology.duration(k)), Some(j)),
                        None => (None, None),
                    }
                } else {
                    (None, None)
                };
                table.distance[idx] = distance;
                table.next_hop[idx] = hop;
            }
        }
    }

    for via in 0..n {
        for i in 0..n {
            if i == via {
                continue;
            }
            for j in 0..n {
                if j == i || j == via {
                    continue;
                }
                for k in 0..states {
                    let Some(first) = table.distance(k, i, via) else {
                        continue;
                    };
                    // State in which the relay holds the message
                    let arrival = starts[k] + first;
                    let relay_state = starts.partition_point(|&s| s < arrival);
                    if relay_state >= states {
                        continue;
                    }
                    let Some(second) = table.distance(relay_state, via, j) else {
                        continue;
                    };
                    let candidate = first + second;
                    let idx = table.index(k, i, j);
                    if table.distance[idx].map_or(true, |d| candidate < d) {
                        table.distance[idx] = Some(candidate);
                        table.next_hop[idx] = Some(via);
                    }
                }
            }
        }
    }

    resolve_next_hops(&mut table);

    log::debug!(
        "Routed {} states x {} nodes ({} unresolved next-hop chains)",
        states,
        n,
        table.unresolved_chains
    );
    table
}

/// Replace every next hop by the first relay of its chain.
fn resolve_next_hops(table: &mut RouteTable) {
    for k in 0..table.states {
        for i in 0..table.nodes {
            for j in 0..table.nodes {
                if i == j {
                    continue;
                }
                let idx = table.index(k, i, j);
                let Some(mut hop) = table.next_hop[idx] else {
                    continue;
                };
                let mut steps = 0;
                while let Some(next) = table.next_hop(k, i, hop) {
                    if next == hop {
                        break;
                    }
                    hop = next;
                    steps += 1;
                    if steps >= NEXT_HOP_CHAIN_CAP {
                        log::warn!(
                            "Next-hop chain from {} to {} in state {} did not converge after {} hops",
                            i,
                            j,
                            k + 1,
                            NEXT_HOP_CHAIN_CAP
                        );
                        table.unresolved_chains += 1;
                        break;
                    }
                }
                table.next_hop[idx] = Some(hop);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::PhysicalLink;

    /// A-B linked only in state 1, B-C only in state 2; durations 5 and 7.
    fn relay_chain() -> TimeExpandedTopology {
        let mut topo = TimeExpandedTopology::new(3, 0, vec![5, 7]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(1, 1, 2, PhysicalLink::Present).unwrap();
        topo
    }

    #[test]
    fn test_relay_waits_for_next_state() {
        let table = compute_routes(&relay_chain());
        // Handed to B during state 1, B holds it until state 2 starts at t=5
        assert_eq!(table.distance(0, 0, 2), Some(5));
        assert_eq!(table.next_hop(0, 0, 2), Some(1));
        assert_eq!(table.distance(0, 1, 2), Some(5));
        assert_eq!(table.next_hop(0, 1, 2), Some(2));
        // Issued in state 2, A has no way out any more
        assert_eq!(table.distance(1, 0, 2), None);
        assert_eq!(table.next_hop(1, 0, 2), None);
        // Reverse direction: C reaches A only through B in state 2, too late
        assert_eq!(table.distance(0, 2, 0), None);
    }

    #[test]
    fn test_self_pairs_are_zero() {
        let table = compute_routes(&relay_chain());
        for k in 0..2 {
            for i in 0..3 {
                assert_eq!(table.distance(k, i, i), Some(0));
                assert_eq!(table.next_hop(k, i, i), Some(i));
            }
        }
    }

    #[test]
    fn test_uses_logical_when_solved() {
        let mut topo = relay_chain();
        topo.set_solved(true);
        topo.set_logical(1, 1, 2, true).unwrap();
        let table = compute_routes(&topo);
        assert_eq!(table.distance(0, 0, 1), None);
        assert_eq!(table.distance(0, 1, 2), Some(5));
    }

    #[test]
    fn test_multi_hop_within_one_state() {
        let mut topo = TimeExpandedTopology::new(4, 0, vec![3]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 1, 2, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 2, 3, PhysicalLink::Present).unwrap();
        let table = compute_routes(&topo);
        assert_eq!(table.distance(0, 0, 3), Some(0));
        assert_eq!(table.next_hop(0, 0, 3), Some(1));
        assert_eq!(table.next_hop(0, 3, 0), Some(2));
    }

    #[test]
    fn test_variable_durations_pick_relay_state() {
        // 0-1 in state 1, 1-2 in state 3 only; durations 2, 4, 6
        let mut topo = TimeExpandedTopology::new(3, 0, vec![2, 4, 6]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(2, 1, 2, PhysicalLink::Present).unwrap();
        let table = compute_routes(&topo);
        assert_eq!(table.distance(0, 1, 2), Some(6));
        assert_eq!(table.distance(0, 0, 2), Some(6));
        assert_eq!(table.next_hop(0, 0, 2), Some(1));
        assert_eq!(table.distance(1, 0, 2), None);
    }

    #[test]
    fn test_stats() {
        let table = compute_routes(&relay_chain());
        let stats = table.stats();
        assert_eq!(stats.pairs.len(), 6);

        let pair = |s: usize, d: usize| stats.pairs.iter().find(|p| p.source == s && p.destination == d).unwrap();
        // A -> B: 0 in state 1, unreachable in state 2
        assert_eq!(pair(0, 1).unrouted_states, 1);
        assert_eq!(pair(0, 1).avg_delay, Some(0));
        // B -> C: 5 then 0, truncated average 2
        assert_eq!(pair(1, 2).avg_delay, Some(2));
        assert_eq!(pair(1, 2).max_delay, Some(5));
        // C -> A: never routed
        assert_eq!(pair(2, 0).avg_delay, None);
        assert_eq!(pair(2, 0).max_delay, None);
        assert_eq!(pair(2, 0).unrouted_states, 2);

        assert_eq!(stats.max_max_delay, 5);
        assert_eq!(stats.max_avg_delay, 5);
        // A->B, B->A: 1 each; A->C: 1; C->A: 2; B->C, C->B: 0
        assert_eq!(stats.unrouted, 5);
    }

    #[test]
    fn test_link_usage() {
        let mut topo = TimeExpandedTopology::new(3, 0, vec![3]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 1, 2, PhysicalLink::Present).unwrap();
        let table = compute_routes(&topo);
        let usage = table.link_usage(&topo);
        assert_eq!(usage.len(), 2);
        let first = &usage[0];
        assert_eq!((first.a, first.b), (0, 1));
        // 0 relays to 2 through 1; 1 has nothing to relay through 0
        assert_eq!((first.forward, first.backward), (1, 0));
        assert_eq!((usage[1].forward, usage[1].backward), (0, 1));
        assert!(table.unused_links(&topo).is_empty());
    }

    #[test]
    fn test_unused_links_in_triangle() {
        let mut topo = TimeExpandedTopology::new(4, 0, vec![3]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 1, 2, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 0, 2, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 2, 3, PhysicalLink::Present).unwrap();
        let table = compute_routes(&topo);
        // Every triangle pair is direct; only links into 2 relay towards 3
        assert_eq!(table.unused_links(&topo), vec![(0, 0, 1)]);
    }

    #[test]
    fn test_cyclic_next_hops_are_capped() {
        // In state 1, node 0 reaches 1 via 2 and 2 via 1
        let mut table = RouteTable {
            states: 1,
            nodes: 3,
            distance: vec![None; 9],
            next_hop: vec![None; 9],
            unresolved_chains: 0,
        };
        for i in 0..3 {
            let idx = table.index(0, i, i);
            table.distance[idx] = Some(0);
            table.next_hop[idx] = Some(i);
        }
        for (j, hop) in [(1, 2), (2, 1)] {
            let idx = table.index(0, 0, j);
            table.distance[idx] = Some(3);
            table.next_hop[idx] = Some(hop);
        }
        let distances = table.distance.clone();

        resolve_next_hops(&mut table);

        // Both entries of the cycle hit the cap
        assert_eq!(table.unresolved_chains(), 2);
        assert_eq!(table.distance, distances);
        assert!(matches!(table.next_hop(0, 0, 1), Some(1 | 2)));
        assert!(matches!(table.next_hop(0, 0, 2), Some(1 | 2)));
        assert_eq!(table.next_hop(0, 1, 2), None);
        assert_eq!(table.stats().pairs.len(), 6);
    }
}
