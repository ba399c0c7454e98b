//! Exact link selection through perfect matching.
//!
//! The per-state selection problem (each node may hold at most its
//! interface capacity of links) is solved in two steps:
//! - Capacity expansion: a node with capacity `c > 1` is split into `c`
//!   copies, and each arc `(u, v)` becomes a gadget path
//!   `u* - a - b - v*` whose three edges carry the arc weight. The arc is
//!   selected when both `a` and `b` are matched to node copies. With unit
//!   capacities the graph is used as is.
//! - Doubling: the (expanded) graph is copied, every vertex is joined to
//!   its copy by a zero-cost shadow edge, and arc costs are the negated
//!   weights. A minimum-cost perfect matching of this auxiliary graph
//!   restricted to the first copy is a maximum-weight selection; vertices
//!   left unmatched in the original pair up with their shadow.

use crate::topology::TimeExpandedTopology;

use super::blossom::{max_weight_matching, WeightedEdge};
use super::MatchingError;

/// Whether the selection maximizes or minimizes total arc weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightGoal {
    Maximize,
    Minimize,
}

/// Arc of the original state and the expanded vertices that decide it
#[derive(Debug, Clone, Copy)]
struct ArcGadget {
    i: usize,
    j: usize,
    /// Edge index (unit capacities) or the `a`/`b` gadget vertices
    decider: Decider,
}

#[derive(Debug, Clone, Copy)]
enum Decider {
    Edge(usize),
    Gadget { a: usize, b: usize },
}

/// Graph on which the doubling reduction operates
#[derive(Debug, Default)]
struct ExpandedGraph {
    vertex_count: usize,
    edges: Vec<WeightedEdge>,
    arcs: Vec<ArcGadget>,
}

impl ExpandedGraph {
    fn build(topology: &TimeExpandedTopology, k: usize, goal: WeightGoal) -> Self {
        let nodes = topology.node_count();
        let mut arcs: Vec<(usize, usize, i64)> = Vec::new();
        for i in 0..nodes {
            for j in (i + 1)..nodes {
                if topology.physical(k, i, j).is_present() {
                    arcs.push((i, j, i64::from(topology.weight(k, i, j))));
                }
            }
        }

        // Minimizing is maximizing the complement weights S - w, with S above
        // every arc weight; this prices each unmatched vertex at S.
        if goal == WeightGoal::Minimize {
            let ceiling = arcs.iter().map(|a| a.2).max().unwrap_or(0) + 1;
            for arc in &mut arcs {
                arc.2 = ceiling - arc.2;
            }
        }

        let unit = arcs
            .iter()
            .all(|&(i, j, _)| topology.capacity(i) == 1 && topology.capacity(j) == 1);
        let mut graph = ExpandedGraph::default();

        if unit {
            graph.vertex_count = nodes;
            for (idx, &(i, j, w)) in arcs.iter().enumerate() {
                graph.edges.push((i, j, w));
                graph.arcs.push(ArcGadget { i, j, decider: Decider::Edge(idx) });
            }
            return graph;
        }

        let mut first_copy = Vec::with_capacity(nodes);
        let mut next = 0;
        for i in 0..nodes {
            first_copy.push(next);
            next += topology.capacity(i) as usize;
        }
        for &(i, j, w) in &arcs {
            let (a, b) = (next, next + 1);
            next += 2;
            for c in 0..topology.capacity(i) as usize {
                graph.edges.push((first_copy[i] + c, a, w));
            }
            graph.edges.push((a, b, w));
            for c in 0..topology.capacity(j) as usize {
                graph.edges.push((b, first_copy[j] + c, w));
            }
            graph.arcs.push(ArcGadget { i, j, decider: Decider::Gadget { a, b } });
        }
        graph.vertex_count = next;
        graph
    }

    /// Arcs selected by a matching of this graph.
    fn selected(&self, mates: &[Option<usize>]) -> Vec<(usize, usize)> {
        self.arcs
            .iter()
            .filter(|arc| match arc.decider {
                Decider::Edge(idx) => {
                    let (u, v, _) = self.edges[idx];
                    mates[u] == Some(v)
                }
                Decider::Gadget { a, b } => {
                    matches!(mates[a], Some(m) if m != b) && matches!(mates[b], Some(m) if m != a)
                }
            })
            .map(|arc| (arc.i, arc.j))
            .collect()
    }
}

/// Minimum-cost perfect matching over `vertex_count` vertices.
///
/// Costs are shifted into positive weights and handed to the
/// maximum-cardinality matcher; as every perfect matching has the same
/// size, the heaviest one after the shift is the cheapest before it.
pub fn min_cost_perfect_matching(vertex_count: usize, edges: &[WeightedEdge], state: usize) -> Result<Vec<usize>, MatchingError> {
    let shift = edges.iter().map(|e| e.2.abs()).max().unwrap_or(0) + 1;
    let weighted: Vec<WeightedEdge> = edges.iter().map(|&(u, v, c)| (u, v, shift - c)).collect();
    let mates = max_weight_matching(vertex_count, &weighted, true);
    mates
        .into_iter()
        .collect::<Option<Vec<usize>>>()
        .ok_or(MatchingError::Infeasible { state })
}

/// Select the optimal set of logical links for state `k`.
///
/// Clears and rewrites the logical adjacency of state `k` only; arc
/// weights are read, never written.
pub fn solve_state(topology: &mut TimeExpandedTopology, k: usize, goal: WeightGoal) -> Result<(), MatchingError> {
    topology.check_state(k)?;
    let graph = ExpandedGraph::build(topology, k, goal);

    let m = graph.vertex_count;
    let mut aux: Vec<WeightedEdge> = Vec::with_capacity(2 * graph.edges.len() + m);
    for &(u, v, w) in &graph.edges {
        aux.push((u, v, -w));
        aux.push((u + m, v + m, -w));
    }
    for v in 0..m {
        aux.push((v, v + m, 0));
    }

    let mates = min_cost_perfect_matching(2 * m, &aux, k)?;
    // Vertices paired with their shadow are unmatched in the original graph
    let original: Vec<Option<usize>> = mates.iter().take(m).map(|&p| (p < m).then_some(p)).collect();
    let selected = graph.selected(&original);

    topology.clear_state(k);
    for &(i, j) in &selected {
        topology.set_logical(k, i, j, true)?;
    }
    log::debug!("State {}: exact matching selected {} links", k + 1, selected.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::PhysicalLink;

    fn state_with(nodes: usize, arcs: &[(usize, usize, u32)]) -> TimeExpandedTopology {
        let mut topo = TimeExpandedTopology::new(nodes, 0, vec![10]).unwrap();
        for &(i, j, w) in arcs {
            topo.set_physical(0, i, j, PhysicalLink::Present).unwrap();
            topo.set_weight(0, i, j, w).unwrap();
        }
        topo
    }

    fn selected(topo: &TimeExpandedTopology) -> Vec<(usize, usize)> {
        let n = topo.node_count();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if topo.is_logical(0, i, j) {
                    out.push((i, j));
                }
            }
        }
        out
    }

    #[test]
    fn test_min_cost_perfect_matching() {
        let edges = [(0, 1, 5), (2, 3, 5), (0, 2, 1), (1, 3, 1)];
        let mates = min_cost_perfect_matching(4, &edges, 0).unwrap();
        assert_eq!(mates, vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_infeasible_instance() {
        let err = min_cost_perfect_matching(3, &[(0, 1, 1)], 4).unwrap_err();
        assert!(matches!(err, MatchingError::Infeasible { state: 4 }));
    }

    #[test]
    fn test_maximize_path() {
        let mut topo = state_with(4, &[(0, 1, 9), (1, 2, 1), (2, 3, 9)]);
        solve_state(&mut topo, 0, WeightGoal::Maximize).unwrap();
        assert_eq!(selected(&topo), vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn test_minimize_path() {
        let mut topo = state_with(4, &[(0, 1, 9), (1, 2, 1), (2, 3, 9)]);
        solve_state(&mut topo, 0, WeightGoal::Minimize).unwrap();
        assert_eq!(selected(&topo), vec![(1, 2)]);
    }

    #[test]
    fn test_maximize_beats_greedy_choice() {
        // Greedy takes 1-2 (weight 6) and blocks both 5-weight arcs.
        let mut topo = state_with(4, &[(0, 1, 5), (1, 2, 6), (2, 3, 5)]);
        solve_state(&mut topo, 0, WeightGoal::Maximize).unwrap();
        assert_eq!(selected(&topo), vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn test_capacity_two_star() {
        let mut topo = state_with(4, &[(0, 1, 5), (0, 2, 4), (0, 3, 3)]);
        topo.set_capacity(0, 2).unwrap();
        solve_state(&mut topo, 0, WeightGoal::Maximize).unwrap();
        assert_eq!(selected(&topo), vec![(0, 1), (0, 2)]);
        assert!(topo.respects_capacity());
    }

    #[test]
    fn test_capacity_two_triangle() {
        let mut topo = state_with(3, &[(0, 1, 2), (1, 2, 2), (0, 2, 2)]);
        for i in 0..3 {
            topo.set_capacity(i, 2).unwrap();
        }
        solve_state(&mut topo, 0, WeightGoal::Maximize).unwrap();
        assert_eq!(selected(&topo), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_state_without_arcs() {
        let mut topo = state_with(3, &[]);
        solve_state(&mut topo, 0, WeightGoal::Maximize).unwrap();
        assert!(selected(&topo).is_empty());
    }

    #[test]
    fn test_weights_untouched() {
        let mut topo = state_with(3, &[(0, 1, 7), (1, 2, 3)]);
        solve_state(&mut topo, 0, WeightGoal::Minimize).unwrap();
        assert_eq!(topo.weight(0, 0, 1), 7);
        assert_eq!(topo.weight(0, 2, 1), 3);
    }

    #[test]
    fn test_bad_state_index() {
        let mut topo = state_with(3, &[]);
        assert!(matches!(solve_state(&mut topo, 3, WeightGoal::Maximize), Err(MatchingError::Topology(_))));
    }
}
