//! Per-state link selection.
//!
//! Two interchangeable strategies choose the logical links of one state
//! from its physical arcs and weights:
//! - `Exact`: reduction to perfect matching, globally optimal,
//! - `Greedy`: strict-priority selection, fast and deterministic.

pub mod blossom;
pub mod greedy;
pub mod reduction;

use crate::topology::{TimeExpandedTopology, TopologyError};

pub use blossom::{matching_weight, max_weight_matching, WeightedEdge};
pub use greedy::solve_state_greedy;
pub use reduction::{min_cost_perfect_matching, solve_state, WeightGoal};

/// Errors raised while selecting links
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("auxiliary matching instance for state {state} has no perfect matching")]
    Infeasible { state: usize },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Link selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact(WeightGoal),
    Greedy,
}

impl MatchStrategy {
    /// Rewrite the logical adjacency of state `k`.
    pub fn solve_state(self, topology: &mut TimeExpandedTopology, k: usize) -> Result<(), MatchingError> {
        match self {
            MatchStrategy::Exact(goal) => reduction::solve_state(topology, k, goal),
            MatchStrategy::Greedy => greedy::solve_state_greedy(topology, k),
        }
    }
}

/// Solve every state of `topology` independently with `strategy`.
pub fn solve_all(topology: &mut TimeExpandedTopology, strategy: MatchStrategy) -> Result<(), MatchingError> {
    log::info!(
        "Selecting links for {} states of '{}' with {:?}",
        topology.state_count(),
        topology.name(),
        strategy
    );
    topology.clear_logical();
    for k in 0..topology.state_count() {
        strategy.solve_state(topology, k)?;
    }
    topology.set_solved(true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{PhysicalLink, RandomTopology};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Heaviest feasible unit-capacity selection in state 0 by enumeration.
    fn best_by_enumeration(topo: &TimeExpandedTopology) -> u32 {
        fn go(topo: &TimeExpandedTopology, v: usize, used: &mut Vec<bool>) -> u32 {
            let n = topo.node_count();
            if v == n {
                return 0;
            }
            if used[v] {
                return go(topo, v + 1, used);
            }
            let mut best = go(topo, v + 1, used);
            for u in (v + 1)..n {
                if !used[u] && topo.physical(0, v, u).is_present() {
                    used[v] = true;
                    used[u] = true;
                    best = best.max(topo.weight(0, v, u) + go(topo, v + 1, used));
                    used[v] = false;
                    used[u] = false;
                }
            }
            best
        }
        go(topo, 0, &mut vec![false; topo.node_count()])
    }

    fn selected_weight(topo: &TimeExpandedTopology) -> u32 {
        let n = topo.node_count();
        let mut total = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                if topo.is_logical(0, i, j) {
                    total += topo.weight(0, i, j);
                }
            }
        }
        total
    }

    #[test]
    fn test_exact_matches_enumeration() {
        let mut rng = StdRng::seed_from_u64(99);
        for nodes in 2..=8 {
            for density in [30, 60, 100] {
                let params = RandomTopology {
                    satellites: nodes,
                    terminals: 0,
                    states: 1,
                    weight_range: (1, 20),
                    duration_range: (1, 1),
                    link_density: density,
                };
                let mut topo = params.generate(&mut rng).unwrap();
                solve_state(&mut topo, 0, WeightGoal::Maximize).unwrap();
                assert!(topo.respects_capacity());
                assert!(topo.check_symmetry().is_ok());
                assert_eq!(selected_weight(&topo), best_by_enumeration(&topo), "nodes={} density={}", nodes, density);
            }
        }
    }

    #[test]
    fn test_greedy_never_beats_exact() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let params = RandomTopology {
                satellites: 7,
                terminals: 1,
                states: 1,
                weight_range: (1, 30),
                duration_range: (1, 1),
                link_density: 50,
            };
            let mut exact = params.generate(&mut rng).unwrap();
            let mut greedy = exact.clone();
            MatchStrategy::Exact(WeightGoal::Maximize).solve_state(&mut exact, 0).unwrap();
            MatchStrategy::Greedy.solve_state(&mut greedy, 0).unwrap();
            assert!(selected_weight(&greedy) <= selected_weight(&exact));
        }
    }

    #[test]
    fn test_solve_all_marks_solved() {
        let mut topo = TimeExpandedTopology::new(2, 0, vec![3, 3]).unwrap();
        topo.set_physical(1, 0, 1, PhysicalLink::Present).unwrap();
        solve_all(&mut topo, MatchStrategy::Greedy).unwrap();
        assert!(topo.is_solved());
        assert!(!topo.is_logical(0, 0, 1));
        assert!(topo.is_logical(1, 0, 1));
    }
}
