//! Fairness-driven link scheduling.
//!
//! The scheduler walks the states in order. Before solving a state it
//! rewrites that state's arc weights from the accumulated off time of
//! every pair, so that pairs starved of contact are matched first:
//! - `Continuous`: weight = off time, saturating at the weight cap,
//! - `TwoClass`: the most starved 30% of the off-time range of the
//!   state's physical arcs get a high weight, the rest a unit weight.
//!
//! After solving, every pair not selected accumulates the state duration.

use serde::{Deserialize, Serialize};

use crate::matching::{MatchStrategy, MatchingError, WeightGoal};
use crate::topology::TimeExpandedTopology;

/// Default saturation value for continuous fairness weights
pub const DEFAULT_WEIGHT_CAP: u32 = 1_000_000;

/// Share of the off-time range treated as starved by `TwoClass`
pub const STARVED_FRACTION: f64 = 0.3;

const STARVED_WEIGHT: u32 = 100;
const REGULAR_WEIGHT: u32 = 1;

/// How off time is turned into arc weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    Continuous,
    TwoClass,
}

/// Accumulated time each unordered pair spent without a selected link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffTime {
    nodes: usize,
    values: Vec<u64>,
}

impl OffTime {
    /// Every pair starts at one time unit.
    pub fn new(nodes: usize) -> Self {
        Self { nodes, values: vec![1; nodes * nodes] }
    }

    fn key(&self, i: usize, j: usize) -> usize {
        let (a, b) = if i <= j { (i, j) } else { (j, i) };
        a * self.nodes + b
    }

    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.values[self.key(i, j)]
    }

    pub fn add(&mut self, i: usize, j: usize, time: u64) {
        let key = self.key(i, j);
        self.values[key] = self.values[key].saturating_add(time);
    }

    /// Smallest and largest off time among the physical arcs of state `k`.
    pub fn range_in_state(&self, topology: &TimeExpandedTopology, k: usize) -> Option<(u64, u64)> {
        let n = topology.node_count();
        let mut range: Option<(u64, u64)> = None;
        for i in 0..n {
            for j in (i + 1)..n {
                if topology.physical(k, i, j).is_present() {
                    let v = self.get(i, j);
                    range = Some(match range {
                        Some((lo, hi)) => (lo.min(v), hi.max(v)),
                        None => (v, v),
                    });
                }
            }
        }
        range
    }
}

/// Drives the matching solver across all states with fairness weights
#[derive(Debug, Clone)]
pub struct FairnessScheduler {
    pub policy: WeightPolicy,
    /// Strategy for the first state
    pub first: MatchStrategy,
    /// Strategy for every later state
    pub rest: MatchStrategy,
    pub weight_cap: u32,
}

impl Default for FairnessScheduler {
    fn default() -> Self {
        Self::continuous()
    }
}

impl FairnessScheduler {
    /// Continuous weights, exact matching in every state.
    pub fn continuous() -> Self {
        Self {
            policy: WeightPolicy::Continuous,
            first: MatchStrategy::Exact(WeightGoal::Maximize),
            rest: MatchStrategy::Exact(WeightGoal::Maximize),
            weight_cap: DEFAULT_WEIGHT_CAP,
        }
    }

    /// Two weight classes, exact matching in every state.
    pub fn two_class() -> Self {
        Self { policy: WeightPolicy::TwoClass, ..Self::continuous() }
    }

    /// Continuous weights, exact matching for the first state and greedy
    /// selection afterwards.
    pub fn strict() -> Self {
        Self { rest: MatchStrategy::Greedy, ..Self::continuous() }
    }

    /// Schedule every state of `topology`, overwriting its arc weights and
    /// logical adjacency. Returns the final off-time accumulator.
    pub fn schedule_all(&self, topology: &mut TimeExpandedTopology) -> Result<OffTime, MatchingError> {
        let n = topology.node_count();
        let mut off = OffTime::new(n);
        topology.clear_logical();

        log::info!(
            "Fairness scheduling of '{}' over {} states ({:?} weights)",
            topology.name(),
            topology.state_count(),
            self.policy
        );

        for k in 0..topology.state_count() {
            self.assign_weights(topology, k, &off)?;
            let strategy = if k == 0 { self.first } else { self.rest };
            strategy.solve_state(topology, k)?;

            let t = topology.duration(k);
            for i in 0..n {
                for j in (i + 1)..n {
                    if !topology.is_logical(k, i, j) {
                        off.add(i, j, t);
                    }
                }
            }
        }

        topology.set_solved(true);
        Ok(off)
    }

    fn assign_weights(&self, topology: &mut TimeExpandedTopology, k: usize, off: &OffTime) -> Result<(), MatchingError> {
        let n = topology.node_count();
        match self.policy {
            WeightPolicy::Continuous => {
                let mut saturated = 0;
                for i in 0..n {
                    for j in (i + 1)..n {
                        let raw = off.get(i, j);
                        let weight = if raw >= u64::from(self.weight_cap) {
                            saturated += 1;
                            self.weight_cap
                        } else {
                            raw as u32
                        };
                        topology.set_weight(k, i, j, weight)?;
                    }
                }
                if saturated > 0 {
                    log::warn!(
                        "State {}: {} pair weights saturated at {}",
                        k + 1,
                        saturated,
                        self.weight_cap
                    );
                }
            }
            WeightPolicy::TwoClass => {
                let Some((lo, hi)) = off.range_in_state(topology, k) else {
                    return Ok(());
                };
                let threshold = hi as f64 - STARVED_FRACTION * (hi - lo) as f64;
                for i in 0..n {
                    for j in (i + 1)..n {
                        let weight = if off.get(i, j) as f64 >= threshold {
                            STARVED_WEIGHT
                        } else {
                            REGULAR_WEIGHT
                        };
                        topology.set_weight(k, i, j, weight)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::solve_all;
    use crate::topology::PhysicalLink;

    /// Node 0 can reach 1 or 2 in every state; 3-4 is an uncontested pair.
    fn contested_star(states: usize) -> TimeExpandedTopology {
        let mut topo = TimeExpandedTopology::new(5, 0, vec![10; states]).unwrap();
        for k in 0..states {
            for (i, j) in [(0, 1), (0, 2), (3, 4)] {
                topo.set_physical(k, i, j, PhysicalLink::Present).unwrap();
            }
        }
        topo
    }

    fn times_selected(topo: &TimeExpandedTopology, i: usize, j: usize) -> usize {
        (0..topo.state_count()).filter(|&k| topo.is_logical(k, i, j)).count()
    }

    #[test]
    fn test_off_time_accumulates() {
        let mut off = OffTime::new(3);
        assert_eq!(off.get(0, 2), 1);
        off.add(2, 0, 5);
        assert_eq!(off.get(0, 2), 6);
        off.add(0, 2, u64::MAX);
        assert_eq!(off.get(2, 0), u64::MAX);
    }

    #[test]
    fn test_starved_pairs_beat_greedy_baseline() {
        let mut fair = contested_star(4);
        FairnessScheduler::continuous().schedule_all(&mut fair).unwrap();

        let mut greedy = contested_star(4);
        solve_all(&mut greedy, MatchStrategy::Greedy).unwrap();

        assert_eq!(times_selected(&greedy, 0, 2), 0);
        assert!(times_selected(&fair, 0, 2) >= 1);
        assert!(times_selected(&fair, 0, 1) >= 1);
        assert_eq!(times_selected(&fair, 3, 4), 4);
        assert_eq!(times_selected(&greedy, 3, 4), 4);
        assert!(fair.respects_capacity());
    }

    #[test]
    fn test_contested_pairs_share_states() {
        let mut topo = contested_star(4);
        let off = FairnessScheduler::continuous().schedule_all(&mut topo).unwrap();
        assert_eq!(times_selected(&topo, 0, 1), 2);
        assert_eq!(times_selected(&topo, 0, 2), 2);
        assert_ne!(topo.is_logical(0, 0, 1), topo.is_logical(1, 0, 1));
        // Each contested pair was off for two states of 10
        assert_eq!(off.get(0, 1), 21);
        assert_eq!(off.get(3, 4), 1);
        // Pairs that never link keep accumulating
        assert_eq!(off.get(1, 2), 41);
    }

    #[test]
    fn test_continuous_weights_follow_off_time() {
        let mut topo = contested_star(2);
        FairnessScheduler::continuous().schedule_all(&mut topo).unwrap();
        assert_eq!(topo.weight(0, 0, 1), 1);
        assert_eq!(topo.weight(1, 1, 2), 11);
        let loser = if topo.is_logical(0, 0, 1) { (0, 2) } else { (0, 1) };
        assert_eq!(topo.weight(1, loser.0, loser.1), 11);
        assert!(topo.is_logical(1, loser.0, loser.1));
    }

    #[test]
    fn test_weight_cap_saturates() {
        let mut topo = contested_star(3);
        let scheduler = FairnessScheduler { weight_cap: 5, ..FairnessScheduler::continuous() };
        scheduler.schedule_all(&mut topo).unwrap();
        assert_eq!(topo.weight(2, 1, 2), 5);
    }

    #[test]
    fn test_two_class_weights() {
        let mut topo = contested_star(2);
        FairnessScheduler::two_class().schedule_all(&mut topo).unwrap();
        // Equal off times in the first state: everyone is in the starved class
        assert_eq!(topo.weight(0, 0, 1), 100);
        assert_eq!(topo.weight(0, 3, 4), 100);
        // Second state: the pair left out in state one is the only starved arc
        let loser = if topo.is_logical(0, 0, 1) { (0, 2) } else { (0, 1) };
        assert_eq!(topo.weight(1, loser.0, loser.1), 100);
        assert_eq!(topo.weight(1, 3, 4), 1);
        assert!(topo.is_logical(1, loser.0, loser.1));
    }

    #[test]
    fn test_strict_variant_is_valid() {
        let mut topo = contested_star(5);
        FairnessScheduler::strict().schedule_all(&mut topo).unwrap();
        assert!(topo.is_solved());
        assert!(topo.respects_capacity());
        assert!(times_selected(&topo, 0, 2) >= 1);
        assert_eq!(times_selected(&topo, 3, 4), 5);
    }
}
