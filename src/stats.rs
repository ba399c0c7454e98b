//! Link statistics of a solved topology.
//!
//! For every unordered pair the physical time (sum of durations of states
//! where the link is possible) and the enabled time (sum of durations where
//! it is active) are accumulated. Fairness is summarised with the Jain index
//! over the enabled times of pairs that are physically possible at least
//! once:
//!
//! ```text
//! J = (sum x)^2 / (n * sum x^2)
//! ```

use serde::Serialize;

use crate::topology::TimeExpandedTopology;

/// Time accounting of one unordered pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairTime {
    pub a: usize,
    pub b: usize,
    pub physical_time: u64,
    pub enabled_time: u64,
    /// Sum of arc weights over the states where the link was active
    pub enabled_weight: u64,
}

/// Per-state cumulative figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateStats {
    /// 1-based state number
    pub state: usize,
    /// Enabled link time within this state
    pub enabled_time: u64,
    /// Jain index of enabled time accumulated up to this state
    pub jain: f64,
    /// Min/max enabled time ratio accumulated up to this state
    pub min_max_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStats {
    /// Pairs physically possible in at least one state
    pub pairs: Vec<PairTime>,
    pub states: Vec<StateStats>,
    /// Physical arcs summed over states
    pub total_arcs: usize,
    /// Active links summed over states
    pub total_enabled: usize,
    pub total_enabled_time: u64,
    pub total_enabled_weight: u64,
    pub min_enabled: Option<(usize, usize, u64)>,
    pub max_enabled: Option<(usize, usize, u64)>,
    pub min_max_ratio: f64,
    pub jain: f64,
}

/// Jain fairness index of `values`; 1.0 for an empty or all-zero set.
pub fn jain_index(values: &[u64]) -> f64 {
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let squares: f64 = values.iter().map(|&v| (v as f64) * (v as f64)).sum();
    if values.is_empty() || squares == 0.0 {
        return 1.0;
    }
    (sum * sum) / (values.len() as f64 * squares)
}

fn min_max_ratio(values: &[u64]) -> f64 {
    match (values.iter().min(), values.iter().max()) {
        (Some(&lo), Some(&hi)) if hi > 0 => lo as f64 / hi as f64,
        _ => 0.0,
    }
}

/// Collect link statistics of `topology`.
pub fn link_stats(topology: &TimeExpandedTopology) -> LinkStats {
    let n = topology.node_count();
    let mut physical = vec![0u64; n * n];
    let mut enabled = vec![0u64; n * n];
    let mut weight = vec![0u64; n * n];
    let mut states = Vec::with_capacity(topology.state_count());
    let mut total_arcs = 0;
    let mut total_enabled = 0;

    for k in 0..topology.state_count() {
        let t = topology.duration(k);
        let mut state_time = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                if !topology.physical(k, i, j).is_present() {
                    continue;
                }
                physical[i * n + j] += t;
                total_arcs += 1;
                if topology.is_active(k, i, j) {
                    enabled[i * n + j] += t;
                    weight[i * n + j] += u64::from(topology.weight(k, i, j));
                    state_time += t;
                    total_enabled += 1;
                }
            }
        }

        let seen: Vec<u64> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| i * n + j))
            .filter(|&idx| physical[idx] > 0)
            .map(|idx| enabled[idx])
            .collect();
        states.push(StateStats {
            state: k + 1,
            enabled_time: state_time,
            jain: jain_index(&seen),
            min_max_ratio: min_max_ratio(&seen),
        });
    }

    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let idx = i * n + j;
            if physical[idx] > 0 {
                pairs.push(PairTime {
                    a: i,
                    b: j,
                    physical_time: physical[idx],
                    enabled_time: enabled[idx],
                    enabled_weight: weight[idx],
                });
            }
        }
    }

    let times: Vec<u64> = pairs.iter().map(|p| p.enabled_time).collect();
    // First pair wins ties, in scan order
    let min_enabled = pairs.iter().fold(None::<&PairTime>, |best, p| match best {
        Some(b) if b.enabled_time <= p.enabled_time => Some(b),
        _ => Some(p),
    });
    let max_enabled = pairs.iter().fold(None::<&PairTime>, |best, p| match best {
        Some(b) if b.enabled_time >= p.enabled_time => Some(b),
        _ => Some(p),
    });

    LinkStats {
        total_arcs,
        total_enabled,
        total_enabled_time: times.iter().sum(),
        total_enabled_weight: pairs.iter().map(|p| p.enabled_weight).sum(),
        min_enabled: min_enabled.map(|p| (p.a, p.b, p.enabled_time)),
        max_enabled: max_enabled.map(|p| (p.a, p.b, p.enabled_time)),
        min_max_ratio: min_max_ratio(&times),
        jain: jain_index(&times),
        states,
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::PhysicalLink;

    #[test]
    fn test_jain_index() {
        assert_eq!(jain_index(&[]), 1.0);
        assert_eq!(jain_index(&[0, 0]), 1.0);
        assert!((jain_index(&[5, 5, 5]) - 1.0).abs() < 1e-12);
        assert!((jain_index(&[4, 0]) - 0.5).abs() < 1e-12);
        assert!((jain_index(&[1, 2, 3]) - 36.0 / 42.0).abs() < 1e-12);
    }

    #[test]
    fn test_link_stats() {
        let mut topo = TimeExpandedTopology::new(3, 0, vec![4, 6]).unwrap();
        for k in 0..2 {
            topo.set_physical(k, 0, 1, PhysicalLink::Present).unwrap();
            topo.set_physical(k, 1, 2, PhysicalLink::Present).unwrap();
        }
        topo.set_weight(1, 1, 2, 3).unwrap();
        topo.set_solved(true);
        topo.set_logical(0, 0, 1, true).unwrap();
        topo.set_logical(1, 1, 2, true).unwrap();

        let stats = link_stats(&topo);
        assert_eq!(stats.pairs.len(), 2);
        assert_eq!(stats.pairs[0].physical_time, 10);
        assert_eq!(stats.pairs[0].enabled_time, 4);
        assert_eq!(stats.pairs[1].enabled_time, 6);
        assert_eq!(stats.pairs[1].enabled_weight, 3);
        assert_eq!(stats.total_arcs, 4);
        assert_eq!(stats.total_enabled, 2);
        assert_eq!(stats.total_enabled_time, 10);
        assert_eq!(stats.min_enabled, Some((0, 1, 4)));
        assert_eq!(stats.max_enabled, Some((1, 2, 6)));
        assert!((stats.min_max_ratio - 4.0 / 6.0).abs() < 1e-12);
        assert!((stats.jain - 100.0 / 104.0).abs() < 1e-12);

        assert_eq!(stats.states[0].state, 1);
        assert_eq!(stats.states[0].enabled_time, 4);
        assert!((stats.states[0].jain - 0.5).abs() < 1e-12);
        assert_eq!(stats.states[0].min_max_ratio, 0.0);
    }

    #[test]
    fn test_unsolved_counts_physical_links() {
        let mut topo = TimeExpandedTopology::new(2, 0, vec![3]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        let stats = link_stats(&topo);
        assert_eq!(stats.total_enabled_time, 3);
        assert_eq!(stats.jain, 1.0);
    }
}
