//! Strict-priority greedy link selection.
//!
//! Arcs are taken from heaviest to lightest; ties keep the ascending
//! `(i, j)` scan order. An arc is activated when both endpoints still
//! have a free interface. The result is deterministic but not optimal.

use crate::topology::TimeExpandedTopology;

use super::MatchingError;

/// Greedily select the logical links of state `k`.
pub fn solve_state_greedy(topology: &mut TimeExpandedTopology, k: usize) -> Result<(), MatchingError> {
    topology.check_state(k)?;
    let n = topology.node_count();

    let mut arcs: Vec<(usize, usize, u32)> = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if topology.physical(k, i, j).is_present() {
                arcs.push((i, j, topology.weight(k, i, j)));
            }
        }
    }
    // Stable sort keeps scan order among equal weights
    arcs.sort_by(|a, b| b.2.cmp(&a.2));

    let mut free: Vec<u32> = topology.capacities().to_vec();
    topology.clear_state(k);
    let mut selected = 0;
    for (i, j, _) in arcs {
        if free[i] > 0 && free[j] > 0 {
            topology.set_logical(k, i, j, true)?;
            free[i] -= 1;
            free[j] -= 1;
            selected += 1;
        }
    }

    log::debug!("State {}: greedy selection activated {} links", k + 1, selected);
    Ok(())
}
