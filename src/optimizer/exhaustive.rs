//! Brute-force search over every subset of physical arcs.
//!
//! The fairness schedule provides the reference; every arc subset that
//! respects interface capacity is then routed and compared against the best
//! so far. Only tractable for a handful of arcs, so the arc count is bounded
//! up front.

use serde::Serialize;

use crate::fairness::FairnessScheduler;
use crate::topology::TimeExpandedTopology;

use super::objective::{Evaluation, Objective};
use super::OptimizeError;

/// Largest number of undirected physical arcs (over all states) searched
pub const MAX_EXHAUSTIVE_ARCS: usize = 24;

#[derive(Debug, Clone, Serialize)]
pub struct ExhaustiveOutcome {
    pub objective: Objective,
    pub arcs: usize,
    pub initial: Evaluation,
    pub best: Evaluation,
    /// Subsets that respected interface capacity
    pub feasible: u64,
    pub improvements: usize,
}

/// Exhaustively search the logical topology of `topology` for `objective`.
pub fn exhaustive_search(topology: &mut TimeExpandedTopology, objective: Objective) -> Result<ExhaustiveOutcome, OptimizeError> {
    let arcs = topology.physical_arcs();
    if arcs.len() > MAX_EXHAUSTIVE_ARCS {
        return Err(OptimizeError::TooManyArcs { arcs: arcs.len(), max: MAX_EXHAUSTIVE_ARCS });
    }

    FairnessScheduler::continuous().schedule_all(topology)?;
    let initial = Evaluation::of(topology);
    let mut best = initial;
    let mut best_snapshot = topology.snapshot_logical();
    let mut feasible = 0;
    let mut improvements = 0;

    log::info!(
        "Exhaustive search of '{}' over {} arcs ({} subsets)",
        topology.name(),
        arcs.len(),
        1u64 << arcs.len()
    );

    let n = topology.node_count();
    let mut degree = vec![0u32; topology.state_count() * n];
    for mask in 1u64..(1u64 << arcs.len()) {
        degree.fill(0);
        let selected = || arcs.iter().enumerate().filter(|&(bit, _)| mask & (1u64 << bit) != 0).map(|(_, arc)| *arc);
        let fits = selected().all(|(k, i, j)| {
            degree[k * n + i] += 1;
            degree[k * n + j] += 1;
            degree[k * n + i] <= topology.capacity(i) && degree[k * n + j] <= topology.capacity(j)
        });
        if !fits {
            continue;
        }
        feasible += 1;

        topology.clear_logical();
        for (k, i, j) in selected() {
            topology.set_logical(k, i, j, true)?;
        }
        topology.set_solved(true);

        let candidate = Evaluation::of(topology);
        if objective.improves(&candidate, &best) {
            log::debug!("Subset {:#x}: max avg delay {}, unrouted {}", mask, candidate.max_avg_delay, candidate.unrouted);
            best = candidate;
            best_snapshot = topology.snapshot_logical();
            improvements += 1;
        }
    }

    topology.restore_logical(&best_snapshot);
    log::info!(
        "Exhaustive search done: {} feasible subsets, max avg delay {} -> {}",
        feasible,
        initial.max_avg_delay,
        best.max_avg_delay
    );
    Ok(ExhaustiveOutcome { objective, arcs: arcs.len(), initial, best, feasible, improvements })
}
