//! Shared local search over logical topologies.
//!
//! Every variant follows the same loop:
//! - start from a fairness-scheduled topology and remember it as the best,
//! - generate a move: pick a random state and a node with more than one
//!   possible neighbour, forbid its selected link, re-solve that state,
//! - route the result, evaluate the objective and let the acceptance
//!   strategy keep or undo the move,
//! - stop on the iteration budget or when no move can be generated,
//!   and leave the best logical topology in place.

use rand::Rng;
use serde::Serialize;

use crate::fairness::FairnessScheduler;
use crate::matching::{MatchStrategy, MatchingError, WeightGoal};
use crate::topology::{PhysicalLink, TimeExpandedTopology};

use super::acceptance::{judge, Acceptance, Temperature, Verdict};
use super::objective::{Evaluation, Objective};
use super::OptimizeError;

/// Random draws made before giving up on finding a move
pub const MAX_NEIGHBOUR_ATTEMPTS: usize = 20_000;

/// Forbid the selected link `node - peer` while re-solving `state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Move {
    pub state: usize,
    pub node: usize,
    pub peer: usize,
}

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    IterationBudget,
    NoMoveFound,
    /// A whole batch of candidates failed to improve
    NoImprovement,
}

/// Trace entry of one iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub verdict: Verdict,
    /// Best candidate of the iteration
    pub candidate: Evaluation,
    /// Best evaluation after the iteration
    pub best: Evaluation,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub objective: Objective,
    pub acceptance: Acceptance,
    pub initial: Evaluation,
    pub best: Evaluation,
    pub iterations: usize,
    pub improvements: usize,
    pub termination: Termination,
    pub history: Vec<IterationRecord>,
}

/// Pick a random move on the current logical topology.
pub fn find_move<R: Rng>(topology: &TimeExpandedTopology, rng: &mut R) -> Option<Move> {
    let states = topology.state_count();
    let nodes = topology.node_count();
    for _ in 0..MAX_NEIGHBOUR_ATTEMPTS {
        let state = rng.gen_range(0..states);
        let node = rng.gen_range(0..nodes);
        if topology.physical_neighbours(state, node).count() <= 1 {
            continue;
        }
        if let Some(peer) = topology.logical_neighbours(state, node).last() {
            return Some(Move { state, node, peer });
        }
    }
    log::debug!("No move found after {} attempts", MAX_NEIGHBOUR_ATTEMPTS);
    None
}

/// Re-solve the move's state with its link temporarily removed.
pub fn apply_move(topology: &mut TimeExpandedTopology, mv: Move) -> Result<(), MatchingError> {
    let link = topology.physical(mv.state, mv.node, mv.peer);
    topology.set_physical(mv.state, mv.node, mv.peer, PhysicalLink::Absent)?;
    let solved = MatchStrategy::Exact(WeightGoal::Maximize).solve_state(topology, mv.state);
    topology.set_physical(mv.state, mv.node, mv.peer, link)?;
    solved
}

/// Local search parameterised by its acceptance strategy
#[derive(Debug, Clone)]
pub struct LocalSearch {
    pub objective: Objective,
    pub acceptance: Acceptance,
    pub iterations: usize,
    /// Produces the starting topology
    pub start: FairnessScheduler,
}

impl LocalSearch {
    pub fn new(objective: Objective, acceptance: Acceptance, iterations: usize) -> Self {
        Self {
            objective,
            acceptance,
            iterations,
            start: FairnessScheduler::continuous(),
        }
    }

    /// Run the search on `topology`, leaving its best logical adjacency in
    /// place.
    pub fn run<R: Rng>(&self, topology: &mut TimeExpandedTopology, rng: &mut R) -> Result<SearchOutcome, OptimizeError> {
        self.start.schedule_all(topology)?;
        let initial = Evaluation::of(topology);
        log::info!(
            "Local search {:?} on '{}' ({:?}): initial max avg delay {}, unrouted {}, jain {:.4}",
            self.acceptance,
            topology.name(),
            self.objective,
            initial.max_avg_delay,
            initial.unrouted,
            initial.jain
        );

        let mut best = initial;
        let mut best_snapshot = topology.snapshot_logical();
        let mut temperature = Temperature::new(self.acceptance.initial_temperature());
        let mut termination = Termination::IterationBudget;
        let mut history = Vec::new();
        let mut improvements = 0;

        for iteration in 1..=self.iterations {
            let mut chosen = None;
            let mut reference = best;
            let mut last_verdict = Verdict::Rejected;
            let mut last_candidate = None;

            for _ in 0..self.acceptance.batch_size() {
                let Some(mv) = find_move(topology, rng) else {
                    continue;
                };
                apply_move(topology, mv)?;
                let candidate = Evaluation::of(topology);
                last_candidate = Some(candidate);

                if self.acceptance.stops_without_improvement() {
                    if self.objective.improves(&candidate, &reference) {
                        reference = candidate;
                        chosen = Some(topology.snapshot_logical());
                    }
                    topology.restore_logical(&best_snapshot);
                    continue;
                }

                last_verdict = judge(&self.acceptance, self.objective, &candidate, &best, &temperature, rng);
                match last_verdict {
                    Verdict::Improved => {
                        best = candidate;
                        best_snapshot = topology.snapshot_logical();
                        improvements += 1;
                    }
                    Verdict::AcceptedWorse => {}
                    Verdict::Rejected => topology.restore_logical(&best_snapshot),
                }
                if last_verdict != Verdict::Rejected {
                    temperature.cool();
                }
            }

            let Some(candidate) = last_candidate else {
                termination = Termination::NoMoveFound;
                break;
            };

            if self.acceptance.stops_without_improvement() {
                match chosen {
                    Some(snapshot) => {
                        topology.restore_logical(&snapshot);
                        best_snapshot = snapshot;
                        best = reference;
                        improvements += 1;
                        last_verdict = Verdict::Improved;
                    }
                    None => termination = Termination::NoImprovement,
                }
            }

            log::debug!(
                "Iteration {}: {:?}, candidate max avg delay {}, best {} (T={})",
                iteration,
                last_verdict,
                candidate.max_avg_delay,
                best.max_avg_delay,
                temperature.value()
            );
            history.push(IterationRecord {
                iteration,
                verdict: last_verdict,
                candidate: if last_verdict == Verdict::Improved { best } else { candidate },
                best,
                temperature: temperature.value(),
            });

            if termination == Termination::NoImprovement {
                break;
            }
        }

        topology.restore_logical(&best_snapshot);
        log::info!(
            "Local search finished after {} iterations ({:?}): max avg delay {} -> {}, unrouted {} -> {}",
            history.len(),
            termination,
            initial.max_avg_delay,
            best.max_avg_delay,
            initial.unrouted,
            best.unrouted
        );

        Ok(SearchOutcome {
            objective: self.objective,
            acceptance: self.acceptance,
            initial,
            best,
            iterations: history.len(),
            improvements,
            termination,
            history,
        })
    }
}
