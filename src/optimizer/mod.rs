//! Topology optimisation on top of the fairness schedule.
//!
//! This module provides:
//! - Objectives over routed topologies (`objective`)
//! - Pluggable acceptance strategies (`acceptance`)
//! - One local search engine for steepest descent, first improvement and
//!   simulated annealing (`engine`)
//! - Brute-force search for very small instances (`exhaustive`)

pub mod acceptance;
pub mod engine;
pub mod exhaustive;
pub mod objective;

use crate::matching::MatchingError;
use crate::topology::TopologyError;

pub use acceptance::{Acceptance, Temperature, Verdict};
pub use engine::{apply_move, find_move, IterationRecord, LocalSearch, Move, SearchOutcome, Termination, MAX_NEIGHBOUR_ATTEMPTS};
pub use exhaustive::{exhaustive_search, ExhaustiveOutcome, MAX_EXHAUSTIVE_ARCS};
pub use objective::{Evaluation, Objective};

/// Errors raised by the optimisers
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("exhaustive search over {arcs} arcs exceeds the limit of {max}")]
    TooManyArcs { arcs: usize, max: usize },
    #[error(transparent)]
    Matching(#[from] MatchingError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
