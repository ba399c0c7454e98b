//! Acceptance strategies of the local search engine.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::objective::{Evaluation, Objective};

/// How candidate moves are generated and adopted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Acceptance {
    /// Adopt the first single candidate that improves on the best
    FirstImprovement,
    /// Evaluate a batch of candidates per iteration and adopt the best one
    SteepestDescent { neighbours: usize },
    /// Adopt improvements, and worse candidates with probability exp(-delta/T)
    SimulatedAnnealing { max_temp: f64 },
}

impl Acceptance {
    /// Candidates evaluated per iteration.
    pub fn batch_size(&self) -> usize {
        match self {
            Acceptance::SteepestDescent { neighbours } => (*neighbours).max(1),
            _ => 1,
        }
    }

    /// Whether an iteration that finds no improving candidate ends the search.
    pub fn stops_without_improvement(&self) -> bool {
        matches!(self, Acceptance::SteepestDescent { .. })
    }

    pub fn initial_temperature(&self) -> f64 {
        match self {
            Acceptance::SimulatedAnnealing { max_temp } => *max_temp,
            _ => 0.0,
        }
    }
}

/// Outcome of judging one candidate against the best topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Improved,
    AcceptedWorse,
    Rejected,
}

/// Annealing temperature schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    value: f64,
}

impl Temperature {
    pub fn new(value: f64) -> Self {
        Self { value: value.max(0.0) }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Cool by one unit after an accepted move, never below zero.
    pub fn cool(&mut self) {
        self.value = (self.value - 1.0).max(0.0);
    }

    /// Metropolis criterion for a candidate `delta` units worse.
    pub fn accepts<R: Rng>(&self, delta: f64, rng: &mut R) -> bool {
        if delta <= 0.0 {
            return true;
        }
        if self.value <= 0.0 {
            return false;
        }
        rng.gen::<f64>() < (-delta / self.value).exp()
    }
}

/// Judge `candidate` against `best` under `acceptance`.
pub fn judge<R: Rng>(
    acceptance: &Acceptance,
    objective: Objective,
    candidate: &Evaluation,
    best: &Evaluation,
    temperature: &Temperature,
    rng: &mut R,
) -> Verdict {
    if objective.improves(candidate, best) {
        return Verdict::Improved;
    }
    match acceptance {
        Acceptance::SimulatedAnnealing { .. } => {
            if temperature.accepts(objective.degradation(candidate, best), rng) {
                Verdict::AcceptedWorse
            } else {
                Verdict::Rejected
            }
        }
        _ => Verdict::Rejected,
    }
}
