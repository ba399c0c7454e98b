//! Search objectives and topology evaluation.

use serde::{Deserialize, Serialize};

use crate::routing::compute_routes;
use crate::stats::link_stats;
use crate::topology::TimeExpandedTopology;

/// Quantity a local search tries to improve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Lower the largest per-pair average delay without adding unrouted entries
    MaxAvgDelay,
    /// Lower the largest per-pair maximum delay without adding unrouted entries
    MaxMaxDelay,
    /// Lower the unrouted count, then the largest average delay
    Unrouted,
    /// Raise the Jain index without adding unrouted entries
    Jain,
    /// Lower the largest average delay while also raising the Jain index
    AvgDelayJain,
}

/// Routing and fairness figures of one logical topology
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub max_avg_delay: u64,
    pub max_max_delay: u64,
    pub unrouted: usize,
    pub jain: f64,
}

impl Evaluation {
    /// Route `topology` and summarise the result.
    pub fn of(topology: &TimeExpandedTopology) -> Self {
        let stats = compute_routes(topology).stats();
        Self {
            max_avg_delay: stats.max_avg_delay,
            max_max_delay: stats.max_max_delay,
            unrouted: stats.unrouted,
            jain: link_stats(topology).jain,
        }
    }
}

impl Objective {
    /// Whether `candidate` is strictly better than `reference`.
    pub fn improves(self, candidate: &Evaluation, reference: &Evaluation) -> bool {
        let routed_as_well = candidate.unrouted <= reference.unrouted;
        match self {
            Objective::MaxAvgDelay => candidate.max_avg_delay < reference.max_avg_delay && routed_as_well,
            Objective::MaxMaxDelay => candidate.max_max_delay < reference.max_max_delay && routed_as_well,
            Objective::Unrouted => {
                candidate.unrouted < reference.unrouted
                    || (candidate.unrouted == reference.unrouted && candidate.max_avg_delay < reference.max_avg_delay)
            }
            Objective::Jain => candidate.jain > reference.jain && routed_as_well,
            Objective::AvgDelayJain => {
                candidate.max_avg_delay < reference.max_avg_delay && routed_as_well && candidate.jain > reference.jain
            }
        }
    }

    /// How much worse `candidate` is than `reference`, in the units the
    /// annealing temperature is expressed in. Zero or negative when not worse.
    pub fn degradation(self, candidate: &Evaluation, reference: &Evaluation) -> f64 {
        let delay = candidate.max_avg_delay as f64 - reference.max_avg_delay as f64;
        let fairness = (reference.jain - candidate.jain) * 100.0;
        match self {
            Objective::MaxAvgDelay => delay,
            Objective::MaxMaxDelay => candidate.max_max_delay as f64 - reference.max_max_delay as f64,
            Objective::Unrouted => candidate.unrouted as f64 - reference.unrouted as f64,
            Objective::Jain => fairness,
            Objective::AvgDelayJain => {
                if delay < 0.0 && candidate.unrouted <= reference.unrouted {
                    fairness
                } else {
                    delay
                }
            }
        }
    }

    /// Scalar used for reporting the objective value.
    pub fn value(self, evaluation: &Evaluation) -> f64 {
        match self {
            Objective::MaxAvgDelay | Objective::AvgDelayJain => evaluation.max_avg_delay as f64,
            Objective::MaxMaxDelay => evaluation.max_max_delay as f64,
            Objective::Unrouted => evaluation.unrouted as f64,
            Objective::Jain => evaluation.jain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::PhysicalLink;

    fn eval(max_avg_delay: u64, unrouted: usize, jain: f64) -> Evaluation {
        Evaluation { max_avg_delay, max_max_delay: max_avg_delay * 2, unrouted, jain }
    }

    #[test]
    fn test_delay_needs_routing_not_worse() {
        let reference = eval(10, 3, 0.5);
        assert!(Objective::MaxAvgDelay.improves(&eval(9, 3, 0.1), &reference));
        assert!(!Objective::MaxAvgDelay.improves(&eval(9, 4, 0.9), &reference));
        assert!(!Objective::MaxAvgDelay.improves(&eval(10, 0, 0.9), &reference));
        assert!(Objective::MaxMaxDelay.improves(&eval(9, 2, 0.5), &reference));
    }

    #[test]
    fn test_unrouted_then_delay() {
        let reference = eval(10, 3, 0.5);
        assert!(Objective::Unrouted.improves(&eval(50, 2, 0.5), &reference));
        assert!(Objective::Unrouted.improves(&eval(9, 3, 0.5), &reference));
        assert!(!Objective::Unrouted.improves(&eval(11, 3, 0.5), &reference));
    }

    #[test]
    fn test_jain_objectives() {
        let reference = eval(10, 3, 0.5);
        assert!(Objective::Jain.improves(&eval(20, 3, 0.6), &reference));
        assert!(!Objective::AvgDelayJain.improves(&eval(20, 3, 0.6), &reference));
        assert!(Objective::AvgDelayJain.improves(&eval(8, 3, 0.6), &reference));
        assert!(!Objective::AvgDelayJain.improves(&eval(8, 3, 0.4), &reference));
    }

    #[test]
    fn test_degradation() {
        let reference = eval(10, 3, 0.5);
        assert_eq!(Objective::MaxAvgDelay.degradation(&eval(14, 3, 0.5), &reference), 4.0);
        assert_eq!(Objective::Unrouted.degradation(&eval(14, 5, 0.5), &reference), 2.0);
        assert!((Objective::Jain.degradation(&eval(10, 3, 0.4), &reference) - 10.0).abs() < 1e-9);
        // Better delay but worse fairness is priced on the Jain index
        assert!((Objective::AvgDelayJain.degradation(&eval(8, 3, 0.45), &reference) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_of_topology() {
        let mut topo = TimeExpandedTopology::new(3, 0, vec![5, 7]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(1, 1, 2, PhysicalLink::Present).unwrap();
        let evaluation = Evaluation::of(&topo);
        assert_eq!(evaluation.max_avg_delay, 5);
        assert_eq!(evaluation.max_max_delay, 5);
        assert_eq!(evaluation.unrouted, 5);
        // Enabled times 5 and 7
        assert!((evaluation.jain - 144.0 / 148.0).abs() < 1e-12);
    }
}
