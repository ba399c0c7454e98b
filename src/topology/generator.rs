//! Random topology generation.
//!
//! Every state gets a random duration and every unordered pair of nodes a
//! link with probability `link_density` percent. Arc weights are drawn
//! afterwards from the configured weight range.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::model::{PhysicalLink, TimeExpandedTopology};
use super::TopologyError;

/// Parameters of a randomly generated topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomTopology {
    pub satellites: usize,
    #[serde(default)]
    pub terminals: usize,
    pub states: usize,
    #[serde(default = "default_weight_range")]
    pub weight_range: (u32, u32),
    pub duration_range: (u64, u64),
    /// Probability, in percent, that a pair can link during a state
    pub link_density: u32,
}

fn default_weight_range() -> (u32, u32) {
    (1, 1)
}

impl RandomTopology {
    pub fn validate(&self) -> Result<(), TopologyError> {
        let (low, high) = self.duration_range;
        if low == 0 || low > high {
            return Err(TopologyError::InvalidDurationRange { low, high });
        }
        if self.link_density > 100 {
            return Err(TopologyError::InvalidDensity(self.link_density));
        }
        Ok(())
    }

    /// Build a topology from these parameters using `rng`.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<TimeExpandedTopology, TopologyError> {
        self.validate()?;
        let (low, high) = self.duration_range;
        let durations: Vec<u64> = (0..self.states).map(|_| rng.gen_range(low..=high)).collect();

        let mut topology = TimeExpandedTopology::new(self.satellites, self.terminals, durations)?;
        let nodes = topology.node_count();
        for k in 0..self.states {
            for i in 0..nodes {
                for j in (i + 1)..nodes {
                    if rng.gen_range(0..100) < self.link_density {
                        topology.set_physical(k, i, j, PhysicalLink::Present)?;
                    }
                }
            }
        }
        topology.set_random_weights(self.weight_range.0..=self.weight_range.1, rng)?;
        topology.set_name("random");

        log::info!(
            "Generated random topology: {} satellites, {} terminals, {} states, {} possible arcs",
            self.satellites,
            self.terminals,
            self.states,
            topology.physical_arcs().len()
        );
        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(density: u32) -> RandomTopology {
        RandomTopology {
            satellites: 5,
            terminals: 1,
            states: 8,
            weight_range: (1, 10),
            duration_range: (10, 20),
            link_density: density,
        }
    }

    #[test]
    fn test_generate_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let topo = params(30).generate(&mut rng).unwrap();
        assert_eq!(topo.node_count(), 6);
        assert_eq!(topo.state_count(), 8);
        assert!(topo.durations().iter().all(|t| (10..=20).contains(t)));
        assert!(topo.check_symmetry().is_ok());
    }

    #[test]
    fn test_generate_is_reproducible() {
        let a = params(40).generate(&mut StdRng::seed_from_u64(11)).unwrap();
        let b = params(40).generate(&mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a.durations(), b.durations());
        assert_eq!(a.physical_arcs(), b.physical_arcs());
    }

    #[test]
    fn test_density_extremes() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(params(0).generate(&mut rng).unwrap().physical_arcs().is_empty());
        let full = params(100).generate(&mut rng).unwrap();
        assert_eq!(full.physical_arcs().len(), 8 * 15);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut bad = params(10);
        bad.duration_range = (5, 2);
        assert!(matches!(bad.generate(&mut rng), Err(TopologyError::InvalidDurationRange { .. })));
        let bad = params(101);
        assert!(matches!(bad.generate(&mut rng), Err(TopologyError::InvalidDensity(101))));
        let mut bad = params(10);
        bad.weight_range = (4, 100);
        assert!(matches!(bad.generate(&mut rng), Err(TopologyError::InvalidWeightRange { .. })));
    }
}
