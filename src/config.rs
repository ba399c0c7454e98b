//! Run configuration.
//!
//! A run is described by one YAML file with these sections:
//! - `general`: name, seed, log level and size limits
//! - `topology`: a text-format file or random generation parameters
//! - `interfaces`: per-node interface capacity
//! - `solver`: how the logical topology is selected
//! - `optimizer`: optional local or exhaustive search afterwards
//! - `queries`: contact-graph route queries
//! - `output`: which artifacts to write

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::fairness::FairnessScheduler;
use crate::matching::{solve_all, MatchStrategy, MatchingError, WeightGoal};
use crate::optimizer::{Acceptance, Objective};
use crate::routing::RouteQuery;
use crate::topology::{Limits, RandomTopology, TimeExpandedTopology, TopologyError, MAX_RANDOM_WEIGHT};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Complete description of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    pub topology: TopologySource,
    #[serde(default)]
    pub interfaces: InterfaceConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<OptimizerConfig>,
    #[serde(default)]
    pub queries: Vec<RouteQuery>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub limits: Limits,
}

/// Where the physical topology comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopologySource {
    File {
        path: PathBuf,
        /// Split states longer than this many time units
        #[serde(skip_serializing_if = "Option::is_none")]
        max_state_time: Option<u64>,
    },
    Random(RandomTopology),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default = "default_interfaces")]
    pub default: u32,
    /// Node index to interface count
    #[serde(default)]
    pub overrides: BTreeMap<usize, u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub strategy: SolveStrategy,
}

/// Logical topology selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStrategy {
    /// Use every physical link
    Physical,
    MaxWeight,
    MinWeight,
    MaxWeightGreedy,
    #[default]
    Fairness,
    /// Exact for the first state, greedy afterwards
    FairnessStrict,
    FairnessTwoClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerMethod {
    SteepestDescent,
    FirstImprovement,
    SimulatedAnnealing,
    Exhaustive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub method: OptimizerMethod,
    #[serde(default = "default_objective")]
    pub objective: Objective,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Candidates per steepest-descent iteration
    #[serde(default = "default_neighbours")]
    pub neighbours: usize,
    /// Initial annealing temperature
    #[serde(default = "default_max_temp")]
    pub max_temp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub report: bool,
    #[serde(default)]
    pub matrix: bool,
    #[serde(default)]
    pub dot: bool,
    #[serde(default)]
    pub ion: bool,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
    #[error("Invalid interface configuration: {0}")]
    InvalidInterfaces(String),
    #[error("Invalid optimizer configuration: {0}")]
    InvalidOptimizer(String),
    #[error("Invalid route query: {0}")]
    InvalidQuery(String),
}

fn default_seed() -> u64 {
    1
}

fn default_interfaces() -> u32 {
    1
}

fn default_objective() -> Objective {
    Objective::MaxAvgDelay
}

fn default_iterations() -> usize {
    500
}

fn default_neighbours() -> usize {
    20
}

fn default_max_temp() -> f64 {
    80.0
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: None,
            seed: default_seed(),
            log_level: Some("info".to_string()),
            limits: Limits::default(),
        }
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self { default: default_interfaces(), overrides: BTreeMap::new() }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { report: true, matrix: false, dot: false, ion: false }
    }
}

impl RunConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_general()?;
        let nodes = self.validate_topology()?;

        if self.interfaces.default == 0 {
            return Err(ValidationError::InvalidInterfaces(
                "default interface count must be at least 1".to_string(),
            ));
        }
        for (&node, &count) in &self.interfaces.overrides {
            if count == 0 {
                return Err(ValidationError::InvalidInterfaces(format!(
                    "node {} must have at least 1 interface",
                    node
                )));
            }
            if nodes.is_some_and(|n| node >= n) {
                return Err(ValidationError::InvalidInterfaces(format!(
                    "override references node {} but the topology has {} nodes",
                    node,
                    nodes.unwrap_or_default()
                )));
            }
        }

        if let Some(optimizer) = &self.optimizer {
            if optimizer.iterations == 0 {
                return Err(ValidationError::InvalidOptimizer("iterations must be positive".to_string()));
            }
            if optimizer.neighbours == 0 {
                return Err(ValidationError::InvalidOptimizer("neighbours must be positive".to_string()));
            }
            if optimizer.max_temp.is_nan() || optimizer.max_temp <= 0.0 {
                return Err(ValidationError::InvalidOptimizer(format!(
                    "max_temp must be positive, got {}",
                    optimizer.max_temp
                )));
            }
        }

        for query in &self.queries {
            if let Some(n) = nodes {
                if query.source >= n || query.destination >= n {
                    return Err(ValidationError::InvalidQuery(format!(
                        "{} -> {} references a node outside 0..{}",
                        query.source, query.destination, n
                    )));
                }
            }
            if query.issue_time > query.deadline {
                return Err(ValidationError::InvalidQuery(format!(
                    "issue time {} is after the deadline {}",
                    query.issue_time, query.deadline
                )));
            }
        }

        Ok(())
    }

    fn validate_general(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ValidationError::InvalidGeneral(format!("unknown log level '{}'", level)));
            }
        }
        let limits = &self.general.limits;
        if limits.max_nodes == 0 || limits.max_states == 0 || limits.max_contacts == 0 {
            return Err(ValidationError::InvalidGeneral("limits must be positive".to_string()));
        }
        Ok(())
    }

    /// Node count when it is known before loading the topology.
    fn validate_topology(&self) -> Result<Option<usize>, ValidationError> {
        match &self.topology {
            TopologySource::File { path, max_state_time } => {
                if path.as_os_str().is_empty() {
                    return Err(ValidationError::InvalidTopology("path cannot be empty".to_string()));
                }
                if *max_state_time == Some(0) {
                    return Err(ValidationError::InvalidTopology("max_state_time must be positive".to_string()));
                }
                Ok(None)
            }
            TopologySource::Random(params) => {
                params
                    .validate()
                    .map_err(|e| ValidationError::InvalidTopology(e.to_string()))?;
                let (low, high) = params.weight_range;
                if low > high || high >= MAX_RANDOM_WEIGHT {
                    return Err(ValidationError::InvalidTopology(format!(
                        "weight range [{}, {}] must be ordered and below {}",
                        low, high, MAX_RANDOM_WEIGHT
                    )));
                }
                let nodes = params.satellites + params.terminals;
                let limits = &self.general.limits;
                if nodes == 0 || nodes > limits.max_nodes {
                    return Err(ValidationError::InvalidTopology(format!(
                        "node count {} must be within 1..={}",
                        nodes, limits.max_nodes
                    )));
                }
                if params.states == 0 || params.states > limits.max_states {
                    return Err(ValidationError::InvalidTopology(format!(
                        "state count {} must be within 1..={}",
                        params.states, limits.max_states
                    )));
                }
                Ok(Some(nodes))
            }
        }
    }

    /// Topology name used in artifacts.
    pub fn name(&self) -> &str {
        self.general.name.as_deref().unwrap_or("topology")
    }

    /// Apply the configured interface capacities to `topology`.
    pub fn apply_interfaces(&self, topology: &mut TimeExpandedTopology) -> Result<(), TopologyError> {
        for node in 0..topology.node_count() {
            let count = self.interfaces.overrides.get(&node).copied().unwrap_or(self.interfaces.default);
            topology.set_capacity(node, count)?;
        }
        if let Some((&node, _)) = self.interfaces.overrides.range(topology.node_count()..).next() {
            return Err(TopologyError::NodeOutOfRange { node, nodes: topology.node_count() });
        }
        Ok(())
    }
}

impl SolveStrategy {
    /// Select the logical topology of every state.
    pub fn solve(self, topology: &mut TimeExpandedTopology) -> Result<(), MatchingError> {
        match self {
            SolveStrategy::Physical => {
                topology.phy_to_log();
                Ok(())
            }
            SolveStrategy::MaxWeight => solve_all(topology, MatchStrategy::Exact(WeightGoal::Maximize)),
            SolveStrategy::MinWeight => solve_all(topology, MatchStrategy::Exact(WeightGoal::Minimize)),
            SolveStrategy::MaxWeightGreedy => solve_all(topology, MatchStrategy::Greedy),
            SolveStrategy::Fairness => FairnessScheduler::continuous().schedule_all(topology).map(|_| ()),
            SolveStrategy::FairnessStrict => FairnessScheduler::strict().schedule_all(topology).map(|_| ()),
            SolveStrategy::FairnessTwoClass => FairnessScheduler::two_class().schedule_all(topology).map(|_| ()),
        }
    }
}

impl OptimizerConfig {
    /// Acceptance strategy of a local search; `None` for exhaustive search.
    pub fn acceptance(&self) -> Option<Acceptance> {
        match self.method {
            OptimizerMethod::SteepestDescent => Some(Acceptance::SteepestDescent { neighbours: self.neighbours }),
            OptimizerMethod::FirstImprovement => Some(Acceptance::FirstImprovement),
            OptimizerMethod::SimulatedAnnealing => Some(Acceptance::SimulatedAnnealing { max_temp: self.max_temp }),
            OptimizerMethod::Exhaustive => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_config() -> RunConfig {
        let yaml = r#"
general:
  name: demo
  seed: 7
topology:
  satellites: 4
  terminals: 1
  states: 3
  weight_range: [1, 10]
  duration_range: [5, 9]
  link_density: 40
interfaces:
  default: 1
  overrides: { 0: 2 }
solver:
  strategy: fairness_two_class
optimizer:
  method: simulated_annealing
  iterations: 50
queries:
  - { source: 3, destination: 1, deadline: 40 }
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_random_config() {
        let config = random_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.name(), "demo");
        assert_eq!(config.general.seed, 7);
        assert_eq!(config.solver.strategy, SolveStrategy::FairnessTwoClass);
        assert_eq!(config.interfaces.overrides.get(&0), Some(&2));
        assert_eq!(config.queries[0].issue_time, 0);
        assert!(config.output.report);
        assert!(!config.output.dot);

        let optimizer = config.optimizer.as_ref().unwrap();
        assert_eq!(optimizer.objective, Objective::MaxAvgDelay);
        assert_eq!(optimizer.neighbours, 20);
        assert_eq!(optimizer.acceptance(), Some(Acceptance::SimulatedAnnealing { max_temp: 80.0 }));
        assert!(matches!(config.topology, TopologySource::Random(ref p) if p.satellites == 4));
    }

    #[test]
    fn test_parse_file_config_with_defaults() {
        let config: RunConfig = serde_yaml::from_str("topology:\n  path: topo.txt\n  max_state_time: 30\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.seed, 1);
        assert_eq!(config.solver.strategy, SolveStrategy::Fairness);
        assert_eq!(config.interfaces.default, 1);
        assert!(config.optimizer.is_none());
        assert!(matches!(config.topology, TopologySource::File { max_state_time: Some(30), .. }));
    }

    #[test]
    fn test_unknown_strategy_fails_to_parse() {
        let result: Result<RunConfig, _> = serde_yaml::from_str("topology:\n  path: t.txt\nsolver:\n  strategy: lp_solve\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_weight_range() {
        let mut config = random_config();
        if let TopologySource::Random(params) = &mut config.topology {
            params.weight_range = (5, 100);
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTopology(_))));
    }

    #[test]
    fn test_node_limit() {
        let mut config = random_config();
        config.general.limits.max_nodes = 4;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTopology(_))));
    }

    #[test]
    fn test_interface_override_out_of_range() {
        let mut config = random_config();
        config.interfaces.overrides.insert(5, 1);
        assert!(matches!(config.validate(), Err(ValidationError::InvalidInterfaces(_))));
        config.interfaces.overrides.insert(5, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_optimizer_and_query() {
        let mut config = random_config();
        config.optimizer.as_mut().unwrap().iterations = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidOptimizer(_))));

        let mut config = random_config();
        config.queries[0].destination = 9;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidQuery(_))));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = random_config();
        config.general.log_level = Some("loud".to_string());
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));
    }

    #[test]
    fn test_apply_interfaces() {
        let config = random_config();
        let mut topo = TimeExpandedTopology::new(3, 0, vec![1]).unwrap();
        config.apply_interfaces(&mut topo).unwrap();
        assert_eq!(topo.capacities(), &[2, 1, 1]);

        let mut tiny = TimeExpandedTopology::new(1, 0, vec![1]).unwrap();
        let mut config = random_config();
        config.interfaces.overrides.insert(3, 2);
        assert!(matches!(config.apply_interfaces(&mut tiny), Err(TopologyError::NodeOutOfRange { node: 3, .. })));
    }

    #[test]
    fn test_solve_strategies_produce_valid_topologies() {
        let strategies = [
            SolveStrategy::Physical,
            SolveStrategy::MaxWeight,
            SolveStrategy::MinWeight,
            SolveStrategy::MaxWeightGreedy,
            SolveStrategy::Fairness,
            SolveStrategy::FairnessStrict,
            SolveStrategy::FairnessTwoClass,
        ];
        for strategy in strategies {
            let mut topo = TimeExpandedTopology::new(3, 0, vec![2, 2]).unwrap();
            topo.set_physical(0, 0, 1, crate::topology::PhysicalLink::Present).unwrap();
            topo.set_physical(1, 1, 2, crate::topology::PhysicalLink::Present).unwrap();
            strategy.solve(&mut topo).unwrap();
            assert!(topo.is_solved(), "{:?}", strategy);
            assert!(topo.respects_capacity(), "{:?}", strategy);
        }
    }
}
