//! Time-expanded topology module.
//!
//! This module contains the per-state data model, the text-format loader,
//! the random generator, and the artifact writers (matrix dump, DOT and
//! ION contact plans).

pub mod export;
pub mod generator;
pub mod model;
pub mod parser;

use serde::{Deserialize, Serialize};

// Re-export key types and functions for easier access
pub use generator::RandomTopology;
pub use model::{LogicalSnapshot, NodeClass, PhysicalLink, TimeExpandedTopology, MAX_RANDOM_WEIGHT};
pub use parser::{parse_topology, parse_topology_file, ParseError};

/// Errors raised by topology construction and mutation
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("topology needs at least one node")]
    NoNodes,
    #[error("topology needs at least one state")]
    NoStates,
    #[error("state {state} has zero duration")]
    ZeroDuration { state: usize },
    #[error("state index {state} out of range (topology has {states} states)")]
    StateOutOfRange { state: usize, states: usize },
    #[error("node index {node} out of range (topology has {nodes} nodes)")]
    NodeOutOfRange { node: usize, nodes: usize },
    #[error("node {node} cannot link to itself")]
    SelfLink { node: usize },
    #[error("link {i}-{j} is not physically possible in state {state}")]
    NotPhysical { state: usize, i: usize, j: usize },
    #[error("{matrix} matrix is not symmetric in state {state} for pair {i}-{j}")]
    Asymmetric { matrix: &'static str, state: usize, i: usize, j: usize },
    #[error("invalid weight range {low}..={high}: {reason}")]
    InvalidWeightRange { low: u32, high: u32, reason: &'static str },
    #[error("invalid duration range {low}..={high}")]
    InvalidDurationRange { low: u64, high: u64 },
    #[error("link density {0}% is above 100%")]
    InvalidDensity(u32),
    #[error("interface capacity of node {node} must be at least 1")]
    ZeroCapacity { node: usize },
    #[error("maximum state time must be positive")]
    InvalidMaxTime,
    #[error("{what} count {count} exceeds the configured maximum of {max}")]
    LimitExceeded { what: &'static str, count: usize, max: usize },
}

/// Configured maxima for topology size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_nodes: usize,
    pub max_states: usize,
    pub max_contacts: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nodes: 256,
            max_states: 4096,
            max_contacts: 100_000,
        }
    }
}

impl Limits {
    pub fn check_topology(&self, topology: &TimeExpandedTopology) -> Result<(), TopologyError> {
        check_limit("node", topology.node_count(), self.max_nodes)?;
        check_limit("state", topology.state_count(), self.max_states)
    }

    pub fn check_contacts(&self, contacts: usize) -> Result<(), TopologyError> {
        check_limit("contact", contacts, self.max_contacts)
    }
}

fn check_limit(what: &'static str, count: usize, max: usize) -> Result<(), TopologyError> {
    if count > max {
        return Err(TopologyError::LimitExceeded { what, count, max });
    }
    Ok(())
}
