//! Time-expanded topology data model.
//!
//! A [`TimeExpandedTopology`] owns, for every discrete state:
//! - the physical adjacency (which pairs could possibly connect),
//! - the logical adjacency (which links were actually selected),
//! - symmetric arc weights consumed by the matching solvers,
//! - the state duration.
//!
//! All matrices are flattened into one allocation per kind, sized at
//! construction time. States are indexed from 0. Nodes `0..terminals`
//! are ground terminals and the remaining nodes are satellites.

use std::ops::RangeInclusive;

use rand::Rng;
use serde::Serialize;

use super::TopologyError;

/// Randomly assigned arc weights must stay strictly below this value.
pub const MAX_RANDOM_WEIGHT: u32 = 100;

/// Physical availability of a pair during one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhysicalLink {
    /// The pair can never link (the diagonal, `*` in the text format).
    Blocked,
    /// No link is possible during this state.
    Absent,
    /// A link may be selected during this state.
    Present,
}

impl PhysicalLink {
    pub fn is_present(self) -> bool {
        matches!(self, PhysicalLink::Present)
    }
}

/// The two node classes of a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeClass {
    Terminal,
    Satellite,
}

/// Saved copy of the logical adjacency, used by the local-search engines
/// to remember the best topology seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSnapshot {
    links: Vec<bool>,
    solved: bool,
}

#[derive(Debug, Clone)]
pub struct TimeExpandedTopology {
    name: String,
    satellites: usize,
    terminals: usize,
    durations: Vec<u64>,
    physical: Vec<PhysicalLink>,
    logical: Vec<bool>,
    weights: Vec<u32>,
    capacity: Vec<u32>,
    solved: bool,
}

impl TimeExpandedTopology {
    /// Create a topology with no physical links, unit weights and unit
    /// interface capacity.
    ///
    /// # Arguments
    /// * `satellites` - Number of satellite nodes
    /// * `terminals` - Number of ground terminal nodes
    /// * `durations` - Duration of every state, in order
    pub fn new(satellites: usize, terminals: usize, durations: Vec<u64>) -> Result<Self, TopologyError> {
        let nodes = satellites + terminals;
        if nodes == 0 {
            return Err(TopologyError::NoNodes);
        }
        if durations.is_empty() {
            return Err(TopologyError::NoStates);
        }
        if let Some(state) = durations.iter().position(|&t| t == 0) {
            return Err(TopologyError::ZeroDuration { state });
        }

        let cells = durations.len() * nodes * nodes;
        let mut physical = vec![PhysicalLink::Absent; cells];
        for k in 0..durations.len() {
            for i in 0..nodes {
                physical[(k * nodes + i) * nodes + i] = PhysicalLink::Blocked;
            }
        }

        Ok(Self {
            name: "unnamed".to_string(),
            satellites,
            terminals,
            durations,
            physical,
            logical: vec![false; cells],
            weights: vec![1; cells],
            capacity: vec![1; nodes],
            solved: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn node_count(&self) -> usize {
        self.satellites + self.terminals
    }

    pub fn state_count(&self) -> usize {
        self.durations.len()
    }

    pub fn satellites(&self) -> usize {
        self.satellites
    }

    pub fn terminals(&self) -> usize {
        self.terminals
    }

    pub fn node_class(&self, node: usize) -> NodeClass {
        if node < self.terminals {
            NodeClass::Terminal
        } else {
            NodeClass::Satellite
        }
    }

    pub fn duration(&self, k: usize) -> u64 {
        self.durations[k]
    }

    pub fn durations(&self) -> &[u64] {
        &self.durations
    }

    /// Start offset of every state, plus the total mission time as the
    /// final element.
    pub fn state_starts(&self) -> Vec<u64> {
        let mut starts = Vec::with_capacity(self.durations.len() + 1);
        let mut acc = 0;
        starts.push(acc);
        for t in &self.durations {
            acc += t;
            starts.push(acc);
        }
        starts
    }

    pub fn total_time(&self) -> u64 {
        self.durations.iter().sum()
    }

    fn index(&self, k: usize, i: usize, j: usize) -> usize {
        let n = self.node_count();
        (k * n + i) * n + j
    }

    pub fn check_state(&self, k: usize) -> Result<(), TopologyError> {
        if k >= self.state_count() {
            return Err(TopologyError::StateOutOfRange { state: k, states: self.state_count() });
        }
        Ok(())
    }

    pub fn check_node(&self, node: usize) -> Result<(), TopologyError> {
        if node >= self.node_count() {
            return Err(TopologyError::NodeOutOfRange { node, nodes: self.node_count() });
        }
        Ok(())
    }

    fn check_pair(&self, k: usize, i: usize, j: usize) -> Result<(), TopologyError> {
        self.check_state(k)?;
        self.check_node(i)?;
        self.check_node(j)
    }

    pub fn physical(&self, k: usize, i: usize, j: usize) -> PhysicalLink {
        self.physical[self.index(k, i, j)]
    }

    /// Set the physical availability of pair (i, j) in state k, keeping
    /// the matrix symmetric. Removing a link also deselects it.
    pub fn set_physical(&mut self, k: usize, i: usize, j: usize, link: PhysicalLink) -> Result<(), TopologyError> {
        self.check_pair(k, i, j)?;
        if i == j && link.is_present() {
            return Err(TopologyError::SelfLink { node: i });
        }
        let (a, b) = (self.index(k, i, j), self.index(k, j, i));
        self.physical[a] = link;
        self.physical[b] = link;
        if !link.is_present() {
            self.logical[a] = false;
            self.logical[b] = false;
        }
        Ok(())
    }

    pub fn is_logical(&self, k: usize, i: usize, j: usize) -> bool {
        self.logical[self.index(k, i, j)]
    }

    /// Select or deselect the logical link (i, j) in state k.
    pub fn set_logical(&mut self, k: usize, i: usize, j: usize, active: bool) -> Result<(), TopologyError> {
        self.check_pair(k, i, j)?;
        if active && !self.physical(k, i, j).is_present() {
            return Err(TopologyError::NotPhysical { state: k, i, j });
        }
        let (a, b) = (self.index(k, i, j), self.index(k, j, i));
        self.logical[a] = active;
        self.logical[b] = active;
        Ok(())
    }

    /// Whether routing may use pair (i, j) in state k: the logical link
    /// once the topology has been solved, the physical one before.
    pub fn is_active(&self, k: usize, i: usize, j: usize) -> bool {
        if self.solved {
            self.is_logical(k, i, j)
        } else {
            self.physical(k, i, j).is_present()
        }
    }

    pub fn weight(&self, k: usize, i: usize, j: usize) -> u32 {
        self.weights[self.index(k, i, j)]
    }

    pub fn set_weight(&mut self, k: usize, i: usize, j: usize, weight: u32) -> Result<(), TopologyError> {
        self.check_pair(k, i, j)?;
        let (a, b) = (self.index(k, i, j), self.index(k, j, i));
        self.weights[a] = weight;
        self.weights[b] = weight;
        Ok(())
    }

    /// Draw every arc weight uniformly from `range`, symmetrically.
    pub fn set_random_weights<R: Rng>(&mut self, range: RangeInclusive<u32>, rng: &mut R) -> Result<(), TopologyError> {
        let (low, high) = (*range.start(), *range.end());
        if low > high {
            return Err(TopologyError::InvalidWeightRange { low, high, reason: "low weight exceeds high weight" });
        }
        if high >= MAX_RANDOM_WEIGHT {
            return Err(TopologyError::InvalidWeightRange { low, high, reason: "high weight must stay below 100" });
        }

        let n = self.node_count();
        for k in 0..self.state_count() {
            for i in 0..n {
                for j in i..n {
                    let w = rng.gen_range(low..=high);
                    let (a, b) = (self.index(k, i, j), self.index(k, j, i));
                    self.weights[a] = w;
                    self.weights[b] = w;
                }
            }
        }
        Ok(())
    }

    pub fn capacity(&self, node: usize) -> u32 {
        self.capacity[node]
    }

    pub fn capacities(&self) -> &[u32] {
        &self.capacity
    }

    pub fn set_capacity(&mut self, node: usize, capacity: u32) -> Result<(), TopologyError> {
        self.check_node(node)?;
        if capacity == 0 {
            return Err(TopologyError::ZeroCapacity { node });
        }
        self.capacity[node] = capacity;
        Ok(())
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn set_solved(&mut self, solved: bool) {
        self.solved = solved;
    }

    pub fn physical_neighbours(&self, k: usize, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.node_count()).filter(move |&j| self.physical(k, i, j).is_present())
    }

    pub fn logical_neighbours(&self, k: usize, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.node_count()).filter(move |&j| self.is_logical(k, i, j))
    }

    pub fn logical_degree(&self, k: usize, i: usize) -> usize {
        self.logical_neighbours(k, i).count()
    }

    /// Every physically possible undirected arc as `(state, i, j)` with `i < j`.
    pub fn physical_arcs(&self) -> Vec<(usize, usize, usize)> {
        let n = self.node_count();
        let mut arcs = Vec::new();
        for k in 0..self.state_count() {
            for i in 0..n {
                for j in (i + 1)..n {
                    if self.physical(k, i, j).is_present() {
                        arcs.push((k, i, j));
                    }
                }
            }
        }
        arcs
    }

    /// Deselect every logical link of state k.
    pub fn clear_state(&mut self, k: usize) {
        let n = self.node_count();
        let start = self.index(k, 0, 0);
        self.logical[start..start + n * n].fill(false);
    }

    /// Deselect every logical link and mark the topology unsolved.
    pub fn clear_logical(&mut self) {
        self.logical.fill(false);
        self.solved = false;
    }

    /// Copy the physical adjacency into the logical one.
    pub fn phy_to_log(&mut self) {
        for (logical, physical) in self.logical.iter_mut().zip(&self.physical) {
            *logical = physical.is_present();
        }
        self.solved = true;
    }

    /// Split every state longer than `max_time` into consecutive states of
    /// at most `max_time`, copying adjacency and weights into each piece.
    pub fn fractionate(&mut self, max_time: u64) -> Result<(), TopologyError> {
        if max_time == 0 {
            return Err(TopologyError::InvalidMaxTime);
        }
        let n = self.node_count();
        let block = n * n;
        let mut durations = Vec::new();
        let mut physical = Vec::new();
        let mut logical = Vec::new();
        let mut weights = Vec::new();

        for (k, &t) in self.durations.iter().enumerate() {
            let range = k * block..(k + 1) * block;
            let mut remaining = t;
            while remaining > 0 {
                let piece = remaining.min(max_time);
                durations.push(piece);
                physical.extend_from_slice(&self.physical[range.clone()]);
                logical.extend_from_slice(&self.logical[range.clone()]);
                weights.extend_from_slice(&self.weights[range.clone()]);
                remaining -= piece;
            }
        }

        log::info!(
            "Fractionated {} states into {} states of at most {} time units",
            self.durations.len(),
            durations.len(),
            max_time
        );
        self.durations = durations;
        self.physical = physical;
        self.logical = logical;
        self.weights = weights;
        Ok(())
    }

    /// Verify that the physical and logical adjacency and the arc weights
    /// are symmetric in every state.
    pub fn check_symmetry(&self) -> Result<(), TopologyError> {
        let n = self.node_count();
        for k in 0..self.state_count() {
            for i in 0..n {
                for j in (i + 1)..n {
                    let (a, b) = (self.index(k, i, j), self.index(k, j, i));
                    let matrix = if self.physical[a] != self.physical[b] {
                        "physical"
                    } else if self.logical[a] != self.logical[b] {
                        "logical"
                    } else if self.weights[a] != self.weights[b] {
                        "weight"
                    } else {
                        continue;
                    };
                    return Err(TopologyError::Asymmetric { matrix, state: k, i, j });
                }
            }
        }
        Ok(())
    }

    /// First `(state, node)` whose logical degree exceeds its interface
    /// capacity, if any.
    pub fn capacity_violation(&self) -> Option<(usize, usize)> {
        for k in 0..self.state_count() {
            for i in 0..self.node_count() {
                if self.logical_degree(k, i) > self.capacity[i] as usize {
                    return Some((k, i));
                }
            }
        }
        None
    }

    pub fn respects_capacity(&self) -> bool {
        self.capacity_violation().is_none()
    }

    pub fn snapshot_logical(&self) -> LogicalSnapshot {
        LogicalSnapshot { links: self.logical.clone(), solved: self.solved }
    }

    pub fn restore_logical(&mut self, snapshot: &LogicalSnapshot) {
        self.logical.copy_from_slice(&snapshot.links);
        self.solved = snapshot.solved;
    }

    /// Raw physical matrix of one state, row-major.
    pub(crate) fn physical_block_mut(&mut self, k: usize) -> &mut [PhysicalLink] {
        let n = self.node_count();
        let start = self.index(k, 0, 0);
        &mut self.physical[start..start + n * n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line_topology() -> TimeExpandedTopology {
        let mut topo = TimeExpandedTopology::new(3, 0, vec![5, 7]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(1, 1, 2, PhysicalLink::Present).unwrap();
        topo
    }

    #[test]
    fn test_new_blocks_diagonal() {
        let topo = TimeExpandedTopology::new(2, 1, vec![3]).unwrap();
        for i in 0..3 {
            assert_eq!(topo.physical(0, i, i), PhysicalLink::Blocked);
        }
        assert_eq!(topo.physical(0, 0, 1), PhysicalLink::Absent);
        assert_eq!(topo.capacity(2), 1);
        assert_eq!(topo.node_class(0), NodeClass::Terminal);
        assert_eq!(topo.node_class(1), NodeClass::Satellite);
    }

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(matches!(TimeExpandedTopology::new(0, 0, vec![1]), Err(TopologyError::NoNodes)));
        assert!(matches!(TimeExpandedTopology::new(2, 0, vec![]), Err(TopologyError::NoStates)));
        assert!(matches!(
            TimeExpandedTopology::new(2, 0, vec![4, 0]),
            Err(TopologyError::ZeroDuration { state: 1 })
        ));
    }

    #[test]
    fn test_set_physical_is_symmetric() {
        let topo = line_topology();
        assert!(topo.physical(0, 1, 0).is_present());
        assert!(topo.physical(1, 2, 1).is_present());
        assert!(topo.check_symmetry().is_ok());
    }

    #[test]
    fn test_self_link_rejected() {
        let mut topo = line_topology();
        assert!(matches!(
            topo.set_physical(0, 1, 1, PhysicalLink::Present),
            Err(TopologyError::SelfLink { node: 1 })
        ));
    }

    #[test]
    fn test_logical_requires_physical() {
        let mut topo = line_topology();
        assert!(topo.set_logical(0, 0, 1, true).is_ok());
        assert!(topo.is_logical(0, 1, 0));
        assert!(matches!(
            topo.set_logical(1, 0, 1, true),
            Err(TopologyError::NotPhysical { state: 1, i: 0, j: 1 })
        ));
    }

    #[test]
    fn test_removing_physical_deselects() {
        let mut topo = line_topology();
        topo.set_logical(0, 0, 1, true).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Absent).unwrap();
        assert!(!topo.is_logical(0, 0, 1));
        assert!(!topo.is_logical(0, 1, 0));
    }

    #[test]
    fn test_out_of_range_indices() {
        let mut topo = line_topology();
        assert!(matches!(
            topo.set_weight(2, 0, 1, 3),
            Err(TopologyError::StateOutOfRange { state: 2, states: 2 })
        ));
        assert!(matches!(
            topo.set_capacity(5, 2),
            Err(TopologyError::NodeOutOfRange { node: 5, nodes: 3 })
        ));
        assert!(matches!(topo.set_capacity(0, 0), Err(TopologyError::ZeroCapacity { node: 0 })));
    }

    #[test]
    fn test_asymmetry_detected() {
        let mut topo = line_topology();
        let n = topo.node_count();
        topo.physical_block_mut(0)[2 * n] = PhysicalLink::Present;
        match topo.check_symmetry() {
            Err(TopologyError::Asymmetric { matrix, state, i, j }) => {
                assert_eq!((matrix, state, i, j), ("physical", 0, 0, 2));
            }
            other => panic!("expected asymmetry, got {:?}", other),
        }
    }

    #[test]
    fn test_random_weights_symmetric_and_bounded() {
        let mut topo = TimeExpandedTopology::new(4, 1, vec![1, 2, 3]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        topo.set_random_weights(3..=9, &mut rng).unwrap();
        for k in 0..3 {
            for i in 0..5 {
                for j in 0..5 {
                    let w = topo.weight(k, i, j);
                    assert!((3..=9).contains(&w));
                    assert_eq!(w, topo.weight(k, j, i));
                }
            }
        }
    }

    #[test]
    fn test_random_weights_rejects_bad_range() {
        let mut topo = line_topology();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(topo.set_random_weights(5..=2, &mut rng).is_err());
        assert!(topo.set_random_weights(1..=100, &mut rng).is_err());
    }

    #[test]
    fn test_phy_to_log_and_clear() {
        let mut topo = line_topology();
        topo.phy_to_log();
        assert!(topo.is_solved());
        assert!(topo.is_logical(0, 0, 1));
        assert!(topo.is_logical(1, 1, 2));
        assert!(!topo.is_logical(0, 0, 0));

        topo.clear_logical();
        assert!(!topo.is_solved());
        assert!(!topo.is_logical(0, 0, 1));
    }

    #[test]
    fn test_is_active_follows_solved_flag() {
        let mut topo = line_topology();
        assert!(topo.is_active(0, 0, 1));
        topo.set_solved(true);
        assert!(!topo.is_active(0, 0, 1));
        topo.set_logical(0, 0, 1, true).unwrap();
        assert!(topo.is_active(0, 0, 1));
    }

    #[test]
    fn test_capacity_violation() {
        let mut topo = TimeExpandedTopology::new(3, 0, vec![1]).unwrap();
        topo.set_physical(0, 0, 1, PhysicalLink::Present).unwrap();
        topo.set_physical(0, 0, 2, PhysicalLink::Present).unwrap();
        topo.set_logical(0, 0, 1, true).unwrap();
        assert!(topo.respects_capacity());
        topo.set_logical(0, 0, 2, true).unwrap();
        assert_eq!(topo.capacity_violation(), Some((0, 0)));
        topo.set_capacity(0, 2).unwrap();
        assert!(topo.respects_capacity());
    }

    #[test]
    fn test_fractionate_splits_long_states() {
        let mut topo = line_topology();
        topo.set_weight(1, 1, 2, 9).unwrap();
        topo.fractionate(3).unwrap();
        assert_eq!(topo.durations(), &[3, 2, 3, 3, 1]);
        assert!(topo.physical(1, 0, 1).is_present());
        assert!(!topo.physical(2, 0, 1).is_present());
        for k in 2..5 {
            assert!(topo.physical(k, 1, 2).is_present());
            assert_eq!(topo.weight(k, 2, 1), 9);
        }
        assert_eq!(topo.total_time(), 12);
        assert!(matches!(topo.fractionate(0), Err(TopologyError::InvalidMaxTime)));
    }

    #[test]
    fn test_state_starts() {
        let topo = line_topology();
        assert_eq!(topo.state_starts(), vec![0, 5, 12]);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut topo = line_topology();
        topo.set_solved(true);
        topo.set_logical(0, 0, 1, true).unwrap();
        let snapshot = topo.snapshot_logical();
        topo.clear_logical();
        topo.set_logical(1, 1, 2, true).unwrap();
        topo.restore_logical(&snapshot);
        assert!(topo.is_logical(0, 0, 1));
        assert!(!topo.is_logical(1, 1, 2));
        assert!(topo.is_solved());
    }
}
