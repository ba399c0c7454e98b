//! Coalesced contact plans.
//!
//! A contact is a maximal interval during which a pair of nodes has an
//! active link. Contacts are built by scanning consecutive states and
//! merging runs of activity per unordered pair.

use serde::Serialize;

use crate::topology::TimeExpandedTopology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub start: u64,
    pub end: u64,
    /// Lower node index of the pair
    pub a: usize,
    /// Higher node index of the pair
    pub b: usize,
}

impl Contact {
    pub fn touches(&self, node: usize) -> bool {
        self.a == node || self.b == node
    }

    /// The endpoint opposite to `node`, if the contact involves it.
    pub fn peer_of(&self, node: usize) -> Option<usize> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn duration(&self) -> u64 {
        self.end - self.start
    }
}

/// Time-ordered list of contacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactPlan {
    contacts: Vec<Contact>,
}

impl ContactPlan {
    /// Build the contact plan of `topology`, using the logical adjacency
    /// once solved and the physical one otherwise.
    pub fn from_topology(topology: &TimeExpandedTopology) -> Self {
        let starts = topology.state_starts();
        let total = topology.total_time();
        let nodes = topology.node_count();
        let mut contacts = Vec::new();

        for a in 0..nodes {
            for b in (a + 1)..nodes {
                let mut open: Option<u64> = None;
                for (k, &start) in starts.iter().take(topology.state_count()).enumerate() {
                    match (topology.is_active(k, a, b), open) {
                        (true, None) => open = Some(start),
                        (false, Some(begin)) => {
                            contacts.push(Contact { start: begin, end: start, a, b });
                            open = None;
                        }
                        _ => {}
                    }
                }
                if let Some(begin) = open {
                    contacts.push(Contact { start: begin, end: total, a, b });
                }
            }
        }

        contacts.sort_by_key(|c| (c.start, c.end));
        log::debug!("Generated {} contacts for topology '{}'", contacts.len(), topology.name());
        Self { contacts }
    }

    pub fn from_contacts(mut contacts: Vec<Contact>) -> Self {
        contacts.sort_by_key(|c| (c.start, c.end));
        Self { contacts }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter()
    }
}
