//! Contact-graph route estimation.
//!
//! Starting from the destination, the search walks the contact plan
//! backwards: every contact touching the current frontier node that opens
//! before the deadline either reaches the source directly (the frontier
//! node becomes a proximate node of the source) or extends the search to
//! its other endpoint with the deadline tightened to the contact end.
//! Visited relays are excluded for the remainder of the query.

use serde::{Deserialize, Serialize};

use super::{ContactPlan, RoutingError};

/// Default bound on the recursion depth of one query
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// One source/destination/deadline query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub source: usize,
    pub destination: usize,
    /// Latest contact start time the route may use
    pub deadline: u64,
    /// Contacts opening before this time are ignored
    #[serde(default)]
    pub issue_time: u64,
}

/// First relay of a route option and its time bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProximateNode {
    pub node: usize,
    /// Earliest time the route can deliver to the destination
    pub best_delivery: u64,
    /// Time by which the source must hand the message over
    pub forfeit: u64,
}

/// Result of one contact-graph query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryEstimate {
    pub query: RouteQuery,
    pub proximate: Vec<ProximateNode>,
    /// Nodes excluded while exploring, in visiting order
    pub excluded: Vec<usize>,
}

impl DeliveryEstimate {
    pub fn is_routable(&self) -> bool {
        !self.proximate.is_empty()
    }

    /// Best-case delivery time over all route options.
    pub fn best_delivery(&self) -> Option<u64> {
        self.proximate.iter().map(|p| p.best_delivery).min()
    }

    /// Latest forfeit time over all route options.
    pub fn forfeit(&self) -> Option<u64> {
        self.proximate.iter().map(|p| p.forfeit).max()
    }
}

/// Metrics inherited along one branch of the search
#[derive(Debug, Clone, Copy)]
struct Bounds {
    forfeit: u64,
    best_delivery: u64,
}

impl Bounds {
    fn through(self, start: u64, end: u64) -> Self {
        Self {
            forfeit: self.forfeit.min(end),
            best_delivery: self.best_delivery.max(start),
        }
    }
}

/// Mutable state of one query, threaded through the recursion
struct SearchContext<'a> {
    plan: &'a ContactPlan,
    source: usize,
    issue_time: u64,
    max_depth: usize,
    excluded: Vec<usize>,
    proximate: Vec<ProximateNode>,
}

impl SearchContext<'_> {
    fn is_excluded(&self, node: usize) -> bool {
        self.excluded.contains(&node)
    }

    fn is_proximate(&self, node: usize) -> bool {
        self.proximate.iter().any(|p| p.node == node)
    }

    fn explore(&mut self, frontier: usize, deadline: u64, bounds: Bounds, depth: usize) -> Result<(), RoutingError> {
        if depth >= self.max_depth {
            return Err(RoutingError::RecursionLimit { depth });
        }
        self.excluded.push(frontier);

        let plan = self.plan;
        for contact in plan.iter() {
            if contact.start < self.issue_time || contact.start > deadline {
                continue;
            }
            let Some(peer) = contact.peer_of(frontier) else {
                continue;
            };
            let reached = bounds.through(contact.start, contact.end);

            if peer == self.source {
                if !self.is_proximate(frontier) {
                    log::debug!(
                        "Proximate node {} (delivery {}, forfeit {})",
                        frontier,
                        reached.best_delivery,
                        reached.forfeit
                    );
                    self.proximate.push(ProximateNode {
                        node: frontier,
                        best_delivery: reached.best_delivery,
                        forfeit: reached.forfeit,
                    });
                }
            } else if !self.is_excluded(peer) {
                // The relay must receive the message before the contact closes
                let Some(relay_deadline) = contact.end.min(deadline).checked_sub(1) else {
                    continue;
                };
                self.explore(peer, relay_deadline, reached, depth + 1)?;
            }
        }
        Ok(())
    }
}

/// Estimate the delivery options of `query` over `plan`.
///
/// `nodes` is the node count of the topology the plan was built from.
pub fn estimate(plan: &ContactPlan, nodes: usize, query: RouteQuery, max_depth: usize) -> Result<DeliveryEstimate, RoutingError> {
    for node in [query.source, query.destination] {
        if node >= nodes {
            return Err(RoutingError::UnknownNode { node, nodes });
        }
    }

    let mut context = SearchContext {
        plan,
        source: query.source,
        issue_time: query.issue_time,
        max_depth,
        excluded: Vec::new(),
        proximate: Vec::new(),
    };
    if query.source != query.destination {
        let start = Bounds { forfeit: u64::MAX, best_delivery: 0 };
        context.explore(query.destination, query.deadline, start, 0)?;
    }

    log::info!(
        "Contact graph query {} -> {} (deadline {}): {} route options",
        query.source,
        query.destination,
        query.deadline,
        context.proximate.len()
    );
    Ok(DeliveryEstimate { query, proximate: context.proximate, excluded: context.excluded })
}
