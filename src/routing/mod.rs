//! Routing over solved (or physical) topologies.
//!
//! - `router`: time-respecting all-pairs delays and next hops per state
//! - `contacts`: coalesced contact plans
//! - `contact_graph`: recursive earliest-delivery / forfeit estimates

pub mod contact_graph;
pub mod contacts;
pub mod router;

pub use contact_graph::{estimate, DeliveryEstimate, ProximateNode, RouteQuery, DEFAULT_MAX_DEPTH};
pub use contacts::{Contact, ContactPlan};
pub use router::{compute_routes, LinkUsage, PairDelay, RouteStats, RouteTable, NEXT_HOP_CHAIN_CAP};

/// Errors raised by contact-graph queries
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("contact graph recursion exceeded depth {depth}")]
    RecursionLimit { depth: usize },
    #[error("node {node} does not exist (topology has {nodes} nodes)")]
    UnknownNode { node: usize, nodes: usize },
}
