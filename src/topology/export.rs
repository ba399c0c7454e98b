//! Artifact writers for solved topologies.
//!
//! All writers return the artifact as a `String`; callers decide where it
//! is stored.
//! - matrix dump in the loader's text format, optionally with the logical
//!   adjacency as a second tab-separated block per row,
//! - GraphViz DOT with one cluster of nodes per state,
//! - ION contact plan built from a [`ContactPlan`].

use super::model::{NodeClass, PhysicalLink, TimeExpandedTopology};
use crate::routing::ContactPlan;

/// Data rate written on every ION contact line
const ION_CONTACT_RATE: u64 = 100_000;

fn physical_cell(link: PhysicalLink) -> &'static str {
    match link {
        PhysicalLink::Blocked => "*",
        PhysicalLink::Absent => "0",
        PhysicalLink::Present => "1",
    }
}

/// Generate the text-format matrix dump of `topology`.
///
/// With `include_logical` each row is followed by a tab and the logical
/// adjacency row, which the loader reads back as a solved topology.
pub fn generate_matrix(topology: &TimeExpandedTopology, include_logical: bool) -> String {
    let nodes = topology.node_count();
    let mut out = String::new();
    out.push_str(&format!("numSat={}\n", topology.satellites()));
    out.push_str(&format!("numET={}\n", topology.terminals()));
    out.push('\n');

    for k in 0..topology.state_count() {
        for i in 0..nodes {
            for j in 0..nodes {
                out.push_str(physical_cell(topology.physical(k, i, j)));
                out.push(',');
            }
            if include_logical {
                out.push('\t');
                for j in 0..nodes {
                    let cell = match topology.physical(k, i, j) {
                        PhysicalLink::Blocked => "*",
                        _ if topology.is_logical(k, i, j) => "1",
                        _ => "0",
                    };
                    out.push_str(cell);
                    out.push(',');
                }
            }
            out.push('\n');
        }
        out.push_str(&format!("k={}\n", k + 1));
        out.push_str(&format!("t={}\n", topology.duration(k)));
        out.push('\n');
    }
    out
}

fn node_label(topology: &TimeExpandedTopology, node: usize) -> String {
    match topology.node_class(node) {
        NodeClass::Terminal => format!("ET{}", node),
        NodeClass::Satellite => format!("L{}", node),
    }
}

/// Generate GraphViz DOT output. Physical-only arcs are dotted, selected
/// logical links are drawn bold; arc labels carry the weight.
pub fn generate_dot(topology: &TimeExpandedTopology) -> String {
    let nodes = topology.node_count();
    let mut dot = String::new();
    dot.push_str("digraph Topology {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [shape=circle];\n");
    dot.push_str(&format!(
        "    label=\"Dotted = physical links\\nBold = logical links of {}\";\n",
        topology.name()
    ));
    dot.push_str("    labelloc=t;\n");

    for k in 0..topology.state_count() {
        dot.push_str(&format!("\n    subgraph cluster_k{} {{\n", k + 1));
        dot.push_str(&format!("        label=\"k:{} t:{}\";\n", k + 1, topology.duration(k)));
        for i in 0..nodes {
            dot.push_str(&format!("        \"{}.{}\" [label=\"{}\"];\n", i, k + 1, node_label(topology, i)));
        }
        for i in 0..nodes {
            for j in (i + 1)..nodes {
                if !topology.physical(k, i, j).is_present() {
                    continue;
                }
                let style = if topology.is_logical(k, i, j) {
                    "color=black,penwidth=2"
                } else if topology.is_solved() {
                    "style=dotted,fontcolor=grey"
                } else {
                    "fontcolor=grey"
                };
                dot.push_str(&format!(
                    "        \"{}.{}\" -> \"{}.{}\" [dir=none,{},label={}];\n",
                    i,
                    k + 1,
                    j,
                    k + 1,
                    style,
                    topology.weight(k, i, j)
                ));
            }
        }
        dot.push_str("    }\n");
    }

    dot.push_str("}\n");
    dot
}

/// Generate an ION contact plan: one `a contact` line per direction of
/// every contact, then an `a range` line per pair covering the mission.
pub fn generate_ion(topology: &TimeExpandedTopology, plan: &ContactPlan) -> String {
    let nodes = topology.node_count();
    let total = topology.total_time();
    let mut out = String::new();
    out.push_str(&format!("# ION contact plan for {} topology\n", topology.name()));
    out.push_str(&format!(
        "# with {} satellites and {} terminals in {} states\n",
        topology.satellites(),
        topology.terminals(),
        topology.state_count()
    ));
    out.push_str(&format!("# expressed in {} contacts over {} time units.\n", plan.len(), total));

    out.push_str("\n# Add Contacts:\n");
    for c in plan.iter() {
        out.push_str(&format!("a contact +{} +{} {} {} {}\n", c.start, c.end, c.a, c.b, ION_CONTACT_RATE));
        out.push_str(&format!("a contact +{} +{} {} {} {}\n", c.start, c.end, c.b, c.a, ION_CONTACT_RATE));
    }

    out.push_str("\n# Add Ranges:\n");
    for i in 0..nodes {
        for j in (i + 1)..nodes {
            out.push_str(&format!("a range +0 +{} {} {} 1\n", total, i, j));
        }
    }
    out
}
