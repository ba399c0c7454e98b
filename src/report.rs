//! Report generation for solved topologies.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use crate::config::SolveStrategy;
use crate::optimizer::{ExhaustiveOutcome, SearchOutcome};
use crate::routing::{DeliveryEstimate, RouteStats, RouteTable};
use crate::stats::{link_stats, LinkStats};
use crate::topology::TimeExpandedTopology;

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub name: String,
    pub satellites: usize,
    pub terminals: usize,
    pub states: usize,
    pub total_time: u64,
    pub seed: u64,
    pub strategy: SolveStrategy,
    pub contacts: usize,
}

/// A link that carries no relayed route, with its 1-based state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnusedLink {
    pub state: usize,
    pub a: usize,
    pub b: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub routes: RouteStats,
    pub links: LinkStats,
    pub unused_links: Vec<UnusedLink>,
    pub unresolved_chains: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_search: Option<SearchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhaustive: Option<ExhaustiveOutcome>,
    pub queries: Vec<DeliveryEstimate>,
}

impl RunReport {
    /// Summarise a solved topology and its route table.
    pub fn new(metadata: ReportMetadata, topology: &TimeExpandedTopology, table: &RouteTable) -> Self {
        let unused_links = table
            .unused_links(topology)
            .into_iter()
            .map(|(k, a, b)| UnusedLink { state: k + 1, a, b })
            .collect();
        Self {
            metadata,
            routes: table.stats(),
            links: link_stats(topology),
            unused_links,
            unresolved_chains: table.unresolved_chains(),
            local_search: None,
            exhaustive: None,
            queries: Vec::new(),
        }
    }
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push("=".repeat(80));
    lines.push(format!("{:^80}", title));
    lines.push("=".repeat(80));
    lines.push(String::new());
}

fn optional(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Generate JSON report
pub fn generate_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Render the human-readable text report
pub fn render_text_report(report: &RunReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    let meta = &report.metadata;

    section(&mut lines, "DTN TOPOLOGY REPORT");
    lines.push(format!("Topology: {}", meta.name));
    lines.push(format!("Nodes: {} satellites, {} terminals", meta.satellites, meta.terminals));
    lines.push(format!("States: {} ({} time units)", meta.states, meta.total_time));
    lines.push(format!("Strategy: {:?}", meta.strategy));
    lines.push(format!("Seed: {}", meta.seed));
    lines.push(format!("Contacts: {}", meta.contacts));
    lines.push(String::new());

    section(&mut lines, "ROUTING");
    lines.push(format!("Max average delay: {}", report.routes.max_avg_delay));
    lines.push(format!("Max maximum delay: {}", report.routes.max_max_delay));
    lines.push(format!("Unrouted (state, pair) entries: {}", report.routes.unrouted));
    if report.unresolved_chains > 0 {
        lines.push(format!("Unresolved next-hop chains: {}", report.unresolved_chains));
    }
    lines.push(String::new());
    lines.push(format!("{:>6} {:>6} {:>10} {:>10} {:>10}", "src", "dst", "unrouted", "max", "avg"));
    for pair in &report.routes.pairs {
        lines.push(format!(
            "{:>6} {:>6} {:>10} {:>10} {:>10}",
            pair.source,
            pair.destination,
            pair.unrouted_states,
            optional(pair.max_delay),
            optional(pair.avg_delay)
        ));
    }
    lines.push(String::new());

    if !report.unused_links.is_empty() {
        lines.push("Links carrying no relayed route:".to_string());
        for link in &report.unused_links {
            lines.push(format!("  state {}: {}-{}", link.state, link.a, link.b));
        }
        lines.push(String::new());
    }

    section(&mut lines, "LINK FAIRNESS");
    let links = &report.links;
    lines.push(format!("Physical arcs (all states): {}", links.total_arcs));
    lines.push(format!("Enabled links (all states): {}", links.total_enabled));
    lines.push(format!("Enabled link time: {}", links.total_enabled_time));
    if let (Some((a, b, lo)), Some((c, d, hi))) = (links.min_enabled, links.max_enabled) {
        lines.push(format!("Least enabled pair: {}-{} ({})", a, b, lo));
        lines.push(format!("Most enabled pair: {}-{} ({})", c, d, hi));
    }
    lines.push(format!("Min/max ratio: {:.4}", links.min_max_ratio));
    lines.push(format!("Jain index: {:.4}", links.jain));
    lines.push(String::new());

    if let Some(search) = &report.local_search {
        section(&mut lines, "LOCAL SEARCH");
        lines.push(format!("Method: {:?}", search.acceptance));
        lines.push(format!("Objective: {:?}", search.objective));
        lines.push(format!("Iterations: {} ({:?})", search.iterations, search.termination));
        lines.push(format!("Improvements: {}", search.improvements));
        lines.push(format!(
            "Max average delay: {} -> {}",
            search.initial.max_avg_delay, search.best.max_avg_delay
        ));
        lines.push(format!("Unrouted: {} -> {}", search.initial.unrouted, search.best.unrouted));
        lines.push(format!("Jain index: {:.4} -> {:.4}", search.initial.jain, search.best.jain));
        lines.push(String::new());
    }

    if let Some(search) = &report.exhaustive {
        section(&mut lines, "EXHAUSTIVE SEARCH");
        lines.push(format!("Objective: {:?}", search.objective));
        lines.push(format!("Arcs: {} ({} feasible subsets)", search.arcs, search.feasible));
        lines.push(format!(
            "Max average delay: {} -> {}",
            search.initial.max_avg_delay, search.best.max_avg_delay
        ));
        lines.push(format!("Unrouted: {} -> {}", search.initial.unrouted, search.best.unrouted));
        lines.push(String::new());
    }

    if !report.queries.is_empty() {
        section(&mut lines, "CONTACT GRAPH QUERIES");
        for estimate in &report.queries {
            let q = &estimate.query;
            lines.push(format!(
                "{} -> {} (deadline {}, issued {}): best delivery {}, forfeit {}",
                q.source,
                q.destination,
                q.deadline,
                q.issue_time,
                optional(estimate.best_delivery()),
                optional(estimate.forfeit())
            ));
            for p in &estimate.proximate {
                lines.push(format!(
                    "  via {} (delivery {}, forfeit {})",
                    p.node, p.best_delivery, p.forfeit
                ));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Generate human-readable text report
pub fn generate_text_report(report: &RunReport, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_text_report(report))
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print summary to stdout
pub fn print_summary(report: &RunReport) {
    println!("\n=== {} SUMMARY ===\n", report.metadata.name.to_uppercase());
    println!("States: {}", report.metadata.states);
    println!("Strategy: {:?}", report.metadata.strategy);

    println!("\nRouting:");
    println!("  Max average delay: {}", report.routes.max_avg_delay);
    println!("  Max maximum delay: {}", report.routes.max_max_delay);
    println!("  Unrouted entries: {}", report.routes.unrouted);

    println!("\nFairness:");
    println!("  Jain index: {:.4}", report.links.jain);
    println!("  Min/max ratio: {:.4}", report.links.min_max_ratio);

    if let Some(ref search) = report.local_search {
        println!("\nLocal search ({:?}):", search.termination);
        println!(
            "  Max average delay: {} -> {}",
            search.initial.max_avg_delay, search.best.max_avg_delay
        );
    }

    for estimate in &report.queries {
        println!(
            "\nQuery {} -> {}: best delivery {}",
            estimate.query.source,
            estimate.query.destination,
            optional(estimate.best_delivery())
        );
    }

    println!();
}
