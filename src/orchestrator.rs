//! Run orchestrator.
//!
//! This module coordinates one configured run, from building the physical
//! topology through solving, optional optimisation, routing and contact
//! queries, to writing the requested artifacts.

use crate::config::RunConfig;
use crate::config_loader::build_topology;
use crate::optimizer::{exhaustive_search, LocalSearch};
use crate::report::{generate_json_report, generate_text_report, ReportMetadata, RunReport};
use crate::routing::{compute_routes, estimate, ContactPlan, DEFAULT_MAX_DEPTH};
use crate::topology::export::{generate_dot, generate_ion, generate_matrix};
use crate::topology::TimeExpandedTopology;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_TEXT: &str = "report.txt";
pub const MATRIX_FILE: &str = "logical.txt";
pub const DOT_FILE: &str = "topology.dot";
pub const ION_FILE: &str = "contacts.ion";

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunOutput {
    pub topology: TimeExpandedTopology,
    pub plan: ContactPlan,
    pub report: RunReport,
    /// Artifacts written to the output directory
    pub artifacts: Vec<PathBuf>,
}

/// Execute the run described by `config`.
///
/// Relative topology paths resolve against `base_dir`; artifacts land in
/// `output_dir`, which is created if needed.
pub fn run_pipeline(config: &RunConfig, base_dir: &Path, output_dir: &Path) -> Result<RunOutput> {
    let seed = config.general.seed;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut topology = build_topology(config, base_dir, &mut rng)?;
    info!(
        "Topology '{}': {} satellites, {} terminals, {} states over {} time units",
        topology.name(),
        topology.satellites(),
        topology.terminals(),
        topology.state_count(),
        topology.total_time()
    );

    let strategy = config.solver.strategy;
    strategy
        .solve(&mut topology)
        .wrap_err_with(|| format!("Failed to solve topology with strategy {:?}", strategy))?;
    info!("Solved logical topology with {:?}", strategy);

    let mut local_search = None;
    let mut exhaustive = None;
    if let Some(optimizer) = &config.optimizer {
        // Both searches restart from the fairness schedule
        match optimizer.acceptance() {
            Some(acceptance) => {
                let search = LocalSearch::new(optimizer.objective, acceptance, optimizer.iterations);
                let outcome = search.run(&mut topology, &mut rng).wrap_err("Local search failed")?;
                local_search = Some(outcome);
            }
            None => {
                let outcome = exhaustive_search(&mut topology, optimizer.objective).wrap_err("Exhaustive search failed")?;
                exhaustive = Some(outcome);
            }
        }
    }

    let table = compute_routes(&topology);
    let plan = ContactPlan::from_topology(&topology);
    config.general.limits.check_contacts(plan.len())?;
    info!("Contact plan holds {} contacts", plan.len());

    let mut queries = Vec::with_capacity(config.queries.len());
    for query in &config.queries {
        let result = estimate(&plan, topology.node_count(), *query, DEFAULT_MAX_DEPTH)
            .wrap_err_with(|| format!("Contact graph query {} -> {} failed", query.source, query.destination))?;
        queries.push(result);
    }

    let metadata = ReportMetadata {
        name: topology.name().to_string(),
        satellites: topology.satellites(),
        terminals: topology.terminals(),
        states: topology.state_count(),
        total_time: topology.total_time(),
        seed,
        strategy,
        contacts: plan.len(),
    };
    let mut report = RunReport::new(metadata, &topology, &table);
    report.local_search = local_search;
    report.exhaustive = exhaustive;
    report.queries = queries;

    let artifacts = write_artifacts(config, &topology, &plan, &report, output_dir)?;

    Ok(RunOutput { topology, plan, report, artifacts })
}

/// Write the artifacts enabled in `config.output` and return their paths.
pub fn write_artifacts(
    config: &RunConfig,
    topology: &TimeExpandedTopology,
    plan: &ContactPlan,
    report: &RunReport,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", output_dir.display()))?;

    let mut written = Vec::new();
    let output = &config.output;

    if output.report {
        let json_path = output_dir.join(REPORT_JSON);
        generate_json_report(report, &json_path)?;
        written.push(json_path);

        let text_path = output_dir.join(REPORT_TEXT);
        generate_text_report(report, &text_path)?;
        written.push(text_path);
    }

    let mut artifacts: Vec<(&str, String)> = Vec::new();
    if output.matrix {
        artifacts.push((MATRIX_FILE, generate_matrix(topology, true)));
    }
    if output.dot {
        artifacts.push((DOT_FILE, generate_dot(topology)));
    }
    if output.ion {
        artifacts.push((ION_FILE, generate_ion(topology, plan)));
    }

    for (file, contents) in artifacts {
        let path = output_dir.join(file);
        fs::write(&path, contents).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}
