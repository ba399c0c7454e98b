//! Strategy comparison study over random topologies.
//!
//! Generates batches of seeded random topologies and compares the logical
//! topologies chosen by each strategy on max average delay, max delay,
//! unrouted entries and the Jain index of link time.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use dtntopo::config::SolveStrategy;
use dtntopo::optimizer::{exhaustive_search, Acceptance, Evaluation, LocalSearch, Objective, MAX_EXHAUSTIVE_ARCS};
use dtntopo::topology::{RandomTopology, TimeExpandedTopology};

#[derive(Parser)]
#[command(name = "topo-compare")]
#[command(about = "Compare topology strategies over random satellite topologies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Random topologies per comparison point
    #[arg(short = 'n', long, default_value = "10")]
    topologies: usize,

    #[arg(long, default_value = "5")]
    satellites: usize,

    #[arg(long, default_value = "1")]
    terminals: usize,

    #[arg(long, default_value = "10")]
    states: usize,

    /// Shortest and longest state duration
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], default_values_t = [10, 20])]
    durations: Vec<u64>,

    /// Local-search iteration budget
    #[arg(long, default_value = "500")]
    iterations: usize,

    /// Candidates per steepest-descent iteration
    #[arg(long, default_value = "20")]
    neighbours: usize,

    /// Initial annealing temperature
    #[arg(long, default_value = "80")]
    max_temp: f64,

    /// Also run exhaustive search when the topology is small enough
    #[arg(long)]
    exhaustive: bool,

    #[arg(long, default_value = "1")]
    seed: u64,

    /// Output directory for the comparison report
    #[arg(short, long, default_value = "compare_output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare strategies at one link density
    Run {
        /// Link density in percent
        #[arg(long, default_value = "30")]
        density: u32,
    },

    /// Repeat the comparison over a range of link densities
    Sweep {
        #[arg(long, default_value = "10")]
        from: u32,

        #[arg(long, default_value = "50")]
        to: u32,

        #[arg(long, default_value = "10")]
        step: u32,
    },
}

/// One compared strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Method {
    Physical,
    Fairness,
    AnnealingDelay,
    AnnealingDelayJain,
    FirstImprovement,
    SteepestDescent,
    Exhaustive,
}

/// Mean figures of one method over a batch
#[derive(Debug, Clone, Serialize)]
struct MethodSummary {
    method: Method,
    samples: usize,
    max_avg_delay: f64,
    max_max_delay: f64,
    unrouted: f64,
    jain: f64,
}

#[derive(Debug, Clone, Serialize)]
struct ComparisonPoint {
    link_density: u32,
    methods: Vec<MethodSummary>,
}

#[derive(Debug, Serialize)]
struct ComparisonReport {
    parameters: RandomTopology,
    topologies: usize,
    iterations: usize,
    seed: u64,
    points: Vec<ComparisonPoint>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    let densities: Vec<u32> = match &cli.command {
        Commands::Run { density } => vec![*density],
        Commands::Sweep { from, to, step } => (*from..=*to).step_by((*step).max(1) as usize).collect(),
    };

    let parameters = RandomTopology {
        satellites: cli.satellites,
        terminals: cli.terminals,
        states: cli.states,
        weight_range: (1, 1),
        duration_range: (cli.durations[0], cli.durations[1]),
        link_density: 0,
    };

    let mut points = Vec::with_capacity(densities.len());
    for density in densities {
        log::info!("Comparing strategies at {}% link density", density);
        let params = RandomTopology { link_density: density, ..parameters.clone() };
        points.push(compare_point(&cli, &params)?);
    }

    let report = ComparisonReport {
        parameters,
        topologies: cli.topologies,
        iterations: cli.iterations,
        seed: cli.seed,
        points,
    };

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output directory: {}", cli.output.display()))?;
    write_json(&report, &cli.output.join("comparison.json"))?;
    let text = render_text(&report);
    let text_path = cli.output.join("comparison.txt");
    fs::write(&text_path, &text)
        .with_context(|| format!("Failed to write comparison summary to {}", text_path.display()))?;

    println!("{}", text);
    Ok(())
}

fn compare_point(cli: &Cli, params: &RandomTopology) -> Result<ComparisonPoint> {
    let mut samples: Vec<(Method, Vec<Evaluation>)> = Vec::new();
    let mut record = |method: Method, evaluation: Evaluation| match samples.iter().position(|(m, _)| *m == method) {
        Some(slot) => samples[slot].1.push(evaluation),
        None => samples.push((method, vec![evaluation])),
    };

    for index in 0..cli.topologies {
        let seed = cli.seed.wrapping_add(index as u64).wrapping_add(u64::from(params.link_density) << 32);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut base = params.generate(&mut rng).context("Failed to generate random topology")?;
        base.set_name(format!("compare_{:04}_{:04}", params.link_density, index));

        let mut physical = base.clone();
        SolveStrategy::Physical.solve(&mut physical)?;
        record(Method::Physical, Evaluation::of(&physical));

        let mut fairness = base.clone();
        SolveStrategy::Fairness.solve(&mut fairness)?;
        record(Method::Fairness, Evaluation::of(&fairness));

        let searches = [
            (Method::AnnealingDelay, Objective::MaxAvgDelay, Acceptance::SimulatedAnnealing { max_temp: cli.max_temp }),
            (Method::AnnealingDelayJain, Objective::AvgDelayJain, Acceptance::SimulatedAnnealing { max_temp: cli.max_temp }),
            (Method::FirstImprovement, Objective::AvgDelayJain, Acceptance::FirstImprovement),
            (Method::SteepestDescent, Objective::AvgDelayJain, Acceptance::SteepestDescent { neighbours: cli.neighbours }),
        ];
        for (method, objective, acceptance) in searches {
            let best = run_search(&base, objective, acceptance, cli.iterations, &mut rng)?;
            record(method, best);
        }

        if cli.exhaustive && base.physical_arcs().len() <= MAX_EXHAUSTIVE_ARCS {
            let mut topology = base.clone();
            let outcome = exhaustive_search(&mut topology, Objective::MaxAvgDelay)?;
            record(Method::Exhaustive, outcome.best);
        }
    }

    let methods = samples.into_iter().map(|(method, list)| summarise(method, &list)).collect();
    Ok(ComparisonPoint { link_density: params.link_density, methods })
}

fn run_search(
    base: &TimeExpandedTopology,
    objective: Objective,
    acceptance: Acceptance,
    iterations: usize,
    rng: &mut StdRng,
) -> Result<Evaluation> {
    let mut topology = base.clone();
    let outcome = LocalSearch::new(objective, acceptance, iterations).run(&mut topology, rng)?;
    Ok(outcome.best)
}

fn summarise(method: Method, evaluations: &[Evaluation]) -> MethodSummary {
    let n = evaluations.len().max(1) as f64;
    let mean = |f: fn(&Evaluation) -> f64| evaluations.iter().map(f).sum::<f64>() / n;
    MethodSummary {
        method,
        samples: evaluations.len(),
        max_avg_delay: mean(|e| e.max_avg_delay as f64),
        max_max_delay: mean(|e| e.max_max_delay as f64),
        unrouted: mean(|e| e.unrouted as f64),
        jain: mean(|e| e.jain),
    }
}

fn write_json(report: &ComparisonReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize comparison to JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write comparison to {}", path.display()))?;
    log::info!("Comparison written to {}", path.display());
    Ok(())
}

fn render_text(report: &ComparisonReport) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(80));
    lines.push(format!("{:^80}", "TOPOLOGY STRATEGY COMPARISON"));
    lines.push("=".repeat(80));
    let p = &report.parameters;
    lines.push(format!(
        "{} satellites, {} terminals, {} states, durations {}..={}",
        p.satellites, p.terminals, p.states, p.duration_range.0, p.duration_range.1
    ));
    lines.push(format!(
        "{} topologies per point, {} search iterations, seed {}",
        report.topologies, report.iterations, report.seed
    ));

    for point in &report.points {
        lines.push(String::new());
        lines.push(format!("Link density {}%", point.link_density));
        lines.push("-".repeat(80));
        lines.push(format!(
            "{:<24} {:>8} {:>12} {:>12} {:>10} {:>8}",
            "method", "samples", "max avg", "max max", "unrouted", "jain"
        ));
        for m in &point.methods {
            lines.push(format!(
                "{:<24} {:>8} {:>12.2} {:>12.2} {:>10.2} {:>8.4}",
                format!("{:?}", m.method),
                m.samples,
                m.max_avg_delay,
                m.max_max_delay,
                m.unrouted,
                m.jain
            ));
        }
    }

    lines.join("\n")
}
