use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::{Path, PathBuf};

use dtntopo::config_loader;
use dtntopo::orchestrator::run_pipeline;
use dtntopo::report::print_summary;

/// Solve, optimise and route a time-varying satellite topology
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the run configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for reports and artifacts
    #[arg(short, long, default_value = "dtntopo_output")]
    output: PathBuf,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let mut config = config_loader::load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.general.seed = seed;
    }
    if let Some(level) = &args.log_level {
        config.general.log_level = Some(level.clone());
    }
    config.validate()?;

    let level = config.general.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Starting dtntopo");
    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));
    let run = run_pipeline(&config, base_dir, &args.output)?;

    print_summary(&run.report);
    info!("Wrote {} artifacts to {:?}", run.artifacts.len(), args.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["dtntopo", "--config", "run.yaml"]);

        assert_eq!(args.config, PathBuf::from("run.yaml"));
        assert_eq!(args.output, PathBuf::from("dtntopo_output"));
        assert_eq!(args.seed, None);
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "dtntopo",
            "-c", "run.yaml",
            "-o", "out",
            "--seed", "9",
            "--log-level", "debug",
        ]);

        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
