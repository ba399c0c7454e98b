use crate::config::{RunConfig, TopologySource};
use crate::topology::{parse_topology_file, TimeExpandedTopology};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use rand::Rng;
use std::fs::File;
use std::path::Path;

/// Load and parse a run configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<RunConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration file {:?}", config_path))?;

    let config: RunConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration file {:?}", config_path))?;

    config.validate()?;

    Ok(config)
}

/// Build the physical topology a configuration describes.
///
/// Relative topology paths are resolved against `base_dir` (normally the
/// directory holding the configuration file). Random topologies draw from
/// `rng`. Size limits and interface capacities are applied before returning.
pub fn build_topology<R: Rng>(config: &RunConfig, base_dir: &Path, rng: &mut R) -> Result<TimeExpandedTopology> {
    let mut topology = match &config.topology {
        TopologySource::File { path, max_state_time } => {
            let path = if path.is_absolute() { path.clone() } else { base_dir.join(path) };
            let mut topology = parse_topology_file(&path)
                .wrap_err_with(|| format!("Failed to load topology from {:?}", path))?;
            if let Some(max_time) = max_state_time {
                topology.fractionate(*max_time)?;
            }
            topology
        }
        TopologySource::Random(params) => {
            let mut topology = params.generate(rng).wrap_err("Failed to generate random topology")?;
            info!(
                "Generated random topology: {} satellites, {} terminals, {} states",
                params.satellites,
                params.terminals,
                params.states
            );
            topology.set_name(config.name());
            topology
        }
    };

    if let Some(name) = &config.general.name {
        topology.set_name(name.as_str());
    }
    config.general.limits.check_topology(&topology)?;
    config.apply_interfaces(&mut topology)?;

    Ok(topology)
}
