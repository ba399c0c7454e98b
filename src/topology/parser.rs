//! Loader for the delimited topology text format.
//!
//! The format starts with header lines carrying the node counts, followed
//! by one block per state:
//!
//! ```text
//! numSat=2
//! numET=1
//!
//! *,1,0,
//! 1,*,1,
//! 0,1,*,
//! k=1
//! t=10
//!
//! ```
//!
//! Matrix cells are `*` (no link possible), `0` (absent) or a positive
//! integer (link possible). A row may carry a second, tab-separated block
//! with the logical adjacency, as written by the matrix exporter; when any
//! state has one the topology is loaded as solved.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::model::{PhysicalLink, TimeExpandedTopology};
use super::TopologyError;

/// Errors raised while reading a topology file
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read topology file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("missing header field '{0}'")]
    MissingHeader(&'static str),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Compiled patterns for the header and state terminator lines
struct FormatPatterns {
    /// Match: "numSat=N"
    satellites: Regex,
    /// Match: "numET=N"
    terminals: Regex,
    /// Match: "k=N"
    state: Regex,
    /// Match: "t=N"
    duration: Regex,
}

impl FormatPatterns {
    fn new() -> Self {
        Self {
            satellites: Regex::new(r"numSat\s*=\s*(\d+)").expect("Invalid numSat regex"),
            terminals: Regex::new(r"numET\s*=\s*(\d+)").expect("Invalid numET regex"),
            state: Regex::new(r"^\s*k\s*=\s*(\d+)\s*$").expect("Invalid state regex"),
            duration: Regex::new(r"^\s*t\s*=\s*(\d+)\s*$").expect("Invalid duration regex"),
        }
    }
}

static PATTERNS: LazyLock<FormatPatterns> = LazyLock::new(FormatPatterns::new);

/// One parsed state block before it is committed to a topology
#[derive(Debug, Default)]
struct StateBlock {
    physical: Vec<Vec<PhysicalLink>>,
    logical: Vec<Vec<bool>>,
    duration: Option<u64>,
}

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax { line, message: message.into() }
}

fn parse_cells(segment: &str, line: usize) -> Result<Vec<PhysicalLink>, ParseError> {
    segment
        .split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| {
            if cell == "*" {
                return Ok(PhysicalLink::Blocked);
            }
            match cell.parse::<i64>() {
                Ok(v) if v < 0 => Ok(PhysicalLink::Blocked),
                Ok(0) => Ok(PhysicalLink::Absent),
                Ok(_) => Ok(PhysicalLink::Present),
                Err(_) => Err(syntax(line, format!("invalid matrix cell '{}'", cell))),
            }
        })
        .collect()
}

fn header_value(input: &str, pattern: &Regex, name: &'static str) -> Result<usize, ParseError> {
    let caps = pattern.captures(input).ok_or(ParseError::MissingHeader(name))?;
    caps[1].parse().map_err(|_| ParseError::MissingHeader(name))
}

/// Parse a topology from the text format.
///
/// # Returns
/// * `Ok(TimeExpandedTopology)` with physical (and optionally logical)
///   adjacency, durations and unit weights
/// * `Err(ParseError)` on malformed input or an asymmetric matrix
pub fn parse_topology(input: &str) -> Result<TimeExpandedTopology, ParseError> {
    let satellites = header_value(input, &PATTERNS.satellites, "numSat")?;
    let terminals = header_value(input, &PATTERNS.terminals, "numET")?;
    let nodes = satellites + terminals;

    let mut states: Vec<StateBlock> = Vec::new();
    let mut current = StateBlock::default();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        if let Some(caps) = PATTERNS.state.captures(line) {
            let k: usize = caps[1].parse().map_err(|_| syntax(line_no, "invalid state index"))?;
            if k != states.len() + 1 {
                return Err(syntax(line_no, format!("expected state k={}, found k={}", states.len() + 1, k)));
            }
            if current.physical.len() != nodes {
                return Err(syntax(
                    line_no,
                    format!("state {} has {} rows, expected {}", k, current.physical.len(), nodes),
                ));
            }
            if !current.logical.is_empty() && current.logical.len() != nodes {
                return Err(syntax(
                    line_no,
                    format!("state {} has {} logical rows, expected 0 or {}", k, current.logical.len(), nodes),
                ));
            }
            states.push(std::mem::take(&mut current));
            continue;
        }

        if let Some(caps) = PATTERNS.duration.captures(line) {
            let t: u64 = caps[1].parse().map_err(|_| syntax(line_no, "invalid state duration"))?;
            let last = states.last_mut().ok_or_else(|| syntax(line_no, "duration before any state"))?;
            if last.duration.replace(t).is_some() {
                return Err(syntax(line_no, "state has two durations"));
            }
            continue;
        }

        // Header fields such as numSat= and numET=
        if line.contains('=') {
            continue;
        }

        let mut segments = line.split('\t').filter(|s| !s.trim().is_empty());
        let physical_row = match segments.next() {
            Some(segment) => parse_cells(segment, line_no)?,
            None => continue,
        };
        if physical_row.len() != nodes {
            return Err(syntax(line_no, format!("row has {} cells, expected {}", physical_row.len(), nodes)));
        }
        if let Some(segment) = segments.next() {
            let logical_row: Vec<bool> = parse_cells(segment, line_no)?.iter().map(|l| l.is_present()).collect();
            if logical_row.len() != nodes {
                return Err(syntax(line_no, format!("logical row has {} cells, expected {}", logical_row.len(), nodes)));
            }
            current.logical.push(logical_row);
        }
        current.physical.push(physical_row);
    }

    if !current.physical.is_empty() {
        return Err(syntax(input.lines().count(), "trailing matrix rows without k= line"));
    }

    let mut durations = Vec::with_capacity(states.len());
    for (k, block) in states.iter().enumerate() {
        match block.duration {
            Some(t) => durations.push(t),
            None => return Err(syntax(0, format!("state {} has no t= line", k + 1))),
        }
    }

    let mut topology = TimeExpandedTopology::new(satellites, terminals, durations)?;
    let mut solved = false;
    for (k, block) in states.iter().enumerate() {
        let cells = topology.physical_block_mut(k);
        for (i, row) in block.physical.iter().enumerate() {
            for (j, &link) in row.iter().enumerate() {
                cells[i * nodes + j] = if i == j { PhysicalLink::Blocked } else { link };
            }
        }
    }
    topology.check_symmetry()?;

    for (k, block) in states.iter().enumerate() {
        if block.logical.is_empty() {
            continue;
        }
        solved = true;
        for i in 0..nodes {
            for j in (i + 1)..nodes {
                if block.logical[i][j] != block.logical[j][i] {
                    return Err(TopologyError::Asymmetric { matrix: "logical", state: k, i, j }.into());
                }
                if block.logical[i][j] {
                    topology.set_logical(k, i, j, true)?;
                }
            }
        }
    }
    topology.set_solved(solved);

    log::debug!(
        "Parsed topology with {} satellites, {} terminals and {} states",
        satellites,
        terminals,
        topology.state_count()
    );
    Ok(topology)
}

/// Read and parse a topology file. The topology is named after the file stem.
pub fn parse_topology_file(path: &Path) -> Result<TimeExpandedTopology, ParseError> {
    let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut topology = parse_topology(&content)?;
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        topology.set_name(stem);
    }
    log::info!(
        "Loaded topology '{}' from {}: {} nodes, {} states, {} time units",
        topology.name(),
        path.display(),
        topology.node_count(),
        topology.state_count(),
        topology.total_time()
    );
    Ok(topology)
}
