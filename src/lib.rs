//! # dtntopo - Offline solver and router for time-varying satellite topologies
//!
//! A constellation of satellites and ground terminals is modelled as a
//! sequence of discrete states. In each state some pairs of nodes could
//! link (the physical topology), but every node has only a few interfaces,
//! so a subset of links (the logical topology) has to be chosen.
//!
//! ## Overview
//!
//! The library selects logical topologies with weighted matchings, spreads
//! link time fairly across pairs, improves the result with local search,
//! and routes over the time-expanded graph.
//!
//! ## Architecture
//!
//! - `topology`: time-expanded data model, text-format loader, random
//!   generator and artifact writers
//! - `matching`: exact weighted matching and the greedy fallback
//! - `fairness`: off-time driven link weighting across states
//! - `optimizer`: objectives, acceptance strategies, local and exhaustive search
//! - `routing`: time-respecting all-pairs routing and contact-graph estimates
//! - `stats`: link-usage statistics and the Jain fairness index
//! - `config` / `config_loader`: YAML run configuration
//! - `report`: JSON and text run reports
//! - `orchestrator`: the end-to-end run pipeline
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dtntopo::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("run.yaml"))?;
//! let run = orchestrator::run_pipeline(&config, Path::new("."), Path::new("out"))?;
//! println!("max average delay: {}", run.report.routes.max_avg_delay);
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Library modules return `thiserror` enums next to the code that raises
//! them. The loader, orchestrator and report writers return
//! `color_eyre::Result` with file-level context.

pub mod config;
pub mod config_loader;
pub mod fairness;
pub mod matching;
pub mod optimizer;
pub mod orchestrator;
pub mod report;
pub mod routing;
pub mod stats;
pub mod topology;
