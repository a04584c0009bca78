//! Playguard command-line tooling.
//!
//! Exposes the configuration loader, the scenario simulator and the CLI commands for
//! integration testing.

pub mod cli;
pub mod config;
pub mod errors;
pub mod scenario;

pub use config::{load_config, CliConfig, LoadedConfig};
pub use errors::{ConfigError, ScenarioError};
pub use scenario::{run_scenario, Scenario, SimulateOptions, Simulation, SimulationReport, Step};
