use clap::Subcommand;

use super::classify::ClassifyArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Replay a scripted page through the guard
    Simulate(SimulateArgs),

    /// Check text against the interruption signature
    Classify(ClassifyArgs),

    /// Print the effective signature tables
    Signatures,

    /// Show version, build and effective engine configuration
    Info,
}
