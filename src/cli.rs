//! Command-line argument parsing for cb-provision.
//!
//! The tool takes a single positional argument: the path to the YAML
//! provisioning configuration.

use clap::Parser;
use std::path::PathBuf;

/// Declarative bucket and DDL provisioning for Couchbase clusters.
#[derive(Parser, Debug)]
#[command(name = "cbprov")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML provisioning configuration
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
