//! CLI module for shared-storages
//!
//! This module provides the command-line interface, including argument
//! parsing and subcommand dispatch.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// shared-storages - Shared EFS storage stack
///
/// Synthesizes a CloudFormation template for an encrypted EFS file system,
/// its access point and an IAM role allowed to mount it, inside an existing VPC.
#[derive(Parser, Debug, Clone)]
#[command(name = "shared-storages")]
#[command(version)]
#[command(about = "Synthesize the shared EFS storage stack", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Stack name
    #[arg(long, global = true)]
    pub stack_name: Option<String>,

    /// `Name` tag of the existing VPC
    #[arg(long, global = true)]
    pub vpc_name: Option<String>,

    /// Target account id
    #[arg(long, global = true, env = "CDK_DEFAULT_ACCOUNT")]
    pub account: Option<String>,

    /// Target region
    #[arg(long, global = true, env = "CDK_DEFAULT_REGION")]
    pub region: Option<String>,

    /// Lookup context file
    #[arg(long, global = true)]
    pub context_file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize the stack into a cloud assembly
    Synth(commands::synth::SynthArgs),

    /// Resolve the VPC and show its context
    Lookup(commands::lookup::LookupArgs),

    /// Print the resource dependency graph
    Graph(commands::graph::GraphArgs),

    /// Manage cached lookup context
    Context(commands::context::ContextArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shared-storages",
            "synth",
            "--vpc-name",
            "Other/vpc",
            "--output",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.vpc_name.as_deref(), Some("Other/vpc"));
        assert!(cli.is_json());
        assert_eq!(cli.verbosity(), 2);
    }
}
