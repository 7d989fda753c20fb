//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `vrcore scan --registry <csv>` - Run recon (or enumeration) over a registry
//! - `vrcore profiles list|show|init` - Inspect or seed the profile catalog
//! - `vrcore registry init|add|show` - Create and populate a target registry

mod profiles;
mod registry;
mod scan;

pub use profiles::{ProfilesAction, ProfilesCommand};
pub use registry::{RegistryAction, RegistryCommand};
pub use scan::ScanCommand;

use crate::error::CliResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default location of the profile catalog.
pub const DEFAULT_CONFIG_PATH: &str = "config/profiles.json";

/// vrcore - registry-driven reconnaissance orchestrator.
///
/// Reads targets from a CSV registry, runs the port scanner and a web
/// fingerprint probe against each under a fixed concurrency cap, and writes
/// the findings back into the registry.
#[derive(Parser, Debug)]
#[command(name = "vrcore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Registry-driven recon orchestrator", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter implied by `--verbose` / `--quiet`.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Dispatch to the selected subcommand.
    pub async fn execute(&self) -> CliResult<()> {
        match &self.command {
            Commands::Scan(cmd) => cmd.execute(self.quiet).await,
            Commands::Profiles(cmd) => cmd.execute(self.quiet),
            Commands::Registry(cmd) => cmd.execute(self.quiet).await,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a batch over every target in a registry
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Inspect or initialise the profile catalog
    #[command(alias = "p")]
    Profiles(ProfilesCommand),

    /// Create, extend or display a target registry
    #[command(alias = "r")]
    Registry(RegistryCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV rows
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Config path argument shared by subcommands.
pub(crate) fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "vrcore",
            "scan",
            "--registry",
            "targets.csv",
            "--port",
            "8443",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Commands::Scan(cmd) => {
                assert_eq!(cmd.registry, PathBuf::from("targets.csv"));
                assert_eq!(cmd.config, PathBuf::from(DEFAULT_CONFIG_PATH));
                assert_eq!(cmd.port.map(|p| p.as_u16()), Some(8443));
                assert!(!cmd.fuzz);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_registry_is_required_for_scan() {
        assert!(Cli::try_parse_from(["vrcore", "scan"]).is_err());
    }

    #[test]
    fn test_port_range_is_checked() {
        assert!(Cli::try_parse_from(["vrcore", "scan", "--registry", "t.csv", "--port", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["vrcore", "scan", "--registry", "t.csv", "--port", "70000"]).is_err()
        );
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["vrcore", "-v", "-q", "profiles", "list"]).is_err());
    }

    #[test]
    fn test_parse_registry_add() {
        let cli = Cli::try_parse_from([
            "vrcore",
            "registry",
            "add",
            "--registry",
            "t.csv",
            "10.0.0.0/30",
            "example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Registry(RegistryCommand {
                action: RegistryAction::Add { values, .. },
            }) => assert_eq!(values, vec!["10.0.0.0/30", "example.com"]),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
