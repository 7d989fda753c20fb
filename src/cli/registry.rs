//! Registry subcommand implementation.
//!
//! Handles `vrcore registry` for creating, extending and printing a target
//! registry.

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::output;
use crate::registry::RegistryStore;
use crate::types::TargetSpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Create, extend or display a target registry.
#[derive(Parser, Debug)]
pub struct RegistryCommand {
    #[command(subcommand)]
    pub action: RegistryAction,
}

/// Registry actions.
#[derive(Subcommand, Debug)]
pub enum RegistryAction {
    /// Create an empty registry with the standard header
    Init {
        /// Target registry CSV
        #[arg(short, long, value_name = "PATH")]
        registry: PathBuf,

        /// Overwrite an existing registry
        #[arg(long)]
        force: bool,
    },

    /// Append targets (IP, hostname or CIDR)
    Add {
        /// Target registry CSV
        #[arg(short, long, value_name = "PATH")]
        registry: PathBuf,

        /// Values to add
        #[arg(value_name = "VALUE", required = true)]
        values: Vec<String>,
    },

    /// Print the registry
    Show {
        /// Target registry CSV
        #[arg(short, long, value_name = "PATH")]
        registry: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        output: OutputFormat,
    },
}

impl RegistryCommand {
    /// Execute the registry command.
    pub async fn execute(&self, quiet: bool) -> CliResult<()> {
        match &self.action {
            RegistryAction::Init { registry, force } => {
                RegistryStore::create(registry, *force).await?;
                if !quiet {
                    output::print_success(&format!("Created registry {}", registry.display()));
                }
                Ok(())
            }
            RegistryAction::Add { registry, values } => {
                // Validate everything before touching the file.
                let mut addresses = Vec::new();
                for value in values {
                    let spec = TargetSpec::parse(value)?;
                    info!(input = %value, hosts = spec.host_count(), "expanding target");
                    addresses.extend(spec.expand());
                }

                let store = RegistryStore::new(registry);
                let ids = store.append(&addresses).await?;
                if !quiet {
                    match (ids.first(), ids.last()) {
                        (Some(first), Some(last)) => output::print_success(&format!(
                            "Added {} target(s) ({}..{})",
                            ids.len(),
                            first,
                            last
                        )),
                        _ => output::print_info("No targets added"),
                    }
                }
                Ok(())
            }
            RegistryAction::Show { registry, output: format } => {
                let store = RegistryStore::new(registry);
                let snapshot = store.load_targets().await?;
                match format {
                    OutputFormat::Plain => output::print_registry(&snapshot)?,
                    OutputFormat::Json => output::print_json(&snapshot.targets)?,
                    OutputFormat::Csv => output::print_registry_csv(&snapshot.targets)?,
                }
                Ok(())
            }
        }
    }
}
