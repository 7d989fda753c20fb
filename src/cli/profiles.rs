//! Profiles subcommand implementation.
//!
//! Handles the `vrcore profiles` command for inspecting the profile catalog.

use crate::cli::default_config_path;
use crate::config::ProfileCatalog;
use crate::error::CliResult;
use crate::output;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect or initialise the profile catalog.
#[derive(Parser, Debug)]
pub struct ProfilesCommand {
    #[command(subcommand)]
    pub action: ProfilesAction,

    /// Profile catalog JSON
    #[arg(short, long, value_name = "PATH", global = true, default_value_os_t = default_config_path())]
    pub config: PathBuf,
}

/// Profile catalog actions.
#[derive(Subcommand, Debug)]
pub enum ProfilesAction {
    /// List all scan and enumeration profiles
    List,

    /// Show details of a specific profile
    Show {
        /// Profile name
        name: String,
    },

    /// Write the built-in starter catalog
    Init {
        /// Overwrite an existing catalog
        #[arg(long)]
        force: bool,
    },
}

impl ProfilesCommand {
    /// Execute the profiles command.
    pub fn execute(&self, quiet: bool) -> CliResult<()> {
        match &self.action {
            ProfilesAction::List => self.list_profiles(),
            ProfilesAction::Show { name } => self.show_profile(name),
            ProfilesAction::Init { force } => self.init_catalog(*force, quiet),
        }
    }

    fn list_profiles(&self) -> CliResult<()> {
        let catalog = ProfileCatalog::load(&self.config)?;
        output::print_catalog(&catalog);
        Ok(())
    }

    fn show_profile(&self, name: &str) -> CliResult<()> {
        let catalog = ProfileCatalog::load(&self.config)?;

        // A name may exist in both sections; show whatever matches.
        let scan = catalog.scan_profile(name).ok();
        let enumeration = catalog.enum_profile(name).ok();

        if scan.is_none() && enumeration.is_none() {
            // Report as a missing scan profile, the more common lookup.
            catalog.scan_profile(name)?;
        }

        if let Some(profile) = scan {
            output::print_scan_profile(name, profile);
        }
        if let Some(profile) = enumeration {
            output::print_enum_profile(name, profile);
        }
        Ok(())
    }

    fn init_catalog(&self, force: bool, quiet: bool) -> CliResult<()> {
        ProfileCatalog::builtin().save(&self.config, force)?;
        if !quiet {
            output::print_success(&format!(
                "Wrote starter profiles to {}",
                self.config.display()
            ));
        }
        Ok(())
    }
}
