//! Scan subcommand implementation.
//!
//! Handles `vrcore scan`: loads the catalog and the registry, then runs the
//! recon (or enumeration) batch over every well-formed row.

use crate::cli::{default_config_path, OutputFormat};
use crate::config::{ProfileCatalog, DEFAULT_ENUM_PROFILE, DEFAULT_SCAN_PROFILE};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::probe::WebProber;
use crate::registry::RegistryStore;
use crate::scanner::{
    run_batch, BatchConfig, EnumerationTask, ProcessRunner, ReconTask, TargetTask, ToolRunner,
};
use crate::types::Port;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Run a batch over every target in a registry.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Target registry CSV
    #[arg(short, long, value_name = "PATH")]
    pub registry: PathBuf,

    /// Profile catalog JSON
    #[arg(short, long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run content discovery instead of recon
    #[arg(long)]
    pub fuzz: bool,

    /// Wordlist for content discovery
    #[arg(short, long, value_name = "PATH")]
    pub wordlist: Option<PathBuf>,

    /// Restrict scanning and probing to a single port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<Port>,

    /// Scan profile to use
    #[arg(long, default_value = DEFAULT_SCAN_PROFILE)]
    pub scan_profile: String,

    /// Enumeration profile to use with --fuzz
    #[arg(long, default_value = DEFAULT_ENUM_PROFILE)]
    pub enum_profile: String,

    /// Maximum number of targets processed at once
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,

    /// Deadline for each external tool run in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Output format for the batch summary
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, quiet: bool) -> CliResult<()> {
        if self.fuzz && self.wordlist.is_none() {
            return Err(CliError::MissingWordlist);
        }
        let port_override = self.port;

        let catalog = ProfileCatalog::load(&self.config)?;
        let mut runtime = catalog.runtime().clone();
        if let Some(concurrency) = self.concurrency {
            runtime.concurrency = usize::from(concurrency);
        }
        if let Some(secs) = self.tool_timeout {
            runtime.tool_timeout_secs = secs;
        }

        let registry = Arc::new(RegistryStore::new(&self.registry));
        let snapshot = registry.load_targets().await?;
        if snapshot.skipped > 0 {
            info!(skipped = snapshot.skipped, "skipping malformed registry rows");
        }

        let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new(runtime.tool_timeout()));

        let task: Arc<dyn TargetTask> = match (&self.wordlist, self.fuzz) {
            (Some(wordlist), true) => {
                let profile = catalog.enum_profile(&self.enum_profile)?.clone();
                debug!(profile = %self.enum_profile, ?profile, "enumeration profile");
                Arc::new(
                    EnumerationTask::new(runner, profile, wordlist)
                        .enumerator_bin(runtime.enumerator_bin.clone())
                        .port_override(port_override),
                )
            }
            _ => {
                let profile = catalog.scan_profile(&self.scan_profile)?.clone();
                if !is_root() && !quiet {
                    output::print_warning(
                        "not running as root; OS detection and SYN scan flags usually need raw sockets",
                    );
                }
                let prober = Arc::new(WebProber::new(runtime.probe_timeout())?);
                Arc::new(
                    ReconTask::new(runner, prober, registry.clone(), profile)
                        .scanner_bin(runtime.scanner_bin.clone())
                        .port_override(port_override),
                )
            }
        };

        if !quiet && self.output == OutputFormat::Plain {
            output::print_batch_header(
                task.name(),
                &self.registry.display().to_string(),
                snapshot.targets.len(),
                runtime.concurrency,
            );
        }

        let config = BatchConfig::default()
            .concurrency(runtime.concurrency)
            .show_progress(self.progress && !quiet);
        let report = run_batch(snapshot, task, config).await;

        match self.output {
            OutputFormat::Json => output::print_json(&report)?,
            _ => output::print_batch_summary(&report)?,
        }

        Ok(())
    }
}

/// Check if running with root privileges.
fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
