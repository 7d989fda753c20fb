//! # vrcore - Registry-Driven Reconnaissance Orchestrator
//!
//! vrcore reads a CSV registry of targets, runs an external port scanner and
//! an HTTPS-first web fingerprint probe against each one under a fixed
//! concurrency cap, and writes the findings back into the registry.
//!
//! ## Features
//!
//! - **Bounded batches**: one task per registry row, at most `K` in flight
//! - **Safe write-back**: every registry update is serialized through one writer
//! - **Output classification**: a pure parser from scanner text to ports, services and OS hint
//! - **Edge detection**: CDN/WAF vendor annotation from response headers
//! - **Profiles**: named scanner flag sets and content-discovery parameters in JSON
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vrcore::config::ProfileCatalog;
//! use vrcore::probe::WebProber;
//! use vrcore::registry::RegistryStore;
//! use vrcore::scanner::{run_batch, BatchConfig, ProcessRunner, ReconTask};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = ProfileCatalog::builtin();
//!     let registry = Arc::new(RegistryStore::new("targets.csv"));
//!     let task = ReconTask::new(
//!         Arc::new(ProcessRunner::new(Some(Duration::from_secs(1800)))),
//!         Arc::new(WebProber::new(Duration::from_secs(4))?),
//!         registry.clone(),
//!         catalog.scan_profile("framework_aggressive")?.clone(),
//!     );
//!
//!     let snapshot = registry.load_targets().await?;
//!     let report = run_batch(snapshot, Arc::new(task), BatchConfig::default()).await;
//!     println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Target records, target specs and the `Port` newtype
//! - [`registry`] - CSV registry store with single-writer upserts
//! - [`classifier`] - Scanner output classification
//! - [`probe`] - Web fingerprinting and edge detection
//! - [`scanner`] - Tool execution, per-target tasks and the batch scheduler
//! - [`config`] - Profile catalog and runtime settings
//! - [`error`] - Error types
//! - [`output`] - Output formatting utilities

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod probe;
pub mod registry;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use classifier::{classify, ScanFacts};
pub use error::{CliError, RegistryError, TaskError};
pub use registry::{RegistryStore, RegistryUpdate};
pub use scanner::{run_batch, BatchConfig, BatchReport, TargetTask, ToolRunner};
pub use types::{Port, ScopeStatus, TargetRecord, TargetSpec};
