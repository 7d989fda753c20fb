//! Scanner module - runs one task per registry target under a concurrency cap.
//!
//! Targets are admitted in registry order through a counting semaphore.
//! Each admitted target runs on its own tokio task holding an owned permit,
//! so the permit is released however the task ends. `run_batch` returns only
//! after every spawned task has finished.

pub mod enumerate;
pub mod process;
pub mod recon;
pub mod traits;

use crate::registry::RegistrySnapshot;
use crate::types::TargetRecord;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, warn};

pub use enumerate::{enumerator_args, EnumerationTask};
pub use process::ProcessRunner;
pub use recon::{scanner_args, ReconTask};
pub use traits::{
    TargetTask, TaskSummary, ToolInvocation, ToolOutput, ToolRunner, ToolStatus,
};

/// How a single target's task ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum TaskStatus {
    Completed(String),
    Failed(String),
}

/// Per-target entry in the batch report.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub id: String,
    pub address: String,
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Completed(_))
    }
}

/// Result of a complete batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Data rows read from the registry, malformed ones included.
    pub total_rows: usize,
    /// Rows skipped as malformed.
    pub skipped: usize,
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Configuration for a batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: crate::config::DEFAULT_CONCURRENCY,
            show_progress: false,
        }
    }
}

impl BatchConfig {
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// Run `task` once for every target in `snapshot`.
///
/// Individual failures, panics included, are recorded in the report and
/// never stop the rest of the batch.
pub async fn run_batch(
    snapshot: RegistrySnapshot,
    task: Arc<dyn TargetTask>,
    config: BatchConfig,
) -> BatchReport {
    let started_at = Utc::now();
    let RegistrySnapshot { targets, skipped } = snapshot;
    let total_rows = targets.len() + skipped;

    let progress = if config.show_progress {
        let pb = ProgressBar::new(targets.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut handles = Vec::with_capacity(targets.len());

    for target in targets {
        // Acquired here, not inside the task, so admission follows registry order.
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let key = (target.id.clone(), target.address.clone());
        let task = Arc::clone(&task);
        let progress = progress.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let result = run_one(task.as_ref(), &target).await;
            if let Some(pb) = progress {
                pb.inc(1);
                pb.set_message(target.id.clone());
            }
            result
        });
        handles.push((key, handle));
    }

    let (keys, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let joined = join_all(handles).await;

    let outcomes = keys
        .into_iter()
        .zip(joined)
        .map(|((id, address), joined)| {
            let status = match joined {
                Ok(status) => status,
                Err(e) => {
                    error!(id = %id, error = %e, "task aborted");
                    if let Some(ref pb) = progress {
                        pb.inc(1);
                    }
                    TaskStatus::Failed(format!("task aborted: {}", e))
                }
            };
            TaskOutcome { id, address, status }
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_with_message("batch complete");
    }

    BatchReport {
        mode: task.name().to_string(),
        started_at,
        finished_at: Utc::now(),
        total_rows,
        skipped,
        outcomes,
    }
}

async fn run_one(task: &dyn TargetTask, target: &TargetRecord) -> TaskStatus {
    match task.run(target).await {
        Ok(summary) => TaskStatus::Completed(summary.detail),
        Err(e) => {
            warn!(id = %target.id, address = %target.address, error = %e, "{} failed", task.name());
            TaskStatus::Failed(e.to_string())
        }
    }
}
