//! Seams between the scheduler, the per-target tasks and the outside world.
//!
//! [`ToolRunner`] abstracts launching an external program so the tasks can be
//! driven by a stand-in in tests. [`TargetTask`] is what the scheduler runs
//! once per registry row.

use crate::error::{TaskResult, ToolResult};
use crate::types::TargetRecord;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// A fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How an external tool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Exited with the given code.
    Exited(i32),
    /// Killed by a signal.
    Signalled,
    /// Killed after exceeding its deadline.
    TimedOut,
}

impl ToolStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit status {}", code),
            Self::Signalled => write!(f, "terminated by signal"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Captured result of an external tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Stdout followed by stderr.
    pub combined: String,
    pub status: ToolStatus,
}

/// Runs external programs.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion (or deadline) and capture its output.
    ///
    /// Only a failure to launch is an error; a non-zero exit or timeout is
    /// reported through [`ToolOutput::status`].
    async fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput>;
}

/// What a finished task reports back to the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    /// One-line human description of the result.
    pub detail: String,
}

/// Work the scheduler runs once per target.
#[async_trait]
pub trait TargetTask: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    async fn run(&self, target: &TargetRecord) -> TaskResult<TaskSummary>;
}
