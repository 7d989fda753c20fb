//! Content discovery against a target's web root.
//!
//! Findings are left to the tool's own output; the registry is not touched.

use crate::config::EnumProfile;
use crate::error::{TaskError, TaskResult};
use crate::scanner::traits::{TargetTask, TaskSummary, ToolInvocation, ToolRunner};
use crate::types::{Port, TargetRecord};
use async_trait::async_trait;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Builds the enumerator argument vector for one target.
pub fn enumerator_args(
    profile: &EnumProfile,
    wordlist: &Path,
    port_override: Option<Port>,
    address: &str,
) -> Vec<String> {
    let host = if address.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]", address)
    } else {
        address.to_string()
    };
    let url = match port_override {
        Some(port) => format!("http://{}:{}/FUZZ", host, port),
        None => format!("http://{}/FUZZ", host),
    };

    let mut args = vec![
        "-u".to_string(),
        url,
        "-w".to_string(),
        wordlist.display().to_string(),
        "-t".to_string(),
        profile.threads.to_string(),
        "-p".to_string(),
        profile.delay.to_string(),
    ];
    if !profile.extensions.trim().is_empty() {
        args.push("-e".to_string());
        args.push(profile.extensions.trim().to_string());
    }
    args.push("-s".to_string());
    args
}

/// Runs the content-discovery tool once per target.
pub struct EnumerationTask {
    runner: Arc<dyn ToolRunner>,
    profile: EnumProfile,
    wordlist: PathBuf,
    enumerator_bin: String,
    port_override: Option<Port>,
}

impl EnumerationTask {
    pub fn new(runner: Arc<dyn ToolRunner>, profile: EnumProfile, wordlist: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            profile,
            wordlist: wordlist.into(),
            enumerator_bin: "ffuf".to_string(),
            port_override: None,
        }
    }

    pub fn enumerator_bin(mut self, bin: impl Into<String>) -> Self {
        self.enumerator_bin = bin.into();
        self
    }

    pub fn port_override(mut self, port: Option<Port>) -> Self {
        self.port_override = port;
        self
    }
}

#[async_trait]
impl TargetTask for EnumerationTask {
    fn name(&self) -> &'static str {
        "enumeration"
    }

    async fn run(&self, target: &TargetRecord) -> TaskResult<TaskSummary> {
        info!(id = %target.id, address = %target.address, "starting enumeration");

        let invocation = ToolInvocation::new(
            self.enumerator_bin.clone(),
            enumerator_args(
                &self.profile,
                &self.wordlist,
                self.port_override,
                &target.address,
            ),
        );
        let output = self.runner.run(&invocation).await?;

        if !output.status.success() {
            return Err(TaskError::ToolFailed {
                program: self.enumerator_bin.clone(),
                status: output.status.to_string(),
            });
        }

        let hits = output.combined.lines().filter(|l| !l.trim().is_empty()).count();
        info!(id = %target.id, hits, "enumeration complete");

        Ok(TaskSummary {
            detail: format!("{} paths reported", hits),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ToolError, ToolResult};
    use crate::scanner::traits::{ToolOutput, ToolStatus};

    struct Canned(ToolStatus, &'static str);

    #[async_trait]
    impl ToolRunner for Canned {
        async fn run(&self, _: &ToolInvocation) -> ToolResult<ToolOutput> {
            Ok(ToolOutput {
                combined: self.1.to_string(),
                status: self.0,
            })
        }
    }

    struct Unlaunchable;

    #[async_trait]
    impl ToolRunner for Unlaunchable {
        async fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
            Err(ToolError::Spawn {
                program: invocation.program.clone(),
                reason: "No such file or directory".to_string(),
            })
        }
    }

    fn stealth() -> EnumProfile {
        EnumProfile {
            threads: 5,
            delay: 0.5,
            extensions: ".php,.html".to_string(),
        }
    }

    #[test]
    fn test_enumerator_args() {
        let args = enumerator_args(&stealth(), Path::new("/tmp/words.txt"), None, "10.0.0.5");
        assert_eq!(
            args,
            vec![
                "-u",
                "http://10.0.0.5/FUZZ",
                "-w",
                "/tmp/words.txt",
                "-t",
                "5",
                "-p",
                "0.5",
                "-e",
                ".php,.html",
                "-s"
            ]
        );
    }

    #[test]
    fn test_enumerator_args_port_and_no_extensions() {
        let profile = EnumProfile {
            threads: 40,
            delay: 0.0,
            extensions: String::new(),
        };
        let args = enumerator_args(&profile, Path::new("w"), Port::new(8080), "::1");
        assert_eq!(args[1], "http://[::1]:8080/FUZZ");
        assert!(!args.contains(&"-e".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-s"));
    }

    #[tokio::test]
    async fn test_success_counts_output_lines() {
        let task = EnumerationTask::new(
            Arc::new(Canned(ToolStatus::Exited(0), "admin\n\nlogin.php\n")),
            stealth(),
            "/tmp/words.txt",
        );
        let summary = task.run(&TargetRecord::new("TR-001", "10.0.0.5")).await.unwrap();
        assert_eq!(summary.detail, "2 paths reported");
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_task() {
        let task = EnumerationTask::new(
            Arc::new(Canned(ToolStatus::Exited(1), "")),
            stealth(),
            "/tmp/words.txt",
        );
        let result = task.run(&TargetRecord::new("TR-001", "10.0.0.5")).await;
        assert!(matches!(result, Err(TaskError::ToolFailed { .. })));
    }

    #[tokio::test]
    async fn test_missing_tool_fails_task() {
        let task = EnumerationTask::new(Arc::new(Unlaunchable), stealth(), "/tmp/words.txt");
        let result = task.run(&TargetRecord::new("TR-001", "10.0.0.5")).await;
        assert!(matches!(result, Err(TaskError::Tool(ToolError::Spawn { .. }))));
    }
}
