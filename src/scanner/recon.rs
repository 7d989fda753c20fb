//! Per-target reconnaissance: port scan, classify, fingerprint, persist.

use crate::classifier::{self, ScanFacts};
use crate::config::ScanProfile;
use crate::error::TaskResult;
use crate::probe::Fingerprinter;
use crate::registry::{RegistryStore, RegistryUpdate};
use crate::scanner::traits::{TargetTask, TaskSummary, ToolInvocation, ToolRunner};
use crate::types::{Port, ScopeStatus, TargetRecord};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds the scanner argument vector for one target.
///
/// Profile flags come first, then `-p <port>` when a port override is given
/// and the profile does not already sweep every port, then the address.
pub fn scanner_args(profile: &ScanProfile, port_override: Option<Port>, address: &str) -> Vec<String> {
    let mut args: Vec<String> = profile.flags.split_whitespace().map(String::from).collect();
    if let Some(port) = port_override {
        if !profile.sweeps_all_ports() {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
    }
    args.push(address.to_string());
    args
}

/// Scans a target, fingerprints its web front and marks it active.
pub struct ReconTask {
    runner: Arc<dyn ToolRunner>,
    prober: Arc<dyn Fingerprinter>,
    registry: Arc<RegistryStore>,
    profile: ScanProfile,
    scanner_bin: String,
    port_override: Option<Port>,
}

impl ReconTask {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        prober: Arc<dyn Fingerprinter>,
        registry: Arc<RegistryStore>,
        profile: ScanProfile,
    ) -> Self {
        Self {
            runner,
            prober,
            registry,
            profile,
            scanner_bin: "nmap".to_string(),
            port_override: None,
        }
    }

    /// Use a different scanner executable.
    pub fn scanner_bin(mut self, bin: impl Into<String>) -> Self {
        self.scanner_bin = bin.into();
        self
    }

    /// Narrow scanning and probing to a single port.
    pub fn port_override(mut self, port: Option<Port>) -> Self {
        self.port_override = port;
        self
    }

    /// Run the scanner and classify whatever it printed.
    async fn scan(&self, target: &TargetRecord) -> ScanFacts {
        let invocation = ToolInvocation::new(
            self.scanner_bin.clone(),
            scanner_args(&self.profile, self.port_override, &target.address),
        );
        debug!(id = %target.id, args = ?invocation.args, "scanner arguments");

        match self.runner.run(&invocation).await {
            Ok(output) => {
                if !output.status.success() {
                    warn!(
                        id = %target.id,
                        address = %target.address,
                        status = %output.status,
                        "scanner did not exit cleanly, classifying captured output"
                    );
                }
                classifier::classify(&output.combined)
            }
            Err(e) => {
                warn!(id = %target.id, error = %e, "scanner could not run");
                classifier::classify("")
            }
        }
    }
}

#[async_trait]
impl TargetTask for ReconTask {
    fn name(&self) -> &'static str {
        "recon"
    }

    async fn run(&self, target: &TargetRecord) -> TaskResult<TaskSummary> {
        info!(id = %target.id, address = %target.address, "starting recon");

        let facts = self.scan(target).await;
        let mut os_tech = facts.os_tech();

        if let Some(fingerprint) = self
            .prober
            .fingerprint(&target.address, self.port_override)
            .await
        {
            debug!(
                id = %target.id,
                url = %fingerprint.url,
                status = fingerprint.status,
                server = ?fingerprint.server,
                "web fingerprint"
            );
            os_tech = fingerprint.apply_to(&os_tech);
        }

        let update = RegistryUpdate {
            scope_status: ScopeStatus::Active,
            os_tech: os_tech.clone(),
            open_ports: facts.ports,
            services: facts.services,
        };
        self.registry.upsert(&target.id, &update).await?;

        let ports = update.open_ports.join(",");
        info!(id = %target.id, ports = %ports, os = %os_tech, "recon complete");

        Ok(TaskSummary {
            detail: format!("ports {} | {}", ports, os_tech),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{DETECTION_FAILED, NO_PORTS};
    use crate::error::{TaskError, ToolResult};
    use crate::probe::Fingerprint;
    use crate::scanner::traits::{ToolOutput, ToolStatus};
    use crate::registry::SCHEMA_HEADERS;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct CannedRunner {
        output: String,
        status: ToolStatus,
        seen: Mutex<Vec<ToolInvocation>>,
    }

    impl CannedRunner {
        fn new(output: &str, status: ToolStatus) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_string(),
                status,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ToolRunner for CannedRunner {
        async fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
            self.seen.lock().unwrap().push(invocation.clone());
            Ok(ToolOutput {
                combined: self.output.clone(),
                status: self.status,
            })
        }
    }

    struct StubProber(Option<Fingerprint>);

    #[async_trait]
    impl Fingerprinter for StubProber {
        async fn fingerprint(&self, _: &str, _: Option<Port>) -> Option<Fingerprint> {
            self.0.clone()
        }
    }

    fn nginx() -> Option<Fingerprint> {
        Some(Fingerprint {
            url: "http://10.0.0.5:80".to_string(),
            status: 200,
            server: Some("nginx".to_string()),
            edge: None,
        })
    }

    async fn registry_with(dir: &TempDir, rows: &[&str]) -> Arc<RegistryStore> {
        let path = dir.path().join("targets.csv");
        let mut content = SCHEMA_HEADERS.join(",");
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        tokio::fs::write(&path, content).await.unwrap();
        Arc::new(RegistryStore::new(path))
    }

    const SCAN: &str = "22/tcp open ssh OpenSSH 8.9\n80/tcp open http nginx\nOS details: Linux 5.x\n";

    #[test]
    fn test_scanner_args() {
        let profile = ScanProfile::new("-sS -sV  -O");
        assert_eq!(
            scanner_args(&profile, None, "10.0.0.5"),
            vec!["-sS", "-sV", "-O", "10.0.0.5"]
        );
        assert_eq!(
            scanner_args(&profile, Port::new(8443), "10.0.0.5"),
            vec!["-sS", "-sV", "-O", "-p", "8443", "10.0.0.5"]
        );

        let sweep = ScanProfile::new("-sS -p-");
        assert_eq!(
            scanner_args(&sweep, Port::new(8443), "h"),
            vec!["-sS", "-p-", "h"]
        );
    }

    #[tokio::test]
    async fn test_recon_marks_active_with_fingerprint() {
        let dir = TempDir::new().unwrap();
        let registry =
            registry_with(&dir, &["TR-001,T_1,10.0.0.5,PENDING,TBD,TBD,TBD,TBD,TBD,TBD"]).await;
        let runner = CannedRunner::new(SCAN, ToolStatus::Exited(0));
        let task = ReconTask::new(
            runner.clone(),
            Arc::new(StubProber(nginx())),
            registry.clone(),
            ScanProfile::new("-sV"),
        );

        let target = TargetRecord::new("TR-001", "10.0.0.5");
        task.run(&target).await.unwrap();

        let snapshot = registry.load_targets().await.unwrap();
        let record = &snapshot.targets[0];
        assert_eq!(record.scope_status, ScopeStatus::Active);
        assert_eq!(record.os_tech, "Linux 5.x (nginx)");
        assert_eq!(record.open_ports, vec!["22/tcp", "80/tcp"]);
        assert_eq!(record.services, vec!["ssh", "http"]);
        assert_eq!(runner.seen.lock().unwrap()[0].program, "nmap");
    }

    #[tokio::test]
    async fn test_recon_without_fingerprint_keeps_scanner_os() {
        let dir = TempDir::new().unwrap();
        let registry =
            registry_with(&dir, &["TR-001,T_1,10.0.0.5,PENDING,TBD,TBD,TBD,TBD,TBD,TBD"]).await;
        let task = ReconTask::new(
            CannedRunner::new(SCAN, ToolStatus::Exited(0)),
            Arc::new(StubProber(None)),
            registry.clone(),
            ScanProfile::new("-sV"),
        );

        task.run(&TargetRecord::new("TR-001", "10.0.0.5"))
            .await
            .unwrap();

        let snapshot = registry.load_targets().await.unwrap();
        assert_eq!(snapshot.targets[0].os_tech, "Linux 5.x");
    }

    #[tokio::test]
    async fn test_failed_scanner_still_marks_active() {
        let dir = TempDir::new().unwrap();
        let registry =
            registry_with(&dir, &["TR-001,T_1,10.0.0.5,PENDING,TBD,TBD,TBD,TBD,TBD,TBD"]).await;
        let task = ReconTask::new(
            CannedRunner::new("", ToolStatus::Exited(1)),
            Arc::new(StubProber(None)),
            registry.clone(),
            ScanProfile::new("-sV"),
        );

        task.run(&TargetRecord::new("TR-001", "10.0.0.5"))
            .await
            .unwrap();

        let record = &registry.load_targets().await.unwrap().targets[0];
        assert_eq!(record.scope_status, ScopeStatus::Active);
        assert_eq!(record.os_tech, DETECTION_FAILED);
        assert_eq!(record.open_ports, vec![NO_PORTS]);
    }

    #[tokio::test]
    async fn test_timed_out_scanner_keeps_partial_findings() {
        let dir = TempDir::new().unwrap();
        let registry =
            registry_with(&dir, &["TR-001,T_1,10.0.0.5,PENDING,TBD,TBD,TBD,TBD,TBD,TBD"]).await;
        let task = ReconTask::new(
            CannedRunner::new("22/tcp open ssh OpenSSH 8.9\n", ToolStatus::TimedOut),
            Arc::new(StubProber(None)),
            registry.clone(),
            ScanProfile::new("-sV"),
        );

        task.run(&TargetRecord::new("TR-001", "10.0.0.5"))
            .await
            .unwrap();

        let record = &registry.load_targets().await.unwrap().targets[0];
        assert_eq!(record.scope_status, ScopeStatus::Active);
        assert_eq!(record.open_ports, vec!["22/tcp"]);
        assert_eq!(record.services, vec!["ssh"]);
        assert_eq!(record.os_tech, DETECTION_FAILED);
    }

    #[tokio::test]
    async fn test_unknown_target_is_a_task_error() {
        let dir = TempDir::new().unwrap();
        let registry =
            registry_with(&dir, &["TR-001,T_1,10.0.0.5,PENDING,TBD,TBD,TBD,TBD,TBD,TBD"]).await;
        let task = ReconTask::new(
            CannedRunner::new(SCAN, ToolStatus::Exited(0)),
            Arc::new(StubProber(None)),
            registry,
            ScanProfile::new("-sV"),
        );

        let result = task.run(&TargetRecord::new("ghost-1", "10.0.0.9")).await;
        assert!(matches!(result, Err(TaskError::Registry(_))));
    }

    #[tokio::test]
    async fn test_custom_scanner_and_port() {
        let dir = TempDir::new().unwrap();
        let registry =
            registry_with(&dir, &["TR-001,T_1,10.0.0.5,PENDING,TBD,TBD,TBD,TBD,TBD,TBD"]).await;
        let runner = CannedRunner::new(SCAN, ToolStatus::Exited(0));
        let task = ReconTask::new(
            runner.clone(),
            Arc::new(StubProber(None)),
            registry,
            ScanProfile::new("-sV"),
        )
        .scanner_bin("/opt/nmap/bin/nmap")
        .port_override(Port::new(8080));

        task.run(&TargetRecord::new("TR-001", "10.0.0.5"))
            .await
            .unwrap();

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen[0].program, "/opt/nmap/bin/nmap");
        assert_eq!(seen[0].args, vec!["-sV", "-p", "8080", "10.0.0.5"]);
    }
}
