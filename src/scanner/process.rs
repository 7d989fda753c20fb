//! External process execution on `tokio::process`.
//!
//! Stdout and stderr are drained by background readers while the child runs.
//! A deadline, when set, kills the child and reports [`ToolStatus::TimedOut`]
//! together with whatever the tool printed before it was killed.

use crate::error::{ToolError, ToolResult};
use crate::scanner::traits::{ToolInvocation, ToolOutput, ToolRunner, ToolStatus};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

/// How long pipe readers may keep draining after a timed-out child is killed.
/// Grandchildren that inherited the pipes can keep them open indefinitely.
const KILL_GRACE: Duration = Duration::from_millis(250);

/// Shared capture buffer and the task filling it.
type Capture = (Arc<Mutex<Vec<u8>>>, JoinHandle<()>);

/// Runs tools as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    deadline: Option<Duration>,
}

impl ProcessRunner {
    /// Runner with an optional per-run deadline.
    pub fn new(deadline: Option<Duration>) -> Self {
        Self { deadline }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        debug!(command = %invocation, "launching tool");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Spawn {
                program: invocation.program.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().map(capture);
        let stderr = child.stderr.take().map(capture);

        let waited = match self.deadline {
            Some(deadline) => timeout(deadline, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        let exit = match waited {
            Some(result) => Some(result.map_err(|source| ToolError::Io {
                program: invocation.program.clone(),
                source,
            })?),
            None => {
                debug!(command = %invocation, "deadline reached, killing tool");
                if let Err(e) = child.kill().await {
                    debug!(command = %invocation, error = %e, "kill failed");
                }
                None
            }
        };

        let grace = exit.is_none().then_some(KILL_GRACE);
        let mut combined = collect(stdout, grace).await;
        combined.push_str(&collect(stderr, grace).await);

        let status = match exit.map(|status| status.code()) {
            None => ToolStatus::TimedOut,
            Some(Some(code)) => ToolStatus::Exited(code),
            Some(None) => ToolStatus::Signalled,
        };

        Ok(ToolOutput { combined, status })
    }
}

/// Drain a child pipe into a shared buffer until EOF.
fn capture<R>(mut pipe: R) -> Capture
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink = buffer.clone();
    let handle = tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    debug!(error = %e, "pipe read failed");
                    break;
                }
            }
        }
    });
    (buffer, handle)
}

/// Wait for a reader, bounded by `grace` when set, and return what it saw.
async fn collect(capture: Option<Capture>, grace: Option<Duration>) -> String {
    let Some((buffer, mut handle)) = capture else {
        return String::new();
    };

    match grace {
        Some(grace) => {
            if timeout(grace, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        None => {
            let _ = handle.await;
        }
    }

    let bytes = buffer.lock().await;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    text
}
