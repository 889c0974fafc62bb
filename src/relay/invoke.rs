//! Synchronous agent invocation
//!
//! One chat turn is one bounded run of the agent CLI in non-interactive
//! continuation mode (`-c -p <message>`). The run is killed on timeout and
//! each output stream is capped; excess output is drained and discarded so
//! the child never blocks on a full pipe.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::{DeckError, Result};

/// Outcome of one agent invocation, prior to classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The process ran to completion within the time bound
    Completed {
        /// Whether the exit status was zero
        success: bool,
        /// Captured stdout, capped
        stdout: String,
        /// Captured stderr, capped
        stderr: String,
    },
    /// The time bound expired and the process was killed
    TimedOut,
    /// The process could not be run at all
    Failed {
        /// Raw error description
        error: String,
    },
}

/// Invoker seam for the external agent command
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Run one synchronous chat turn against the agent
    async fn invoke(&self, message: &str) -> InvokeOutcome;
}

/// Invoker that runs the real agent CLI as a subprocess
pub struct CliInvoker {
    command: String,
    cwd: PathBuf,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CliInvoker {
    /// Create an invoker for the given CLI command name.
    ///
    /// The binary is resolved at invocation time so an agent installed after
    /// service start is picked up without a restart.
    pub fn new(
        command: impl Into<String>,
        cwd: impl Into<PathBuf>,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            timeout,
            max_output_bytes,
        }
    }

    /// Find the agent CLI binary on PATH or in common install locations
    ///
    /// # Errors
    /// Returns `CliNotFound` when no candidate exists
    pub fn find_cli(command: &str) -> Result<PathBuf> {
        if let Ok(path) = which::which(command) {
            return Ok(path);
        }

        let home = std::env::var("HOME").unwrap_or_else(|_| String::from("/root"));
        let locations = [
            PathBuf::from(&home).join(".npm-global/bin").join(command),
            PathBuf::from("/usr/local/bin").join(command),
            PathBuf::from(&home).join(".local/bin").join(command),
            PathBuf::from(&home).join("node_modules/.bin").join(command),
            PathBuf::from(&home).join(".yarn/bin").join(command),
        ];

        for path in locations {
            if path.is_file() {
                return Ok(path);
            }
        }

        Err(DeckError::CliNotFound(format!(
            "{command} not found in PATH or common install locations"
        )))
    }
}

#[async_trait]
impl AgentInvoker for CliInvoker {
    async fn invoke(&self, message: &str) -> InvokeOutcome {
        let cli_path = match Self::find_cli(&self.command) {
            Ok(path) => path,
            Err(e) => return InvokeOutcome::Failed { error: e.to_string() },
        };

        let mut cmd = Command::new(&cli_path);
        cmd.arg("-c")
            .arg("-p")
            .arg(message)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return InvokeOutcome::Failed {
                    error: format!("failed to start {}: {e}", cli_path.display()),
                };
            }
        };

        let stdout_task = tokio::spawn(read_capped(child.stdout.take(), self.max_output_bytes));
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), self.max_output_bytes));

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                return InvokeOutcome::Failed {
                    error: format!("failed to wait for agent process: {e}"),
                };
            }
            Err(_) => {
                // Kill the child, not just the bound, to avoid a leaked process.
                let _ = child.start_kill();
                let _ = child.wait().await;
                stdout_task.abort();
                stderr_task.abort();
                log::warn!(
                    "agent invocation exceeded {}s and was killed",
                    self.timeout.as_secs()
                );
                return InvokeOutcome::TimedOut;
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        InvokeOutcome::Completed {
            success: status.success(),
            stdout,
            stderr,
        }
    }
}

async fn read_capped<R>(stream: Option<R>, cap: usize) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(mut stream) = stream else {
        return String::new();
    };

    let mut captured = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if captured.len() < cap {
                    let take = n.min(cap - captured.len());
                    captured.extend_from_slice(&chunk[..take]);
                }
                // Past the cap: keep draining so the child never stalls.
            }
        }
    }

    String::from_utf8_lossy(&captured).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_cli_resolves_a_path_binary() {
        let path = CliInvoker::find_cli("ls").unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn find_cli_reports_missing_binary() {
        let err = CliInvoker::find_cli("definitely-not-a-real-binary-0451").unwrap_err();
        assert!(matches!(err, DeckError::CliNotFound(_)));
    }

    #[tokio::test]
    async fn invoke_of_missing_binary_fails_cleanly() {
        let invoker = CliInvoker::new(
            "definitely-not-a-real-binary-0451",
            std::env::temp_dir(),
            Duration::from_secs(1),
            1024,
        );
        let outcome = invoker.invoke("hi").await;
        assert!(matches!(outcome, InvokeOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn read_capped_truncates_at_cap() {
        let data: &[u8] = b"0123456789";
        let captured = read_capped(Some(data), 4).await;
        assert_eq!(captured, "0123");
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable shell script and return the invoker pointed at it.
        fn scripted_invoker(dir: &std::path::Path, body: &str, timeout: Duration) -> CliInvoker {
            let path = dir.join("fake-agent");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh\n{body}").unwrap();
            drop(file);
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            CliInvoker::new(path.to_string_lossy(), dir, timeout, 1024 * 1024)
        }

        #[tokio::test]
        async fn captures_stdout_on_success() {
            let dir = tempfile::tempdir().unwrap();
            let invoker = scripted_invoker(dir.path(), "echo hello", Duration::from_secs(5));
            match invoker.invoke("msg").await {
                InvokeOutcome::Completed {
                    success, stdout, ..
                } => {
                    assert!(success);
                    assert_eq!(stdout.trim(), "hello");
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        #[tokio::test]
        async fn nonzero_exit_is_reported() {
            let dir = tempfile::tempdir().unwrap();
            let invoker = scripted_invoker(
                dir.path(),
                "echo oops >&2; exit 3",
                Duration::from_secs(5),
            );
            match invoker.invoke("msg").await {
                InvokeOutcome::Completed {
                    success, stderr, ..
                } => {
                    assert!(!success);
                    assert_eq!(stderr.trim(), "oops");
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        #[tokio::test]
        async fn slow_process_times_out_and_is_killed() {
            let dir = tempfile::tempdir().unwrap();
            let invoker = scripted_invoker(dir.path(), "sleep 5", Duration::from_millis(200));
            let outcome = invoker.invoke("msg").await;
            assert_eq!(outcome, InvokeOutcome::TimedOut);
        }
    }
}
