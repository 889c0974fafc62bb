//! Agent liveness probing
//!
//! Best-effort detection of the external agent process by scanning the OS
//! process table. Free-form `ps` parsing is inherently racy and
//! platform-dependent, so it lives behind the [`AgentProbe`] trait where it
//! can be swapped for a real health check without touching the relay.

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

/// Snapshot of the agent process as seen in the process table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStatus {
    /// Whether a matching process was found
    pub running: bool,
    /// PID of the first match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// CPU usage percentage of the first match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    /// Memory usage percentage of the first match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_percent: Option<f32>,
    /// Accumulated CPU time column, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time: Option<String>,
}

impl AgentStatus {
    /// Status representing "no agent process found"
    #[must_use]
    pub fn stopped() -> Self {
        Self::default()
    }
}

/// Liveness probe for the external agent process
///
/// `check_status` never fails: every probe error reads as "not running".
/// This is acceptable for a status indicator, not for correctness-critical
/// control.
#[async_trait]
pub trait AgentProbe: Send + Sync {
    /// Detect whether the agent is running and extract basic metrics
    async fn check_status(&self) -> AgentStatus;
}

/// Probe that scans `ps aux` output for the agent process name
pub struct ProcessTableProbe {
    process_name: String,
}

impl ProcessTableProbe {
    /// Create a probe matching the given process name (case-insensitive
    /// substring match)
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }
}

#[async_trait]
impl AgentProbe for ProcessTableProbe {
    async fn check_status(&self) -> AgentStatus {
        let output = match Command::new("ps").arg("aux").output().await {
            Ok(output) if output.status.success() => output,
            Ok(_) | Err(_) => {
                log::debug!("ps probe unavailable, reporting agent as stopped");
                return AgentStatus::stopped();
            }
        };

        let table = String::from_utf8_lossy(&output.stdout);
        parse_process_table(&table, &self.process_name, std::process::id())
    }
}

/// Parse `ps aux` output: USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND
fn parse_process_table(table: &str, process_name: &str, own_pid: u32) -> AgentStatus {
    let needle = process_name.to_lowercase();

    for line in table.lines().skip(1) {
        if !line.to_lowercase().contains(&needle) {
            continue;
        }

        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 10 {
            continue;
        }

        let pid = columns[1].parse::<u32>().ok();
        // The dashboard's own process may match the name; skip it.
        if pid == Some(own_pid) {
            continue;
        }

        return AgentStatus {
            running: true,
            pid,
            cpu_percent: columns[2].parse().ok(),
            mem_percent: columns[3].parse().ok(),
            cpu_time: Some(columns[9].to_string()),
        };
    }

    AgentStatus::stopped()
}
