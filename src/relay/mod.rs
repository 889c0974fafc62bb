//! Chat relay: one message turn, end to end
//!
//! The relay ties the probe, the history log, and the agent invocation into
//! one sequence with defined fallbacks. Agent-side failures (not running,
//! timeout, bad exit) never surface as errors: they become normal assistant
//! replies so the UI stays responsive, and both sides of every exchange are
//! logged durably.

mod invoke;

pub use invoke::{AgentInvoker, CliInvoker, InvokeOutcome};

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::history::log::MessageLog;
use crate::history::record::{self, MessageRecord};
use crate::probe::AgentProbe;

/// Reply body when the agent produced no output at all
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response";

/// Warning flag value for turns answered without an agent
pub const NOT_RUNNING_WARNING: &str = "Claude Code not running in interactive mode";

/// Fixed reply for turns taken while the agent is stopped
pub const NOT_RUNNING_REPLY: &str = "\u{26a0}\u{fe0f} Claude Code is not running in interactive mode.\n\n\
     Start it first:\n  $ claude\n\n\
     Then continue the conversation from the web UI.";

/// Fixed reply for a timed-out invocation, with retry guidance
#[must_use]
pub fn timeout_reply(timeout_secs: u64) -> String {
    format!(
        "\u{23f1}\u{fe0f} The command timed out after {timeout_secs} seconds. \
         Claude Code may be working on a complex task.\n\n\
         Suggestions:\n\
         1. Simplify your question\n\
         2. Talk to Claude Code directly in the terminal\n\
         3. Check the history view to see what ran"
    )
}

/// Fixed reply for an invocation that failed without usable output
#[must_use]
pub fn failure_reply(error: &str) -> String {
    format!(
        "\u{274c} Failed to communicate with Claude Code\n\n\
         Error: {error}\n\n\
         Possible causes:\n\
         1. Claude Code is not installed or not logged in\n\
         2. Network connectivity problems\n\
         3. Claude Code is busy with another task"
    )
}

/// Result of one relayed chat turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Assistant reply body (real or synthetic)
    pub response: String,
    /// Session the turn was logged under
    pub session_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Set only when the turn was answered without a running agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Orchestrates one chat turn: probe, log, invoke, classify, log, reply
pub struct ChatRelay {
    log: Arc<MessageLog>,
    probe: Arc<dyn AgentProbe>,
    invoker: Arc<dyn AgentInvoker>,
    project: String,
    timeout_secs: u64,
}

impl ChatRelay {
    /// Create a relay over the given collaborators.
    ///
    /// `project` is the working-directory context stamped on every record;
    /// `timeout_secs` only feeds the timeout reply text (the bound itself
    /// lives in the invoker).
    pub fn new(
        log: Arc<MessageLog>,
        probe: Arc<dyn AgentProbe>,
        invoker: Arc<dyn AgentInvoker>,
        project: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            log,
            probe,
            invoker,
            project: project.into(),
            timeout_secs,
        }
    }

    /// Run one chat turn.
    ///
    /// Errors only on storage failures; every agent-side failure is converted
    /// into a normal reply.
    pub async fn send(&self, message: &str, session_id: Option<String>) -> Result<ChatReply> {
        let status = self.probe.check_status().await;
        let session_id =
            session_id.unwrap_or_else(|| record::generated_session_id(record::now_millis()));

        let user_entry = MessageRecord::user(&session_id, message, &self.project);
        self.log.append(&user_entry).await?;

        if !status.running {
            log::info!("chat turn for {session_id} answered without a running agent");
            return self
                .reply(session_id, NOT_RUNNING_REPLY.to_string(), Some(NOT_RUNNING_WARNING))
                .await;
        }

        let response = match self.invoker.invoke(message).await {
            InvokeOutcome::Completed {
                success: true,
                stdout,
                stderr,
            } => pick_output(&stdout, &stderr)
                .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()),
            InvokeOutcome::TimedOut => timeout_reply(self.timeout_secs),
            InvokeOutcome::Completed {
                success: false,
                stdout,
                stderr,
            } => {
                // A bad exit with partial output still beats a canned apology.
                pick_output(&stdout, &stderr)
                    .unwrap_or_else(|| failure_reply("process exited with a non-zero status"))
            }
            InvokeOutcome::Failed { error } => {
                log::error!("agent invocation failed: {error}");
                failure_reply(&error)
            }
        };

        self.reply(session_id, response, None).await
    }

    async fn reply(
        &self,
        session_id: String,
        response: String,
        warning: Option<&str>,
    ) -> Result<ChatReply> {
        let entry = MessageRecord::assistant(&session_id, &response, &self.project);
        self.log.append(&entry).await?;

        Ok(ChatReply {
            response,
            session_id,
            timestamp: record::now_millis(),
            warning: warning.map(str::to_string),
        })
    }
}

/// Trimmed stdout, else trimmed stderr, else nothing
fn pick_output(stdout: &str, stderr: &str) -> Option<String> {
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return Some(stdout.to_string());
    }
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return Some(stderr.to_string());
    }
    None
}
