//! # agentdeck
//!
//! A local dashboard service that supervises an interactive Claude Code
//! session: it keeps the append-only chat history, derives session views
//! from it, probes the agent process for liveness, and relays chat messages
//! to the agent CLI.
//!
//! ## Architecture
//!
//! - [`history`]: the JSONL message log and the session views derived from it
//! - [`probe`]: agent liveness detection behind the [`AgentProbe`] seam
//! - [`relay`]: one chat turn end to end, with fixed fallback replies
//! - [`server`]: the axum HTTP surface
//! - [`config`]: service configuration
//! - [`error`]: error types and handling
//!
//! The history file is the single source of truth: sessions are never
//! cached, they are recomputed from a full scan on every read. All log
//! mutations are serialized through one writer lock per log, so a session
//! delete can never lose a concurrent append.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentdeck::{AppState, DeckConfig};
//! use agentdeck::probe::ProcessTableProbe;
//! use agentdeck::relay::CliInvoker;
//!
//! # async fn example() -> std::io::Result<()> {
//! let config = DeckConfig::from_env();
//! let probe = Arc::new(ProcessTableProbe::new(&config.agent_command));
//! let invoker = Arc::new(CliInvoker::new(
//!     &config.agent_command,
//!     config.files_root.clone(),
//!     config.invoke_timeout,
//!     config.max_output_bytes,
//! ));
//!
//! let state = AppState::new(config, probe, invoker);
//! let handle = agentdeck::server::start(state).await?;
//! handle.wait().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! All fallible operations return [`Result<T, DeckError>`](Result). Agent
//! failures during a chat turn (not running, timeout, bad exit) are not
//! errors: the relay converts them into normal assistant replies so the UI
//! stays responsive, and logs both sides of the exchange either way.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod history;
pub mod probe;
pub mod relay;
pub mod server;

// Re-export commonly used types for external API
pub use config::{DeckConfig, DeckConfigBuilder};
pub use error::{DeckError, Result};
pub use history::log::MessageLog;
pub use history::record::{MessageRecord, PastedContent, Role};
pub use history::sessions::{
    MessagePage, SessionDetail, SessionMessage, SessionSummary, list_sessions, page_messages,
    session_detail,
};
pub use probe::{AgentProbe, AgentStatus, ProcessTableProbe};
pub use relay::{AgentInvoker, ChatRelay, ChatReply, CliInvoker, InvokeOutcome};
pub use server::{AppState, ServerHandle, build_router};

/// Version of the service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
