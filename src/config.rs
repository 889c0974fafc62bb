//! Service configuration
//!
//! Defaults mirror a stock Claude Code installation: history and settings
//! under `~/.claude`, the `claude` binary on PATH, and the service working
//! directory as the browsing root.

use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP listen port, overridable via `PORT`
const DEFAULT_PORT: u16 = 3001;

/// Time bound for one synchronous agent invocation
const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(60);

/// Time bound for quick-command execution
const DEFAULT_EXECUTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-stream output cap for agent invocations (5 MiB)
const DEFAULT_MAX_OUTPUT_BYTES: usize = 5 * 1024 * 1024;

/// File size cap for the files read endpoint (1 MiB)
const DEFAULT_MAX_READ_BYTES: u64 = 1024 * 1024;

/// Configuration for the dashboard service
#[derive(Debug, Clone)]
pub struct DeckConfig {
    /// Directory holding the agent's configuration and history (`~/.claude`)
    pub claude_dir: PathBuf,
    /// Agent CLI command name
    pub agent_command: String,
    /// HTTP listen port
    pub port: u16,
    /// Root served by the files API; also the agent's working directory
    pub files_root: PathBuf,
    /// Timeout for one chat-turn invocation
    pub invoke_timeout: Duration,
    /// Timeout for quick-command execution
    pub execute_timeout: Duration,
    /// Per-stream output cap for agent invocations
    pub max_output_bytes: usize,
    /// File size cap for the files read endpoint
    pub max_read_bytes: u64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            claude_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".claude"),
            agent_command: "claude".to_string(),
            port: DEFAULT_PORT,
            files_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
            execute_timeout: DEFAULT_EXECUTE_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }
}

impl DeckConfig {
    /// Create a new builder for `DeckConfig`
    #[must_use]
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder::default()
    }

    /// Defaults with environment overrides applied (`PORT`)
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            config.port = port;
        }
        config
    }

    /// Path of the append-only history log
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.claude_dir.join("history.jsonl")
    }

    /// Path of the agent settings file
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.claude_dir.join("settings.json")
    }

    /// Path of the local (permissions) settings file
    #[must_use]
    pub fn local_settings_path(&self) -> PathBuf {
        self.claude_dir.join("settings.local.json")
    }

    /// Directory of per-session todo files
    #[must_use]
    pub fn todos_dir(&self) -> PathBuf {
        self.claude_dir.join("todos")
    }
}

/// Builder for `DeckConfig`
#[derive(Debug, Default)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    /// Set the agent configuration directory
    #[must_use]
    pub fn claude_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.claude_dir = path.into();
        self
    }

    /// Set the agent CLI command name
    #[must_use]
    pub fn agent_command(mut self, command: impl Into<String>) -> Self {
        self.config.agent_command = command.into();
        self
    }

    /// Set the HTTP listen port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the files API root / agent working directory
    #[must_use]
    pub fn files_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.files_root = path.into();
        self
    }

    /// Set the chat-turn invocation timeout
    #[must_use]
    pub fn invoke_timeout(mut self, timeout: Duration) -> Self {
        self.config.invoke_timeout = timeout;
        self
    }

    /// Set the per-stream invocation output cap
    #[must_use]
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.config.max_output_bytes = bytes;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> DeckConfig {
        self.config
    }
}
