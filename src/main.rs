// Dashboard service binary.
//
// Wires the concrete probe and invoker into the component graph and serves
// the HTTP surface until interrupted.

use std::sync::Arc;

use anyhow::Result;

use agentdeck::probe::ProcessTableProbe;
use agentdeck::relay::{AgentInvoker, CliInvoker};
use agentdeck::server::{self, AppState};
use agentdeck::{AgentProbe, DeckConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = DeckConfig::from_env();
    log::info!(
        "agentdeck {} starting (history: {})",
        agentdeck::VERSION,
        config.history_path().display()
    );

    let probe: Arc<dyn AgentProbe> = Arc::new(ProcessTableProbe::new(&config.agent_command));
    let invoker: Arc<dyn AgentInvoker> = Arc::new(CliInvoker::new(
        &config.agent_command,
        config.files_root.clone(),
        config.invoke_timeout,
        config.max_output_bytes,
    ));

    let state = AppState::new(config, probe, invoker);
    let handle = server::start(state).await?;
    handle.wait().await;

    Ok(())
}
