//! Pass-through endpoints for agent configuration and CLI subcommands
//!
//! These are simple I/O plumbing by design: settings files are served as
//! JSON blobs, and MCP management shells out to the agent CLI and relays its
//! line-oriented output. Missing files and failed subcommands degrade to
//! empty collections, matching how the agent CLI itself behaves before first
//! use.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tokio::process::Command;

use crate::error::{DeckError, Result};
use crate::history::record::now_millis;

use super::AppState;

/// GET /api/agents — agent definitions from `settings.json`
pub async fn agents(State(state): State<AppState>) -> Result<Json<Value>> {
    let path = state.config.settings_path();
    let Ok(data) = tokio::fs::read_to_string(&path).await else {
        return Ok(Json(json!({ "agents": [] })));
    };

    let settings: Value = serde_json::from_str(&data)?;
    let agents: Vec<Value> = settings
        .get("agents")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(name, config)| {
                    json!({
                        "name": name,
                        "description": config.get("description").and_then(Value::as_str).unwrap_or(""),
                        "prompt": config.get("prompt").and_then(Value::as_str).unwrap_or(""),
                        "allowedTools": config.get("allowedTools").cloned().unwrap_or_else(|| json!([])),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(json!({ "agents": agents })))
}

/// GET /api/permissions — permission rules from `settings.local.json`
pub async fn permissions(State(state): State<AppState>) -> Result<Json<Value>> {
    let path = state.config.local_settings_path();
    let Ok(data) = tokio::fs::read_to_string(&path).await else {
        return Ok(Json(json!({ "permissions": { "allow": [] } })));
    };

    let settings: Value = serde_json::from_str(&data)?;
    let permissions = settings
        .get("permissions")
        .cloned()
        .unwrap_or_else(|| json!({ "allow": [] }));

    Ok(Json(json!({ "permissions": permissions })))
}

/// GET /api/mcp — parsed `claude mcp list` output
pub async fn mcp_list(State(state): State<AppState>) -> Json<Value> {
    let output = Command::new(&state.config.agent_command)
        .args(["mcp", "list"])
        .output()
        .await;

    let mcps: Vec<Value> = match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            stdout
                .lines()
                .filter(|line| !line.trim().is_empty() && !line.contains("No MCP"))
                .map(|line| {
                    let name = line.split_whitespace().next().unwrap_or("unknown");
                    json!({
                        "name": name,
                        "enabled": !line.contains("disabled"),
                        "description": line,
                    })
                })
                .collect()
        }
        // MCP may simply not be configured; an empty list is the answer.
        _ => Vec::new(),
    };

    Json(json!({ "mcps": mcps }))
}

/// GET /api/mcp/{name} — raw `claude mcp get` output
pub async fn mcp_get(State(state): State<AppState>, Path(name): Path<String>) -> Json<Value> {
    let output = Command::new(&state.config.agent_command)
        .args(["mcp", "get", &name])
        .output()
        .await;

    let details = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Ok(output) => String::from_utf8_lossy(&output.stderr).into_owned(),
        Err(e) => format!("failed to run {} mcp get: {e}", state.config.agent_command),
    };

    Json(json!({
        "name": name,
        "details": details,
        "timestamp": now_millis(),
    }))
}

/// POST /api/mcp/{name}/toggle
pub async fn mcp_toggle(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let enabled = body
        .get("enabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| DeckError::validation("enabled is required"))?;

    let action = if enabled { "enable" } else { "disable" };
    let result = Command::new(&state.config.agent_command)
        .args(["mcp", action, &name])
        .output()
        .await;

    // Older CLI versions lack the subcommand; report the requested state anyway.
    if let Err(e) = result {
        log::warn!("mcp {action} {name} could not be run: {e}");
    }

    Ok(Json(json!({
        "name": name,
        "enabled": enabled,
        "timestamp": now_millis(),
    })))
}

/// GET /api/todos — merged per-session todo files
///
/// Tolerant by design: unreadable or malformed files are skipped, never an
/// error, because todo files are written by a different process mid-flight.
pub async fn todos(State(state): State<AppState>) -> Json<Value> {
    let dir = state.config.todos_dir();
    let mut all = Vec::new();

    if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(session_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let Ok(data) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&data) else {
                continue;
            };
            for mut item in items {
                if let Some(object) = item.as_object_mut() {
                    object.insert("sessionId".to_string(), json!(session_id));
                }
                all.push(item);
            }
        }
    }

    Json(json!({ "todos": all }))
}

/// POST /api/execute — quick agent subcommand execution
pub async fn execute(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let command = body
        .get("command")
        .and_then(Value::as_str)
        .filter(|command| !command.is_empty())
        .ok_or_else(|| DeckError::validation("command is required"))?;

    let args: Vec<String> = body
        .get("args")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut cmd = Command::new(&state.config.agent_command);
    cmd.arg(command)
        .args(&args)
        .current_dir(&state.config.files_root);

    let output = tokio::time::timeout(state.config.execute_timeout, cmd.output())
        .await
        .map_err(|_| {
            DeckError::AgentTimeout(state.config.execute_timeout.as_secs())
        })?
        .map_err(|e| DeckError::invocation(format!("failed to run {command}: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stdout.trim().is_empty() {
        stderr.into_owned()
    } else {
        stdout.into_owned()
    };

    Ok(Json(json!({
        "success": output.status.success(),
        "output": text,
        "timestamp": now_millis(),
    })))
}
