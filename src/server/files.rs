//! Sandboxed file-browsing endpoints
//!
//! All paths resolve against the configured root. Parent-directory components
//! are rejected outright, and existing paths are canonicalized and re-checked
//! so a symlink cannot escape the root either.

use std::path::{Component, Path as StdPath, PathBuf};
use std::time::UNIX_EPOCH;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{DeckError, Result};
use crate::history::record::now_millis;

use super::AppState;

/// Path query parameter for browse/read
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    path: Option<String>,
}

/// Body of a file write request
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    path: Option<String>,
    content: Option<String>,
}

/// Body of a file delete request
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    path: Option<String>,
}

/// GET /api/files/browse
pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<Value>> {
    let root = &state.config.files_root;
    let target = match query.path.as_deref() {
        Some(requested) => resolve_path(root, requested)?,
        None => root.clone(),
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(&target).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        files.push(json!({
            "name": entry.file_name().to_string_lossy(),
            "type": if metadata.is_dir() { "directory" } else { "file" },
            "size": if metadata.is_file() { metadata.len() } else { 0 },
            "modifiedAt": modified_millis(&metadata),
        }));
    }

    // Directories first, then by name.
    files.sort_by(|a, b| {
        let type_a = a["type"].as_str().unwrap_or("");
        let type_b = b["type"].as_str().unwrap_or("");
        if type_a == type_b {
            a["name"].as_str().cmp(&b["name"].as_str())
        } else if type_a == "directory" {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    Ok(Json(json!({
        "path": target.to_string_lossy(),
        "files": files,
    })))
}

/// GET /api/files/read
pub async fn read_file(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<Value>> {
    let requested = query
        .path
        .as_deref()
        .ok_or_else(|| DeckError::validation("path is required"))?;
    let target = resolve_path(&state.config.files_root, requested)?;

    if !target.exists() {
        return Err(DeckError::not_found(format!("file {requested}")));
    }

    let metadata = tokio::fs::metadata(&target).await?;
    if metadata.is_dir() {
        return Err(DeckError::validation("path is a directory"));
    }
    if metadata.len() > state.config.max_read_bytes {
        return Err(DeckError::validation(format!(
            "file too large (>{} bytes)",
            state.config.max_read_bytes
        )));
    }

    let content = tokio::fs::read_to_string(&target).await?;
    Ok(Json(json!({
        "path": target.to_string_lossy(),
        "content": content,
        "size": metadata.len(),
        "modifiedAt": modified_millis(&metadata),
    })))
}

/// POST /api/files/write
pub async fn write_file(
    State(state): State<AppState>,
    Json(body): Json<WriteRequest>,
) -> Result<Json<Value>> {
    let (Some(requested), Some(content)) = (body.path.as_deref(), body.content) else {
        return Err(DeckError::validation("path and content are required"));
    };
    let target = resolve_path(&state.config.files_root, requested)?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, content).await?;

    Ok(Json(json!({
        "success": true,
        "path": target.to_string_lossy(),
        "timestamp": now_millis(),
    })))
}

/// DELETE /api/files/delete
pub async fn delete_file(
    State(state): State<AppState>,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<Value>> {
    let requested = body
        .path
        .as_deref()
        .ok_or_else(|| DeckError::validation("path is required"))?;
    let target = resolve_path(&state.config.files_root, requested)?;

    if !target.exists() {
        return Err(DeckError::not_found(format!("file {requested}")));
    }

    if tokio::fs::metadata(&target).await?.is_dir() {
        tokio::fs::remove_dir_all(&target).await?;
    } else {
        tokio::fs::remove_file(&target).await?;
    }

    Ok(Json(json!({
        "success": true,
        "path": target.to_string_lossy(),
        "timestamp": now_millis(),
    })))
}

/// Resolve a requested path against the root, rejecting escapes.
///
/// Parent-directory components are always rejected, even ones that would
/// resolve inside the root. Existing paths are canonicalized and re-checked
/// to close the symlink hole.
fn resolve_path(root: &StdPath, requested: &str) -> Result<PathBuf> {
    let candidate = if StdPath::new(requested).is_absolute() {
        PathBuf::from(requested)
    } else {
        root.join(requested)
    };

    for component in candidate.components() {
        if matches!(component, Component::ParentDir) {
            return Err(DeckError::AccessDenied);
        }
    }

    if !candidate.starts_with(root) {
        return Err(DeckError::AccessDenied);
    }

    if candidate.exists() {
        let canonical_root = root.canonicalize()?;
        let canonical = candidate.canonicalize()?;
        if !canonical.starts_with(&canonical_root) {
            return Err(DeckError::AccessDenied);
        }
        return Ok(canonical);
    }

    Ok(candidate)
}

fn modified_millis(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_components() {
        let root = StdPath::new("/srv/work");
        assert!(matches!(
            resolve_path(root, "../etc/passwd"),
            Err(DeckError::AccessDenied)
        ));
        assert!(matches!(
            resolve_path(root, "a/../../b"),
            Err(DeckError::AccessDenied)
        ));
    }

    #[test]
    fn rejects_absolute_paths_outside_root() {
        let root = StdPath::new("/srv/work");
        assert!(matches!(
            resolve_path(root, "/etc/passwd"),
            Err(DeckError::AccessDenied)
        ));
    }

    #[test]
    fn accepts_relative_paths_inside_root() {
        let root = StdPath::new("/srv/work");
        let resolved = resolve_path(root, "src/main.rs").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/work/src/main.rs"));
    }

    #[test]
    fn accepts_absolute_paths_inside_root() {
        let root = StdPath::new("/srv/work");
        let resolved = resolve_path(root, "/srv/work/notes.txt").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/work/notes.txt"));
    }

    #[test]
    fn symlink_escape_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        std::fs::write(&secret, "hidden").unwrap();

        #[cfg(unix)]
        {
            let link = root.path().join("link.txt");
            std::os::unix::fs::symlink(&secret, &link).unwrap();
            assert!(matches!(
                resolve_path(root.path(), "link.txt"),
                Err(DeckError::AccessDenied)
            ));
        }
    }
}
