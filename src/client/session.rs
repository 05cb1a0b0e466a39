//! Persisted login session.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::User;

/// What `login` leaves behind for later commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub api_url: String,
    pub token: String,
    pub user: User,
}

/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_session(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading session {}", path.display()))?;
    let session = serde_json::from_str(&raw)
        .with_context(|| format!("parsing session {}", path.display()))?;
    Ok(Some(session))
}

/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(session)?;
    std::fs::write(path, body).with_context(|| format!("writing session {}", path.display()))?;
    restrict_permissions(path)?;
    Ok(())
}

/// Remove the session file; returns whether one existed.
///
/// # Errors
/// Returns an error if an existing file cannot be removed.
pub fn clear_session(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    Ok(true)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("restricting {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
