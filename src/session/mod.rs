#![forbid(unsafe_code)]

//! Stored credential handling. The auth provider issues the token out of
//! band; this module only persists what it handed us and resolves one
//! `Session` at startup, which is then passed explicitly to every consumer.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::TodotuiError;

pub const USER_ID_ENV: &str = "TODOTUI_USER_ID";
pub const TOKEN_ENV: &str = "TODOTUI_TOKEN";

/// On-disk shape of the session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolved identity for this process. Built once; a missing token is
/// allowed (requests go out unauthenticated and the backend decides), a
/// missing user id is not (it is part of every request path).
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub token: Option<String>,
}

#[must_use]
pub fn session_path(cfg: &Config) -> PathBuf {
    PathBuf::from(crate::config::expand_tilde(&cfg.session.file))
}

pub fn load_state(path: &Path) -> anyhow::Result<SessionState> {
    if !path.exists() {
        return Ok(SessionState::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn save_state(path: &Path, state: &SessionState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(state)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}

/// Sign out: explicit invalidation of the stored session.
pub fn clear_state(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Stored file plus environment overrides. Fails with `NotSignedIn` when no
/// user id is available from either source.
pub fn resolve(cfg: &Config) -> anyhow::Result<Session> {
    let state = load_state(&session_path(cfg))?;
    let user_id = std::env::var(USER_ID_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or(state.user_id)
        .ok_or(TodotuiError::NotSignedIn)?;
    let token = std::env::var(TOKEN_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or(state.token);
    Ok(Session {
        user_id,
        email: state.email,
        token,
    })
}
