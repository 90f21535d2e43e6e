//! Persisted agent state.
//!
//! Stored as JSON at `~/.coop-relay/state.json` unless overridden, so a
//! restarted device keeps its relay id and any code still awaiting a claim.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// Identity assigned by the backend on first pairing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_id: Option<String>,
    /// Code handed out for the current pairing epoch, until claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(default)]
    pub claimed: bool,
}

impl AgentState {
    /// `~/.coop-relay/state.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".coop-relay").join("state.json"))
    }

    /// Load from `path`. A missing file is a fresh device; an unreadable
    /// one is logged and treated the same way.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read agent state; starting fresh");
                return Self::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Corrupt agent state; starting fresh");
            Self::default()
        })
    }

    /// Write to `path` through a sibling temp file so a crash never leaves
    /// a half-written state behind.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = AgentState::load(&dir.path().join("state.json"));
        assert_eq!(state, AgentState::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let state = AgentState {
            relay_id: Some("r1".into()),
            pairing_code: Some("04213099".into()),
            claimed: false,
        };
        state.save(&path).unwrap();
        assert_eq!(AgentState::load(&path), state);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(AgentState::load(&path), AgentState::default());
    }

    #[test]
    fn claimed_state_omits_code() {
        let state = AgentState {
            relay_id: Some("r1".into()),
            pairing_code: None,
            claimed: true,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, serde_json::json!({"relay_id": "r1", "claimed": true}));
    }
}
