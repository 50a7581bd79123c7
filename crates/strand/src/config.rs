//! Scene configuration, loaded from TOML.
//!
//! ```toml
//! dedup_lookups = true
//! max_flush_rounds = 64
//! notify_unchanged = false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_MAX_FLUSH_ROUNDS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Store each (name, downstream) ledger pair at most once.
    pub dedup_lookups: bool,
    /// Rounds one flush may run before giving up on a cycle. Scenes with
    /// more formulas than this get one round per formula plus one.
    pub max_flush_rounds: usize,
    /// Notify subscribers even when a recomputed value did not change.
    pub notify_unchanged: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            dedup_lookups: true,
            max_flush_rounds: DEFAULT_MAX_FLUSH_ROUNDS,
            notify_unchanged: false,
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
