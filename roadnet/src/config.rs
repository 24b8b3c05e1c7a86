use crate::history::DEFAULT_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Editor settings, read from a JSON file. Every key is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Undo units kept before the oldest is dropped.
    pub undo_depth: usize,
    /// Auto-save rotates through `_autosave_1` .. `_autosave_N`.
    pub autosave_slots: u32,
    pub autosave_backoff_secs: u64,
    pub autosave_attempts: u32,
    /// Half the map width in world units; moves past it are refused per axis.
    pub map_half_extent: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            undo_depth: DEFAULT_DEPTH,
            autosave_slots: 10,
            autosave_backoff_secs: 5,
            autosave_attempts: 12,
            map_half_extent: 1024.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: EditorConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = EditorConfig::from_json_str(&text)?;
        log::info!("editor config loaded from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.undo_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "undo_depth",
                reason: "must be at least 1",
            });
        }
        if self.autosave_slots == 0 {
            return Err(ConfigError::Invalid {
                field: "autosave_slots",
                reason: "must be at least 1",
            });
        }
        if !(self.map_half_extent.is_finite() && self.map_half_extent > 0.0) {
            return Err(ConfigError::Invalid {
                field: "map_half_extent",
                reason: "must be a positive number",
            });
        }
        Ok(())
    }
}
