//! File system paths for the kiosk clients.

use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Manages file system paths for kiosk client data.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.flavormix)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.flavormix`.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".flavormix"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.flavormix).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.flavormix/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the queue snapshot path (~/.flavormix/queue.json).
    pub fn queue_file(&self) -> PathBuf {
        self.base_dir.join("queue.json")
    }

    /// Create the base directory if it does not exist.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}
