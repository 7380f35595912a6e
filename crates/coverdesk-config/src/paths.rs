//! Runtime file locations.

use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// All runtime files live under one base directory, `~/.coverdesk` by
/// default.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Base dir in the user's home directory.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::with_base_dir(home.join(".coverdesk")))
    }

    /// Explicit base dir (tests, `--base-dir`).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("data").join("coverdesk.db")
    }

    pub fn rates_file(&self) -> PathBuf {
        self.base_dir.join("data").join("rates.db")
    }

    pub fn tokens_file(&self) -> PathBuf {
        self.base_dir.join("auth").join("tokens.json")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.base_dir.join("pdfs")
    }

    /// Create every directory the daemon writes into.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.base_dir.join("data"))?;
        std::fs::create_dir_all(self.base_dir.join("auth"))?;
        std::fs::create_dir_all(self.pdf_dir())?;
        Ok(())
    }
}
