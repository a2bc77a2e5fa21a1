//! Location of the configuration directory and the files inside it

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::config::{APP_DIR, CONNECTIONS_FILE, DIR_ENV, PREFERENCES_FILE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    dir: PathBuf,
}

impl AppPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve the directory: explicit override, then `WRDM_CONFIG_DIR`,
    /// then the platform config dir, then the working directory.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(dir) = explicit {
            return Self::new(dir);
        }

        if let Ok(dir) = env::var(DIR_ENV)
            && !dir.trim().is_empty()
        {
            debug!(dir = %dir, "Using config directory from {}", DIR_ENV);
            return Self::new(dir);
        }

        let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push(APP_DIR);
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn preferences(&self) -> PathBuf {
        self.dir.join(PREFERENCES_FILE)
    }

    pub fn connections(&self) -> PathBuf {
        self.dir.join(CONNECTIONS_FILE)
    }
}
