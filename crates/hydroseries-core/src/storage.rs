use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Local working directory a component writes its outputs into. Components
/// share nothing in memory; the orchestrator moves the files between tasks.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    local_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
        }
    }

    /// Ensure the working directory exists.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.local_dir)?;
        Ok(())
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// Absolute location of an output file inside the working directory.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.local_dir.join(file_name)
    }
}
