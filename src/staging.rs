use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Provides empty working directories for audit artifacts.
///
/// The caller owns every directory it acquires and is responsible for
/// releasing it once the intake session is over.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<name>`, cleared and recreated. Two runs acquiring the same
    /// name share (and wipe) one directory.
    pub fn acquire(&self, name: &str) -> EngineResult<PathBuf> {
        let path = self.root.join(name);
        if path.exists() {
            debug!("Clearing staging directory {:?}", path);
            fs::remove_dir_all(&path).map_err(|e| EngineError::io(&path, e))?;
        }
        fs::create_dir_all(&path).map_err(|e| EngineError::io(&path, e))?;
        Ok(path)
    }

    /// `<root>/<name>-<uuid>`, a fresh directory no other run can collide with
    pub fn acquire_unique(&self, name: &str) -> EngineResult<PathBuf> {
        let path = self.root.join(format!("{}-{}", name, Uuid::new_v4()));
        fs::create_dir_all(&path).map_err(|e| EngineError::io(&path, e))?;
        info!("Staging artifacts in {:?}", path);
        Ok(path)
    }

    /// Remove a previously acquired directory; missing directories are fine
    pub fn release(&self, path: &Path) -> EngineResult<()> {
        if path.exists() {
            fs::remove_dir_all(path).map_err(|e| EngineError::io(path, e))?;
            debug!("Released staging directory {:?}", path);
        }
        Ok(())
    }
}
