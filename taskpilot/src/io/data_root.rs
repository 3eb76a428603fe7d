//! Confined filesystem access under the restricted data root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::path::{PathViolation, relative_under_root};

/// Handle to the restricted data directory. Every caller path goes through
/// [`DataRoot::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Map a caller path onto an absolute path under the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, PathViolation> {
        relative_under_root(&self.root, requested).map(|rel| self.root.join(rel))
    }

    pub fn exists(&self, requested: &str) -> Result<bool, PathViolation> {
        Ok(self.resolve(requested)?.exists())
    }

    pub fn read_to_string(&self, requested: &str) -> Result<String> {
        let path = self.resolve(requested)?;
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn read_bytes(&self, requested: &str) -> Result<Vec<u8>> {
        let path = self.resolve(requested)?;
        fs::read(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Write `contents`, creating parent directories under the root as needed.
    pub fn write(&self, requested: &str, contents: &str) -> Result<PathBuf> {
        let path = self.resolve(requested)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
