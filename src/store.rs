//! Loading and saving whole documents.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Where a document's text lives.
pub trait DocumentStore {
    /// Create an empty document if none exists yet.
    fn create(&self) -> Result<()>;

    fn load(&self) -> Result<String>;

    fn save(&self, text: &str) -> Result<()>;
}

/// A document stored as a plain file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileStore {
    fn create(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&self.path, "")
            .with_context(|| format!("Failed to create {}", self.path.display()))
    }

    fn load(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }

    fn save(&self, text: &str) -> Result<()> {
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_then_load_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("notes").join("new.md"));
        store.create().unwrap();
        assert_eq!(store.load().unwrap(), "");
    }

    #[test]
    fn test_create_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("doc.md"));
        store.save("# kept").unwrap();
        store.create().unwrap();
        assert_eq!(store.load().unwrap(), "# kept");
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.md"));
        let err = store.load().unwrap_err();
        assert!(format!("{err}").contains("missing.md"));
    }
}
