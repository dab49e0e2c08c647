//! Document persistence for retext-core
//!
//! Loading and saving document text goes through the `DocumentStore`
//! trait so the editor core never touches the filesystem directly.

use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};

/// Loads and saves document text by path.
pub trait DocumentStore {
    fn load(&self, path: &Path) -> Result<String>;
    fn save(&self, path: &Path, text: &str) -> Result<()>;
}

/// `DocumentStore` backed by the local filesystem, UTF-8 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for FsStore {
    fn load(&self, path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Read {} bytes from {}", text.len(), path.display());
        Ok(text)
    }

    fn save(&self, path: &Path, text: &str) -> Result<()> {
        std::fs::write(path, text).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Saved file: {}", path.display());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
