//! Install receipts.
//!
//! A receipt records which release of a package is installed and every file
//! the install placed, so the package can be tested and removed later
//! without consulting its manifest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::Prefix;
use formulary_schema::{PackageName, Sha256Digest, Version};

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt receipt {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// What an install placed on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub name: PackageName,
    pub version: Version,
    /// Digest of the artifact that was installed.
    pub sha256: Sha256Digest,
    pub url: String,
    /// Unix timestamp of the install.
    pub installed_at: i64,
    /// Absolute paths of installed files, in install-step order.
    pub files: Vec<PathBuf>,
}

impl Receipt {
    /// Load the receipt for `name`, if the package is installed.
    ///
    /// A name that is not a valid package name is never installed; it is not
    /// used to build a path.
    pub fn load(prefix: &Prefix, name: &PackageName) -> Result<Option<Self>, ReceiptError> {
        if !name.is_valid() {
            return Ok(None);
        }
        let path = prefix.receipt_path(name);
        if !path.exists() {
            return Ok(None);
        }
        read(&path).map(Some)
    }

    /// Every receipt in the prefix, sorted by package name.
    pub fn list(prefix: &Prefix) -> Result<Vec<Self>, ReceiptError> {
        let dir = prefix.receipts();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let io_err = |source| ReceiptError::Io {
            path: dir.clone(),
            source,
        };

        let mut receipts = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                receipts.push(read(&path)?);
            }
        }
        receipts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(receipts)
    }

    /// Persist the receipt atomically (write to a temp file, then rename).
    pub fn save(&self, prefix: &Prefix) -> Result<(), ReceiptError> {
        let path = prefix.receipt_path(&self.name);
        let io_err = |source| ReceiptError::Io {
            path: path.clone(),
            source,
        };

        let content = serde_json::to_string_pretty(self).map_err(|source| ReceiptError::Parse {
            path: path.clone(),
            source,
        })?;

        std::fs::create_dir_all(prefix.receipts()).map_err(io_err)?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).map_err(io_err)?;
        std::fs::rename(&temp_path, &path).map_err(io_err)?;
        Ok(())
    }

    /// Delete the receipt file.
    pub fn delete(prefix: &Prefix, name: &PackageName) -> Result<(), ReceiptError> {
        if !name.is_valid() {
            return Ok(());
        }
        let path = prefix.receipt_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ReceiptError::Io { path, source }),
        }
    }

    /// Install time formatted for display.
    pub fn installed_date(&self) -> String {
        chrono::DateTime::from_timestamp(self.installed_at, 0)
            .unwrap_or_default()
            .format("%Y-%m-%d")
            .to_string()
    }
}

fn read(path: &Path) -> Result<Receipt, ReceiptError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReceiptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ReceiptError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
