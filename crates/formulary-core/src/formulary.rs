//! A collection of manifests indexed by package name.
//!
//! Every `*.toml` file under the formula directory is a manifest. Several
//! files may describe the same package at different versions; the newest
//! version is the active one and the rest are history.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use formulary_schema::{Manifest, ManifestError, PackageName, Version};

#[derive(Error, Debug)]
pub enum FormularyError {
    #[error("Failed to read formula directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{path}: {source}")]
    Manifest {
        path: PathBuf,
        source: ManifestError,
    },

    #[error("{name} {version} is declared twice: {} and {}", .first.display(), .second.display())]
    Duplicate {
        name: PackageName,
        version: Version,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{name} {proposed} does not supersede {current}: versions must increase")]
    VersionRegression {
        name: PackageName,
        current: Version,
        proposed: Version,
    },

    #[error("No formula named '{0}'")]
    NotFound(String),
}

/// One manifest revision and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub manifest: Manifest,
    /// Source file, when loaded from disk.
    pub path: Option<PathBuf>,
}

/// Manifests indexed by name, each name's revisions kept in ascending
/// version order.
#[derive(Debug, Clone, Default)]
pub struct Formulary {
    packages: BTreeMap<PackageName, Vec<Revision>>,
}

impl Formulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.toml` manifest under `dir`.
    ///
    /// Files are visited in name order so duplicate reports are stable.
    pub fn load(dir: &Path) -> Result<Self, FormularyError> {
        let mut formulary = Self::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }

            let manifest = Manifest::from_file(path).map_err(|source| FormularyError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(name = %manifest.name, version = %manifest.version, path = %path.display(), "loaded manifest");
            formulary.insert(Revision {
                manifest,
                path: Some(path.to_path_buf()),
            })?;
        }

        Ok(formulary)
    }

    /// Add a revision in version order. Re-declaring an existing
    /// (name, version) pair is an error.
    pub fn insert(&mut self, revision: Revision) -> Result<(), FormularyError> {
        let revisions = self
            .packages
            .entry(revision.manifest.name.clone())
            .or_default();

        let pos = revisions.partition_point(|r| r.manifest.version < revision.manifest.version);
        if let Some(existing) = revisions.get(pos) {
            if existing.manifest.version == revision.manifest.version {
                return Err(FormularyError::Duplicate {
                    name: revision.manifest.name.clone(),
                    version: revision.manifest.version.clone(),
                    first: existing.path.clone().unwrap_or_default(),
                    second: revision.path.clone().unwrap_or_default(),
                });
            }
        }
        revisions.insert(pos, revision);
        Ok(())
    }

    /// Make `manifest` the active revision of its package.
    ///
    /// Its version must be strictly greater than the current active one.
    pub fn supersede(&mut self, manifest: Manifest, path: Option<PathBuf>) -> Result<(), FormularyError> {
        if let Some(current) = self.latest(&manifest.name) {
            if manifest.version <= current.version {
                return Err(FormularyError::VersionRegression {
                    name: manifest.name.clone(),
                    current: current.version.clone(),
                    proposed: manifest.version.clone(),
                });
            }
        }
        self.insert(Revision { manifest, path })
    }

    /// The active (newest) manifest for `name`.
    pub fn latest(&self, name: &str) -> Option<&Manifest> {
        self.packages
            .get(name)
            .and_then(|revs| revs.last())
            .map(|r| &r.manifest)
    }

    /// Like [`Formulary::latest`], but an error when missing.
    pub fn get(&self, name: &str) -> Result<&Manifest, FormularyError> {
        self.latest(name)
            .ok_or_else(|| FormularyError::NotFound(name.to_string()))
    }

    /// A specific revision of `name`.
    pub fn find_version(&self, name: &str, version: &str) -> Option<&Manifest> {
        self.revisions(name)
            .iter()
            .map(|r| &r.manifest)
            .find(|m| m.version == version)
    }

    /// All revisions of `name`, oldest first.
    pub fn revisions(&self, name: &str) -> &[Revision] {
        self.packages.get(name).map_or(&[], Vec::as_slice)
    }

    /// Source file of the active revision of `name`.
    pub fn latest_path(&self, name: &str) -> Option<&Path> {
        self.packages
            .get(name)
            .and_then(|revs| revs.last())
            .and_then(|r| r.path.as_deref())
    }

    /// Package names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &PackageName> {
        self.packages.keys()
    }

    /// Every active manifest, sorted by name.
    pub fn active(&self) -> impl Iterator<Item = &Manifest> {
        self.packages
            .values()
            .filter_map(|revs| revs.last().map(|r| &r.manifest))
    }

    /// Every revision of every package.
    pub fn all(&self) -> impl Iterator<Item = &Revision> {
        self.packages.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Whether versions strictly increase along `manifests`.
pub fn strictly_increasing<'a>(manifests: impl IntoIterator<Item = &'a Manifest>) -> bool {
    let mut prev: Option<&Version> = None;
    for m in manifests {
        if prev.is_some_and(|p| p >= &m.version) {
            return false;
        }
        prev = Some(&m.version);
    }
    true
}
