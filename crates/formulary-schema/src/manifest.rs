//! Package manifest ("formula") definitions.
//!
//! A manifest is a flat TOML document:
//!
//! ```toml
//! name = "ecsfgrun"
//! desc = "AWS assume role credential wrapper"
//! homepage = "https://github.com/masahide/ecsfgrun"
//! url = "https://github.com/masahide/ecsfgrun/releases/download/v0.1.0/ecsfgrun_Darwin_x86_64.tar.gz"
//! version = "0.1.0"
//! sha256 = "1ff7ad71d900e90e29c4cadd4930d253a09392702af53731d71ecca6a2e50318"
//! test = ["{bin}/ecsfgrun -v"]
//!
//! [[install]]
//! source = "ecsfgrun"
//! destination = "bin"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arch::Platform;
use crate::hash::Sha256Hash;
use crate::types::{ArtifactFormat, PackageName, Version};

/// Errors that can occur when loading or parsing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// An I/O error occurred while reading a manifest file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a manifest.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The manifest could not be serialized back to TOML.
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Directory category an installed file is placed into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Executables (`<prefix>/bin`); installed with mode `0755`.
    #[default]
    Bin,
    /// Libraries (`<prefix>/lib`).
    Lib,
    /// Shared data (`<prefix>/share`).
    Share,
}

impl Destination {
    /// Every destination category, in prefix layout order.
    pub const ALL: [Destination; 3] = [Self::Bin, Self::Lib, Self::Share];

    /// Directory name under the install prefix, also used as the test
    /// command placeholder (`{bin}`).
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Lib => "lib",
            Self::Share => "share",
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A single file-placement action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallStep {
    /// Path of the file inside the extracted artifact.
    pub source: String,
    /// Category directory the file is copied into.
    #[serde(default)]
    pub destination: Destination,
    /// Installed file name, when it should differ from the source's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl InstallStep {
    /// A step that installs `source` into `bin`.
    pub fn bin(source: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: Destination::Bin,
            rename: None,
        }
    }

    /// Name the file will have in its destination directory.
    pub fn target_name(&self) -> &str {
        self.rename.as_deref().unwrap_or_else(|| {
            self.source
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(&self.source)
        })
    }
}

/// A declarative package manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Package identifier, unique within a formulary.
    pub name: PackageName,
    /// Short human-readable description.
    #[serde(default)]
    pub desc: String,
    /// Project homepage.
    #[serde(default)]
    pub homepage: String,
    /// Download URL of the release artifact.
    pub url: String,
    /// Release version; must appear in `url` as the release tag.
    pub version: Version,
    /// Expected SHA-256 of the artifact at `url`.
    pub sha256: Sha256Hash,
    /// Post-install smoke-test commands, run in order.
    #[serde(default)]
    pub test: Vec<String>,
    /// File-placement steps, run in order.
    #[serde(default)]
    pub install: Vec<InstallStep>,
}

impl Manifest {
    /// Parse a manifest from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Io` if the file cannot be read, or
    /// `ManifestError::Parse` if the TOML content is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Parse` if the TOML content is invalid or does
    /// not match the manifest schema.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize this manifest to a pretty-printed TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Serialize` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write this manifest to `path`, replacing any existing file.
    ///
    /// The content is written to a sibling temporary file first and renamed
    /// into place so readers never see a partial manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, writing or the rename fails.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = self.to_toml()?;
        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Archive format of the artifact, inferred from the URL.
    pub fn format(&self) -> ArtifactFormat {
        ArtifactFormat::detect(&self.url)
    }

    /// Target platform named in the artifact's file name, if any.
    pub fn platform(&self) -> Option<Platform> {
        Platform::from_artifact_name(&self.url)
    }

    /// File name of the artifact at `url`.
    pub fn artifact_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or("")
    }

    /// Produce the next revision of this manifest for a new release.
    ///
    /// Only the release-specific fields change; name, description, homepage,
    /// install and test steps carry over.
    pub fn bumped(&self, version: Version, url: String, sha256: Sha256Hash) -> Self {
        Self {
            version,
            url,
            sha256,
            ..self.clone()
        }
    }
}

impl std::str::FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
