//! Core newtypes for package names, versions and artifact formats.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::sync::LazyLock;

use regex::Regex;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("name pattern compiles"));

/// A package name as written in a manifest.
///
/// Names are kept exactly as declared; [`PackageName::is_valid`] checks
/// them against the identifier pattern `^[A-Za-z][A-Za-z0-9_-]*$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name (stored as-is).
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is a well-formed identifier.
    pub fn is_valid(&self) -> bool {
        NAME_PATTERN.is_match(&self.0)
    }
}

impl AsRef<std::ffi::OsStr> for PackageName {
    fn as_ref(&self) -> &std::ffi::OsStr {
        self.0.as_ref()
    }
}

impl AsRef<std::path::Path> for PackageName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A version string as written in a manifest.
///
/// Ordering follows semantic versioning when both sides parse; strings that
/// are not semver sort after every valid version and compare lexically among
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.semver(), other.semver()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the version as a semantic version, if it is one.
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.0).ok()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Archive or binary format of a downloadable artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Gzip-compressed tar archive (`.tar.gz` / `.tgz`).
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Uncompressed tar archive (`.tar`).
    Tar,
    /// Zip archive (`.zip`).
    Zip,
    /// Standalone executable with no archive wrapper.
    Binary,
}

impl ArtifactFormat {
    /// Detect the format from a URL or file name suffix.
    ///
    /// Anything without a recognised archive suffix is treated as a bare
    /// binary.
    pub fn detect(url: &str) -> Self {
        let lower = url.to_lowercase();
        let file = lower.rsplit('/').next().unwrap_or(&lower);
        if file.ends_with(".tar.gz") || file.ends_with(".tgz") {
            Self::TarGz
        } else if file.ends_with(".tar") {
            Self::Tar
        } else if file.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Binary
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TarGz => "tar.gz",
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::Binary => "binary",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_pattern() {
        assert!(PackageName::new("ecsfgrun").is_valid());
        assert!(PackageName::new("Foo_bar-2").is_valid());
        assert!(!PackageName::new("2fast").is_valid());
        assert!(!PackageName::new("").is_valid());
        assert!(!PackageName::new("has space").is_valid());
        assert!(!PackageName::new("-dash").is_valid());
    }

    #[test]
    fn version_ordering_is_semantic() {
        let versions = ["0.1.0", "0.2.0", "0.3.0", "0.4.0"].map(Version::from);
        for pair in versions.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
        assert!(Version::from("0.10.0") > Version::from("0.9.0"));
    }

    #[test]
    fn non_semver_sorts_last() {
        assert!(Version::from("9.9.9") < Version::from("nightly"));
        assert!(Version::from("latest") < Version::from("nightly"));
    }

    #[test]
    fn detect_format() {
        let url = "https://github.com/masahide/ecsfgrun/releases/download/v0.4.0/ecsfgrun_Darwin_x86_64.tar.gz";
        assert_eq!(ArtifactFormat::detect(url), ArtifactFormat::TarGz);
        assert_eq!(ArtifactFormat::detect("x/tool.TGZ"), ArtifactFormat::TarGz);
        assert_eq!(ArtifactFormat::detect("x/tool.zip"), ArtifactFormat::Zip);
        assert_eq!(ArtifactFormat::detect("x/tool.tar"), ArtifactFormat::Tar);
        assert_eq!(ArtifactFormat::detect("x/tool"), ArtifactFormat::Binary);
    }
}
