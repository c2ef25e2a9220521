//! Manifest consistency checks.
//!
//! Validation is pure: it looks only at the manifest's own fields. Whether
//! the checksum matches the artifact, and whether install sources exist in
//! it, can only be decided after download and is left to the installer.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::manifest::Manifest;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9.-]+(:[0-9]{1,5})?(/[^\s]*)?$").expect("url pattern compiles")
});

/// A failed manifest check. Every variant is a malformed-manifest failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `name` is not an identifier.
    #[error("invalid name '{0}': must match ^[A-Za-z][A-Za-z0-9_-]*$")]
    InvalidName(String),

    /// A required field is absent or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A URL field is not a well-formed http(s) URL.
    #[error("invalid {field} URL '{url}'")]
    InvalidUrl {
        /// Which field held the URL (`url` or `homepage`).
        field: &'static str,
        /// The offending value.
        url: String,
    },

    /// `version` is not a semantic version.
    #[error("invalid version '{0}': expected a semantic version such as 0.4.0")]
    InvalidVersion(String),

    /// `url` does not carry `version` as its release-tag path segment.
    #[error("version {version} does not appear as a release tag in {url}")]
    VersionNotInUrl {
        /// Declared version.
        version: String,
        /// Declared download URL.
        url: String,
    },

    /// `sha256` is not 64 lowercase hex characters.
    #[error("invalid sha256 '{value}': expected 64 lowercase hex characters, got {len}")]
    InvalidChecksum {
        /// The declared checksum.
        value: String,
        /// Its length in characters.
        len: usize,
    },

    /// `install` has no steps.
    #[error("no install steps declared")]
    NoInstallSteps,

    /// An install step's source is not a usable relative path.
    #[error("install step {index}: source '{path}' {reason}")]
    InvalidInstallSource {
        /// Zero-based position of the step.
        index: usize,
        /// The declared source path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// An install step's rename is not a plain file name.
    #[error("install step {index}: rename '{name}' must be a plain file name")]
    InvalidRename {
        /// Zero-based position of the step.
        index: usize,
        /// The declared rename.
        name: String,
    },

    /// A test command is blank.
    #[error("test command {0} is empty")]
    EmptyTestCommand(usize),
}

/// Check a manifest, stopping at the first failure.
///
/// Checks run in a fixed order: name, URLs, version, version-in-URL,
/// checksum, install steps, test commands.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate(manifest: &Manifest) -> Result<(), ValidationError> {
    match validate_all(manifest).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Run every check and collect all failures, in check order.
pub fn validate_all(manifest: &Manifest) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !manifest.name.is_valid() {
        errors.push(ValidationError::InvalidName(manifest.name.to_string()));
    }

    if manifest.homepage.is_empty() {
        errors.push(ValidationError::MissingField("homepage"));
    } else if !is_http_url(&manifest.homepage) {
        errors.push(ValidationError::InvalidUrl {
            field: "homepage",
            url: manifest.homepage.clone(),
        });
    }
    let url_ok = is_http_url(&manifest.url);
    if !url_ok {
        errors.push(ValidationError::InvalidUrl {
            field: "url",
            url: manifest.url.clone(),
        });
    }

    let version_ok = manifest.version.semver().is_some();
    if !version_ok {
        errors.push(ValidationError::InvalidVersion(manifest.version.to_string()));
    }

    if url_ok && version_ok && !url_embeds_version(&manifest.url, &manifest.version) {
        errors.push(ValidationError::VersionNotInUrl {
            version: manifest.version.to_string(),
            url: manifest.url.clone(),
        });
    }

    if !manifest.sha256.is_well_formed() {
        errors.push(ValidationError::InvalidChecksum {
            value: manifest.sha256.to_string(),
            len: manifest.sha256.as_str().chars().count(),
        });
    }

    if manifest.install.is_empty() {
        errors.push(ValidationError::NoInstallSteps);
    }
    for (index, step) in manifest.install.iter().enumerate() {
        if let Some(reason) = source_problem(&step.source) {
            errors.push(ValidationError::InvalidInstallSource {
                index,
                path: step.source.clone(),
                reason,
            });
        }
        if let Some(name) = &step.rename {
            if !is_plain_file_name(name) {
                errors.push(ValidationError::InvalidRename {
                    index,
                    name: name.clone(),
                });
            }
        }
    }

    for (index, cmd) in manifest.test.iter().enumerate() {
        if cmd.trim().is_empty() {
            errors.push(ValidationError::EmptyTestCommand(index));
        }
    }

    errors
}

/// Whether `url` is an absolute http(s) URL with a host.
pub fn is_http_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

/// Whether a path segment of `url` is the release tag for `version`
/// (`v0.4.0` or `0.4.0`).
///
/// Query strings and fragments are ignored. A matching segment implies the
/// version is also an exact substring of the URL.
pub fn url_embeds_version(url: &str, version: &str) -> bool {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);
    path.split('/')
        .skip(1)
        .any(|segment| segment.strip_prefix('v').unwrap_or(segment) == version)
}

fn source_problem(source: &str) -> Option<&'static str> {
    if source.trim().is_empty() {
        return Some("is empty");
    }
    let path = Path::new(source);
    if path.is_absolute() || source.starts_with('/') || source.starts_with('\\') {
        return Some("must be relative");
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Some("must not contain '..'");
    }
    if source.ends_with('/') {
        return Some("must name a file");
    }
    None
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
