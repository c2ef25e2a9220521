//! formulary - install command-line tools from checksummed manifests
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! # Overview
//!
//! A formula directory holds one TOML manifest per package release. Each
//! manifest pins a download URL, the version embedded in it and the SHA-256
//! of the artifact. `formulary install` downloads the artifact, refuses it
//! unless the digest matches, copies the declared files into the prefix and
//! runs the manifest's smoke tests.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.formulary/
//! ├── bin/          # installed executables
//! ├── lib/
//! ├── share/
//! ├── receipts/     # one JSON receipt per installed package
//! ├── tmp/          # download and staging area
//! └── config.toml   # optional settings
//! ```

pub mod cmd;
pub mod context;
pub mod ui;

pub use context::Context;
pub use formulary_core::paths::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "formulary")]
#[command(author, version, about = "formulary - install CLI tools from checksummed manifests")]
pub struct Cli {
    /// Directory containing formula manifests
    #[arg(long, global = true, env = "FORMULARY_FORMULA_DIR")]
    pub formula_dir: Option<PathBuf>,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a package
    Install {
        /// Package name, optionally with version: pkg or pkg@0.4.0
        package: String,
        /// Reinstall even if this version is already installed
        #[arg(long, short = 'f')]
        force: bool,
        /// Skip the manifest's smoke tests
        #[arg(long)]
        no_test: bool,
    },
    /// Run the smoke tests of an installed package
    Test {
        /// Package name
        package: String,
    },
    /// Remove an installed package
    #[command(alias = "remove")]
    Uninstall {
        /// Package name
        package: String,
    },
    /// Validate manifest files
    Check {
        /// Manifest files to check (default: every manifest in the formula directory)
        paths: Vec<PathBuf>,
    },
    /// Show package info
    Info {
        /// Package name
        package: String,
    },
    /// List installed packages
    List {
        /// List every package in the formula directory instead
        #[arg(long, short = 'a')]
        available: bool,
    },
    /// Write the next revision of a manifest for a new release
    Bump {
        /// Manifest file to bump
        path: PathBuf,
        /// New version
        #[arg(long)]
        version: String,
        /// Download URL of the new release artifact
        #[arg(long)]
        url: String,
        /// Write the new revision here instead of replacing the file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Compute SHA256 hash of a file (for manifest authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Split `pkg@version` into its parts.
///
/// # Example
///
/// ```
/// use formulary_cli::parse_package_spec;
///
/// assert_eq!(parse_package_spec("ecsfgrun@0.4.0"), ("ecsfgrun", Some("0.4.0")));
/// assert_eq!(parse_package_spec("ecsfgrun"), ("ecsfgrun", None));
/// ```
pub fn parse_package_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('@') {
        Some((name, version)) if !version.is_empty() => (name, Some(version)),
        Some((name, _)) => (name, None),
        None => (spec, None),
    }
}

/// Parse a package name typed on the command line.
///
/// ```
/// use formulary_cli::package_name;
///
/// assert!(package_name("ecsfgrun").is_ok());
/// assert!(package_name("../../etc/x").is_err());
/// ```
pub fn package_name(input: &str) -> anyhow::Result<formulary_schema::PackageName> {
    let name = formulary_schema::PackageName::new(input);
    if !name.is_valid() {
        anyhow::bail!("Invalid package name '{input}'");
    }
    Ok(name)
}
