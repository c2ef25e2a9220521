use dirs::home_dir;
use std::path::{Path, PathBuf};

use formulary_schema::{Destination, PackageName};

/// Returns the formulary home directory (`$FORMULARY_HOME` or `~/.formulary`),
/// or None if the user's home cannot be resolved.
pub fn try_formulary_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("FORMULARY_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".formulary"))
}

/// Settings file: ~/.formulary/config.toml
pub fn config_path() -> Option<PathBuf> {
    try_formulary_home().map(|h| h.join("config.toml"))
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').next_back().unwrap_or("")
}

/// Directory layout of an install prefix.
///
/// ```text
/// <root>/
/// ├── bin/        # installed executables
/// ├── lib/
/// ├── share/
/// ├── receipts/   # one JSON receipt per installed package
/// └── tmp/        # download and staging area (same volume as bin/)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    root: PathBuf,
}

impl Prefix {
    /// A prefix rooted at `root`. Nothing is created until [`Prefix::ensure`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default prefix, the formulary home directory.
    pub fn from_env() -> Option<Self> {
        try_formulary_home().map(Self::new)
    }

    /// Root of the prefix.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a destination category.
    pub fn dir(&self, destination: Destination) -> PathBuf {
        self.root.join(destination.dir_name())
    }

    /// Binary installation target: <root>/bin
    pub fn bin(&self) -> PathBuf {
        self.dir(Destination::Bin)
    }

    /// Receipts directory: <root>/receipts
    pub fn receipts(&self) -> PathBuf {
        self.root.join("receipts")
    }

    /// Receipt path for a package: <root>/receipts/<name>.json
    pub fn receipt_path(&self, name: &PackageName) -> PathBuf {
        self.receipts().join(format!("{name}.json"))
    }

    /// Temp path: <root>/tmp
    pub fn tmp(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Create every directory of the layout.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created.
    pub fn ensure(&self) -> std::io::Result<()> {
        for destination in Destination::ALL {
            std::fs::create_dir_all(self.dir(destination))?;
        }
        std::fs::create_dir_all(self.receipts())?;
        std::fs::create_dir_all(self.tmp())?;
        Ok(())
    }
}
