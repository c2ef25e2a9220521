//! Installing, testing and removing a package described by a manifest.
//!
//! An install walks a fixed sequence of stages:
//!
//! ```text
//! Fetching -> Verifying -> Extracting -> Installing -> Testing -> Success
//!     \___________\____________\____________\____________\____> Failed
//! ```
//!
//! Nothing is placed in the prefix before the artifact's digest matches the
//! manifest. Files are copied only after every install source has been found
//! in the extracted artifact. Files they replace are kept aside until the
//! receipt is written, so a failure midway restores the previous install. A
//! failing smoke test leaves the install in place.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::Reporter;
use crate::io::download::{DownloadError, DownloadRequest, verify_digest};
use crate::io::extract::{self, ExtractError};
use crate::paths::{Prefix, filename_from_url};
use crate::receipt::{Receipt, ReceiptError};
use crate::smoke::{self, SmokeTestError};
use formulary_schema::{
    ArtifactFormat, Destination, InstallStep, Manifest, PackageName, ValidationError, Version,
    validate,
};

/// Failure categories surfaced to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedManifest,
    IntegrityMismatch,
    NetworkFailure,
    TestFailure,
    Io,
    Extract,
    NotInstalled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MalformedManifest => "malformed manifest",
            Self::IntegrityMismatch => "integrity mismatch",
            Self::NetworkFailure => "network failure",
            Self::TestFailure => "test failure",
            Self::Io => "io error",
            Self::Extract => "extraction failure",
            Self::NotInstalled => "not installed",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Malformed manifest: {0}")]
    Malformed(#[from] ValidationError),

    #[error("Malformed manifest: install source '{path}' not found in artifact")]
    MissingSource { path: String },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("Download failed: {0}")]
    Network(DownloadError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Receipt(#[from] ReceiptError),

    #[error("Installed but verification failed: {0}")]
    TestFailure(#[from] SmokeTestError),

    #[error("{0} is not installed")]
    NotInstalled(PackageName),
}

impl InstallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) | Self::MissingSource { .. } => ErrorKind::MalformedManifest,
            Self::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            Self::Network(_) => ErrorKind::NetworkFailure,
            Self::Extract(_) => ErrorKind::Extract,
            Self::Io(_) | Self::Receipt(_) => ErrorKind::Io,
            Self::TestFailure(_) => ErrorKind::TestFailure,
            Self::NotInstalled(_) => ErrorKind::NotInstalled,
        }
    }
}

impl From<DownloadError> for InstallError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::HashMismatch { expected, actual } => {
                Self::IntegrityMismatch { expected, actual }
            }
            DownloadError::Io(e) => Self::Io(e),
            other => Self::Network(other),
        }
    }
}

impl From<tokio::task::JoinError> for InstallError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Io(std::io::Error::other(format!("Task panic: {err}")))
    }
}

/// Stage of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    Fetching,
    Verifying,
    Extracting,
    Installing,
    Testing,
    Success,
    Failed(String),
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching => f.write_str("fetching"),
            Self::Verifying => f.write_str("verifying"),
            Self::Extracting => f.write_str("extracting"),
            Self::Installing => f.write_str("installing"),
            Self::Testing => f.write_str("testing"),
            Self::Success => f.write_str("success"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Extra download attempts after a transient failure.
    pub retries: u32,
    /// Base delay between download attempts; grows linearly.
    pub backoff: Duration,
    /// Deadline for each smoke-test command.
    pub test_timeout: Duration,
    pub run_tests: bool,
    /// Validate and plan only.
    pub dry_run: bool,
    /// Reinstall even when the same version is already installed.
    pub force: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(500),
            test_timeout: Duration::from_secs(30),
            run_tests: true,
            dry_run: false,
            force: false,
        }
    }
}

/// What an install would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: PackageName,
    pub version: Version,
    pub url: String,
    pub format: ArtifactFormat,
    /// Files the install steps would create, in step order.
    pub targets: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(Receipt),
    AlreadyInstalled(Receipt),
    Planned(Plan),
}

pub struct Installer<R: Reporter> {
    client: Client,
    prefix: Prefix,
    options: InstallOptions,
    reporter: R,
}

impl<R: Reporter> Installer<R> {
    pub fn new(client: Client, prefix: Prefix, reporter: R) -> Self {
        Self {
            client,
            prefix,
            options: InstallOptions::default(),
            reporter,
        }
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// Validate, fetch, verify, extract, place and test `manifest`.
    ///
    /// # Errors
    ///
    /// Validation failures and missing sources are [`ErrorKind::MalformedManifest`];
    /// a digest that does not match the manifest is
    /// [`ErrorKind::IntegrityMismatch`] and leaves the prefix untouched. A
    /// failing smoke test returns [`InstallError::TestFailure`] with the
    /// package still installed.
    pub async fn install(&self, manifest: &Manifest) -> Result<InstallOutcome, InstallError> {
        let (name, version) = (&manifest.name, &manifest.version);
        if let Err(e) = validate(manifest) {
            self.reporter.failed(name, version, &e.to_string());
            return Err(e.into());
        }

        if self.options.dry_run {
            return Ok(InstallOutcome::Planned(plan(manifest, &self.prefix)));
        }

        let previous = Receipt::load(&self.prefix, name)?;
        if let Some(receipt) = previous.as_ref() {
            if receipt.version == *version && !self.options.force {
                self.reporter.done(name, version, "already installed");
                return Ok(InstallOutcome::AlreadyInstalled(receipt.clone()));
            }
        }

        let receipt = match self.place(manifest, previous.as_ref()).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.enter(manifest, &InstallState::Failed(e.to_string()));
                self.reporter.failed(name, version, &e.to_string());
                return Err(e);
            }
        };

        if self.options.run_tests {
            if let Err(e) = self.run_tests(manifest).await {
                self.enter(manifest, &InstallState::Failed(e.to_string()));
                self.reporter.failed(name, version, "installed but verification failed");
                return Err(e.into());
            }
        }

        self.enter(manifest, &InstallState::Success);
        let detail = match previous {
            Some(old) if old.version != *version => format!("upgraded from {}", old.version),
            _ => "installed".to_string(),
        };
        self.reporter.done(name, version, &detail);
        Ok(InstallOutcome::Installed(receipt))
    }

    /// Re-run the smoke tests of an installed package, returning each
    /// command's stdout.
    ///
    /// # Errors
    ///
    /// [`InstallError::NotInstalled`] without a receipt, otherwise the first
    /// failing command.
    pub async fn test(&self, manifest: &Manifest) -> Result<Vec<String>, InstallError> {
        let name = &manifest.name;
        let receipt = Receipt::load(&self.prefix, name)?
            .ok_or_else(|| InstallError::NotInstalled(name.clone()))?;
        if receipt.version != manifest.version {
            warn!(%name, installed = %receipt.version, manifest = %manifest.version, "testing with a different manifest version");
            self.reporter.warning(&format!(
                "{name} {} is installed; running tests from {}",
                receipt.version, manifest.version
            ));
        }

        match self.run_tests(manifest).await {
            Ok(outputs) => {
                self.reporter.done(name, &receipt.version, "tests passed");
                Ok(outputs)
            }
            Err(e) => {
                self.reporter.failed(name, &receipt.version, &e.to_string());
                Err(e.into())
            }
        }
    }

    /// Remove every file an install placed, then its receipt.
    ///
    /// # Errors
    ///
    /// [`InstallError::NotInstalled`] without a receipt; I/O errors from
    /// removing files. Files already gone are skipped.
    pub fn uninstall(&self, name: &PackageName) -> Result<Receipt, InstallError> {
        let receipt = Receipt::load(&self.prefix, name)?
            .ok_or_else(|| InstallError::NotInstalled(name.clone()))?;

        self.reporter.removing(name, &receipt.version);
        if self.options.dry_run {
            return Ok(receipt);
        }

        for file in &receipt.files {
            remove_if_present(file)?;
        }
        Receipt::delete(&self.prefix, name)?;

        info!(%name, version = %receipt.version, files = receipt.files.len(), "uninstalled");
        self.reporter.done(name, &receipt.version, "uninstalled");
        Ok(receipt)
    }

    fn enter(&self, manifest: &Manifest, state: &InstallState) {
        debug!(name = %manifest.name, version = %manifest.version, %state, "install stage");
        match state {
            InstallState::Verifying => self.reporter.verifying(&manifest.name, &manifest.version),
            InstallState::Extracting => self.reporter.extracting(&manifest.name, &manifest.version),
            InstallState::Installing => self.reporter.installing(&manifest.name, &manifest.version),
            _ => {}
        }
    }

    /// Fetching through Installing. Returns the saved receipt.
    async fn place(
        &self,
        manifest: &Manifest,
        previous: Option<&Receipt>,
    ) -> Result<Receipt, InstallError> {
        self.prefix.ensure()?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}-", manifest.name))
            .tempdir_in(self.prefix.tmp())?;
        let file_name = filename_from_url(&manifest.url).to_string();
        let artifact = staging.path().join("download");
        let unpacked = staging.path().join("unpacked");

        self.enter(manifest, &InstallState::Fetching);
        let digest = DownloadRequest::new(
            &self.client,
            &manifest.name,
            &manifest.version,
            &manifest.url,
            &artifact,
            &self.reporter,
        )
        .with_retries(self.options.retries)
        .with_backoff(self.options.backoff)
        .execute()
        .await?;

        self.enter(manifest, &InstallState::Verifying);
        verify_digest(&manifest.sha256, &digest)?;

        self.enter(manifest, &InstallState::Extracting);
        let format = manifest.format();
        let root = {
            let unpacked = unpacked.clone();
            tokio::task::spawn_blocking(move || -> Result<PathBuf, InstallError> {
                extract::extract(&artifact, format, &unpacked, &file_name)?;
                Ok(extract::source_root(&unpacked)?)
            })
            .await??
        };

        self.enter(manifest, &InstallState::Installing);
        let steps = manifest.install.clone();
        let prefix = self.prefix.clone();
        let aside = staging.path().join("replaced");
        let stale: Vec<PathBuf> = previous.map(|old| old.files.clone()).unwrap_or_default();
        let placement = tokio::task::spawn_blocking(move || -> Result<Placement, InstallError> {
            let mut placement = place_files(&steps, &root, &prefix, &aside)?;
            // Files the previous version placed that this one did not.
            let stale: Vec<PathBuf> = stale
                .into_iter()
                .filter(|f| !placement.files.contains(f))
                .collect();
            for file in &stale {
                if let Err(e) = placement.set_aside(file) {
                    placement.rollback();
                    return Err(InstallError::from(e));
                }
            }
            Ok(placement)
        })
        .await??;

        let receipt = Receipt {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            sha256: digest,
            url: manifest.url.clone(),
            installed_at: chrono::Utc::now().timestamp(),
            files: placement.files.clone(),
        };
        if let Err(e) = receipt.save(&self.prefix) {
            placement.rollback();
            return Err(e.into());
        }
        info!(name = %receipt.name, version = %receipt.version, files = receipt.files.len(), "installed");
        Ok(receipt)
    }

    async fn run_tests(&self, manifest: &Manifest) -> Result<Vec<String>, SmokeTestError> {
        self.enter(manifest, &InstallState::Testing);
        let mut outputs = Vec::with_capacity(manifest.test.len());
        for command in &manifest.test {
            self.reporter
                .testing(&manifest.name, &manifest.version, command);
            let expanded = smoke::expand(command, &self.prefix);
            let timeout = self.options.test_timeout;
            let output = tokio::task::spawn_blocking(move || smoke::run(&expanded, timeout))
                .await
                .map_err(|e| SmokeTestError::Spawn {
                    command: command.clone(),
                    source: std::io::Error::other(e.to_string()),
                })??;
            outputs.push(output);
        }
        Ok(outputs)
    }
}

/// Describe what installing `manifest` into `prefix` would create.
pub fn plan(manifest: &Manifest, prefix: &Prefix) -> Plan {
    Plan {
        name: manifest.name.clone(),
        version: manifest.version.clone(),
        url: manifest.url.clone(),
        format: manifest.format(),
        targets: manifest
            .install
            .iter()
            .map(|step| target_path(step, prefix))
            .collect(),
    }
}

fn target_path(step: &InstallStep, prefix: &Prefix) -> PathBuf {
    prefix.dir(step.destination).join(step.target_name())
}

/// Files copied into the prefix by one install.
///
/// Files that were in the way (an older version's binary, stale files of the
/// previous install) are moved into `aside` rather than deleted, so a failed
/// install can put the prefix back as it was. They are dropped together with
/// the staging directory once the install is committed.
#[derive(Debug)]
struct Placement {
    files: Vec<PathBuf>,
    aside: PathBuf,
    /// `(original path, saved copy)` in the order they were moved.
    replaced: Vec<(PathBuf, PathBuf)>,
}

impl Placement {
    fn new(aside: &Path) -> Self {
        Self {
            files: Vec::new(),
            aside: aside.to_path_buf(),
            replaced: Vec::new(),
        }
    }

    /// Move an existing file out of the prefix. Missing files and
    /// directories are left alone.
    fn set_aside(&mut self, path: &Path) -> std::io::Result<()> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if !meta.is_dir() => {}
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        }
        std::fs::create_dir_all(&self.aside)?;
        let saved = self.aside.join(self.replaced.len().to_string());
        std::fs::rename(path, &saved)?;
        self.replaced.push((path.to_path_buf(), saved));
        Ok(())
    }

    /// Remove the new files and restore everything that was set aside.
    fn rollback(self) {
        for file in &self.files {
            if let Err(e) = remove_if_present(file) {
                warn!(file = %file.display(), error = %e, "rollback could not remove file");
            }
        }
        for (original, saved) in self.replaced.iter().rev() {
            if let Err(e) = std::fs::rename(saved, original) {
                warn!(file = %original.display(), error = %e, "rollback could not restore file");
            }
        }
    }
}

/// Copy every step's source into the prefix.
///
/// All sources are checked before anything is copied. If a copy fails, the
/// files placed so far are removed and the files they replaced restored.
fn place_files(
    steps: &[InstallStep],
    root: &Path,
    prefix: &Prefix,
    aside: &Path,
) -> Result<Placement, InstallError> {
    let mut sources = Vec::with_capacity(steps.len());
    for step in steps {
        let source = root.join(&step.source);
        if !source.is_file() {
            return Err(InstallError::MissingSource {
                path: step.source.clone(),
            });
        }
        sources.push(source);
    }

    let mut placement = Placement::new(aside);
    for (step, source) in steps.iter().zip(&sources) {
        let target = target_path(step, prefix);
        let result = placement
            .set_aside(&target)
            .and_then(|()| copy_into_place(source, &target, step.destination));
        if let Err(e) = result {
            placement.rollback();
            return Err(e.into());
        }
        debug!(source = %source.display(), target = %target.display(), "placed");
        placement.files.push(target);
    }
    Ok(placement)
}

/// Copy through a sibling temp file so a running binary is replaced, not
/// overwritten.
fn copy_into_place(source: &Path, target: &Path, destination: Destination) -> std::io::Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| std::io::Error::other("target has no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    let file_name = target.file_name().unwrap_or_default().to_string_lossy();
    let temp = dir.join(format!(".{file_name}.tmp"));
    std::fs::copy(source, &temp)?;

    #[cfg(unix)]
    if destination == Destination::Bin {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = destination;

    if let Err(e) = std::fs::rename(&temp, target) {
        std::fs::remove_file(&temp).ok();
        return Err(e);
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use formulary_schema::Sha256Hash;
    use mockito::Server;
    use sha2::{Digest, Sha256};

    const ARTIFACT_PATH: &str = "/v0.4.0/ecsfgrun_Darwin_x86_64.tar.gz";

    fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let enc = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(enc);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn ecsfgrun_tarball() -> Vec<u8> {
        tarball(&[
            ("ecsfgrun", &b"#!/bin/sh\necho ecsfgrun version 0.4.0\n"[..]),
            ("LICENSE", &b"MIT"[..]),
        ])
    }

    fn manifest(base: &str, body: &[u8]) -> Manifest {
        Manifest {
            name: PackageName::from("ecsfgrun"),
            desc: "AWS assume role credential wrapper".to_string(),
            homepage: "https://github.com/masahide/ecsfgrun".to_string(),
            url: format!("{base}{ARTIFACT_PATH}"),
            version: Version::from("0.4.0"),
            sha256: Sha256Hash::new(hex::encode(Sha256::digest(body))),
            test: vec!["{bin}/ecsfgrun -v".to_string()],
            install: vec![InstallStep::bin("ecsfgrun")],
        }
    }

    fn installer(prefix: &Path) -> Installer<NullReporter> {
        Installer::new(Client::new(), Prefix::new(prefix), NullReporter).with_options(
            InstallOptions {
                retries: 0,
                backoff: Duration::from_millis(1),
                test_timeout: Duration::from_secs(10),
                ..InstallOptions::default()
            },
        )
    }

    async fn serve(server: &mut Server, body: Vec<u8>) -> mockito::Mock {
        server
            .mock("GET", ARTIFACT_PATH)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_places_binary_and_receipt() {
        let mut server = Server::new_async().await;
        let body = ecsfgrun_tarball();
        let _m = serve(&mut server, body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let installer = installer(tmp.path());
        let m = manifest(&server.url(), &body);

        let receipt = match installer.install(&m).await.unwrap() {
            InstallOutcome::Installed(r) => r,
            other => panic!("unexpected outcome: {other:?}"),
        };

        let bin = tmp.path().join("bin/ecsfgrun");
        assert_eq!(receipt.files, vec![bin.clone()]);
        assert_eq!(receipt.sha256.as_str(), m.sha256.as_str());
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&bin).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        assert!(!tmp.path().join("bin/LICENSE").exists());

        let outputs = installer.test(&m).await.unwrap();
        assert_eq!(outputs[0].trim(), "ecsfgrun version 0.4.0");

        // Same version again is a no-op.
        let again = installer.install(&m).await.unwrap();
        assert!(matches!(again, InstallOutcome::AlreadyInstalled(_)));

        // staging is cleaned up
        assert_eq!(std::fs::read_dir(tmp.path().join("tmp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_installs_nothing() {
        let mut server = Server::new_async().await;
        let body = ecsfgrun_tarball();
        let _m = serve(&mut server, body).await;

        let tmp = tempfile::tempdir().unwrap();
        let installer = installer(tmp.path());
        let mut m = manifest(&server.url(), b"something else");
        m.sha256 = Sha256Hash::new("0".repeat(64));

        let err = installer.install(&m).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityMismatch);

        let bin = tmp.path().join("bin");
        assert_eq!(std::fs::read_dir(&bin).unwrap().count(), 0);
        assert!(Receipt::load(installer.prefix(), &m.name).unwrap().is_none());
        assert_eq!(std::fs::read_dir(tmp.path().join("tmp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_rejected_before_download() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let mut m = manifest(&server.url(), b"");
        m.url = format!("{}/v0.3.0/ecsfgrun_Darwin_x86_64.tar.gz", server.url());

        let err = installer(tmp.path()).install(&m).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedManifest);
        assert!(!tmp.path().join("bin").exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_source() {
        let mut server = Server::new_async().await;
        let body = tarball(&[("README.md", &b"no binary here"[..])]);
        let _m = serve(&mut server, body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let m = manifest(&server.url(), &body);
        let err = installer(tmp.path()).install(&m).await.unwrap_err();

        assert!(matches!(err, InstallError::MissingSource { ref path } if path == "ecsfgrun"));
        assert_eq!(err.kind(), ErrorKind::MalformedManifest);
        assert_eq!(std::fs::read_dir(tmp.path().join("bin")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_network_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", ARTIFACT_PATH)
            .with_status(404)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let m = manifest(&server.url(), b"");
        let err = installer(tmp.path()).install(&m).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_smoke_test_keeps_install() {
        let mut server = Server::new_async().await;
        let body = tarball(&[("ecsfgrun", &b"#!/bin/sh\nexit 1\n"[..])]);
        let _m = serve(&mut server, body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let installer = installer(tmp.path());
        let m = manifest(&server.url(), &body);

        let err = installer.install(&m).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TestFailure);
        assert!(tmp.path().join("bin/ecsfgrun").exists());
        assert!(Receipt::load(installer.prefix(), &m.name).unwrap().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_uninstall_removes_files() {
        let mut server = Server::new_async().await;
        let body = ecsfgrun_tarball();
        let _m = serve(&mut server, body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let installer = installer(tmp.path());
        let m = manifest(&server.url(), &body);
        installer.install(&m).await.unwrap();

        let receipt = installer.uninstall(&m.name).unwrap();
        assert_eq!(receipt.version, "0.4.0");
        assert!(!tmp.path().join("bin/ecsfgrun").exists());

        let err = installer.uninstall(&m.name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);
        let err = installer.test(&m).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);
    }

    fn release_tarball(version: &str, extra: &[&str]) -> Vec<u8> {
        let script = format!("#!/bin/sh\necho ecsfgrun version {version}\n");
        let mut files: Vec<(&str, &[u8])> = vec![("ecsfgrun", script.as_bytes())];
        for name in extra {
            files.push((*name, &b"#!/bin/sh\n"[..]));
        }
        tarball(&files)
    }

    /// A release whose artifact lives under `/v<version>/` on `base`.
    fn release(base: &str, version: &str, body: &[u8], steps: &[&str]) -> Manifest {
        let mut m = manifest(base, body);
        m.version = Version::from(version);
        m.url = format!("{base}/v{version}/ecsfgrun_Darwin_x86_64.tar.gz");
        m.install = steps.iter().map(|s| InstallStep::bin(*s)).collect();
        m
    }

    async fn serve_release(server: &mut Server, version: &str, body: Vec<u8>) -> mockito::Mock {
        server
            .mock("GET", format!("/v{version}/ecsfgrun_Darwin_x86_64.tar.gz").as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await
    }

    /// Records `done`/`failed` calls.
    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<String>>);

    impl Recorder {
        fn push(&self, line: String) {
            self.0.lock().unwrap().push(line);
        }
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Reporter for Recorder {
        fn downloading(&self, _: &PackageName, _: &Version, _: u64, _: Option<u64>) {}
        fn verifying(&self, _: &PackageName, _: &Version) {}
        fn extracting(&self, _: &PackageName, _: &Version) {}
        fn installing(&self, _: &PackageName, _: &Version) {}
        fn testing(&self, _: &PackageName, _: &Version, _: &str) {}
        fn removing(&self, _: &PackageName, _: &Version) {}
        fn done(&self, name: &PackageName, version: &Version, detail: &str) {
            self.push(format!("done {name} {version}: {detail}"));
        }
        fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
            self.push(format!("failed {name} {version}: {reason}"));
        }
        fn warning(&self, _: &str) {}
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upgrade_replaces_files_and_receipt() {
        let mut server = Server::new_async().await;
        let old_body = release_tarball("0.3.0", &["ecsfgrun-helper"]);
        let new_body = release_tarball("0.4.0", &[]);
        let _old = serve_release(&mut server, "0.3.0", old_body.clone()).await;
        let _new = serve_release(&mut server, "0.4.0", new_body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let recorder = std::sync::Arc::new(Recorder::default());
        let installer = Installer::new(Client::new(), Prefix::new(tmp.path()), recorder.clone())
            .with_options(InstallOptions {
                retries: 0,
                ..InstallOptions::default()
            });

        let old = release(&server.url(), "0.3.0", &old_body, &["ecsfgrun", "ecsfgrun-helper"]);
        installer.install(&old).await.unwrap();
        let helper = tmp.path().join("bin/ecsfgrun-helper");
        assert!(helper.exists());

        let new = release(&server.url(), "0.4.0", &new_body, &["ecsfgrun"]);
        let receipt = match installer.install(&new).await.unwrap() {
            InstallOutcome::Installed(r) => r,
            other => panic!("unexpected outcome: {other:?}"),
        };

        assert_eq!(receipt.version, "0.4.0");
        assert_eq!(receipt.files, vec![tmp.path().join("bin/ecsfgrun")]);
        assert_eq!(
            Receipt::load(installer.prefix(), &new.name).unwrap(),
            Some(receipt)
        );
        assert!(!helper.exists());
        let script = std::fs::read_to_string(tmp.path().join("bin/ecsfgrun")).unwrap();
        assert!(script.contains("0.4.0"));
        assert_eq!(
            recorder.lines().last().map(String::as_str),
            Some("done ecsfgrun 0.4.0: upgraded from 0.3.0")
        );
        assert_eq!(std::fs::read_dir(tmp.path().join("tmp")).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_upgrade_keeps_previous_install() {
        let mut server = Server::new_async().await;
        let old_body = release_tarball("0.3.0", &["ecsfgrun-helper"]);
        let new_body = release_tarball("0.4.0", &["ecsfgrun-extra"]);
        let _old = serve_release(&mut server, "0.3.0", old_body.clone()).await;
        let _new = serve_release(&mut server, "0.4.0", new_body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let installer = installer(tmp.path());
        let old = release(&server.url(), "0.3.0", &old_body, &["ecsfgrun", "ecsfgrun-helper"]);
        installer.install(&old).await.unwrap();
        let before = std::fs::read(tmp.path().join("bin/ecsfgrun")).unwrap();

        // The second target is blocked, so the upgrade fails after the
        // first file has already been replaced.
        std::fs::create_dir_all(tmp.path().join("bin/ecsfgrun-extra/occupied")).unwrap();
        let new = release(&server.url(), "0.4.0", &new_body, &["ecsfgrun", "ecsfgrun-extra"]);
        let err = installer.install(&new).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let receipt = Receipt::load(installer.prefix(), &new.name).unwrap().unwrap();
        assert_eq!(receipt.version, "0.3.0");
        assert_eq!(std::fs::read(tmp.path().join("bin/ecsfgrun")).unwrap(), before);
        assert!(tmp.path().join("bin/ecsfgrun-helper").exists());
        let outputs = installer.test(&old).await.unwrap();
        assert_eq!(outputs[0].trim(), "ecsfgrun version 0.3.0");
    }

    #[test]
    fn test_uninstall_rejects_path_like_names() {
        let tmp = tempfile::tempdir().unwrap();
        let installer = installer(&tmp.path().join("prefix"));
        let err = installer
            .uninstall(&PackageName::from("../../x"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);
    }

    #[test]
    fn test_dry_run_plan() {
        let m = manifest("https://github.com/masahide/ecsfgrun/releases/download", b"");
        let p = plan(&m, &Prefix::new("/opt/f"));
        assert_eq!(p.format, ArtifactFormat::TarGz);
        assert_eq!(p.targets, vec![PathBuf::from("/opt/f/bin/ecsfgrun")]);
    }

    #[test]
    fn test_place_files_rolls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a"), b"new a").unwrap();
        std::fs::write(root.join("b"), b"new b").unwrap();

        let prefix = Prefix::new(tmp.path().join("prefix"));
        prefix.ensure().unwrap();
        std::fs::write(prefix.bin().join("a"), b"old a").unwrap();
        // A directory where the second file should go makes its rename fail.
        std::fs::create_dir_all(prefix.bin().join("b/occupied")).unwrap();

        let steps = [InstallStep::bin("a"), InstallStep::bin("b")];
        let aside = tmp.path().join("aside");
        assert!(place_files(&steps, &root, &prefix, &aside).is_err());
        assert_eq!(std::fs::read(prefix.bin().join("a")).unwrap(), b"old a");
        assert!(prefix.bin().join("b/occupied").is_dir());
    }

    #[test]
    fn test_placement_rollback_restores_set_aside_files() {
        let tmp = tempfile::tempdir().unwrap();
        let stale = tmp.path().join("stale");
        std::fs::write(&stale, b"old").unwrap();

        let mut placement = Placement::new(&tmp.path().join("aside"));
        placement.set_aside(&stale).unwrap();
        assert!(!stale.exists());
        // missing files are ignored
        placement.set_aside(&tmp.path().join("missing")).unwrap();
        assert_eq!(placement.replaced.len(), 1);

        placement.rollback();
        assert_eq!(std::fs::read(&stale).unwrap(), b"old");
    }

    #[test]
    fn test_error_kinds() {
        let err: InstallError = DownloadError::HashMismatch {
            expected: "a".into(),
            actual: "b".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::IntegrityMismatch);
        let err: InstallError = ValidationError::NoInstallSteps.into();
        assert_eq!(err.kind(), ErrorKind::MalformedManifest);
        assert_eq!(err.kind().to_string(), "malformed manifest");
    }
}
