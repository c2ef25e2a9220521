//! Bump command

use anyhow::{Context as _, Result, bail};
use formulary_core::Formulary;
use formulary_core::io::download::DownloadRequest;
use formulary_schema::{Manifest, Sha256Hash, ValidationError, Version, validate, validate_all};
use std::path::Path;

use crate::context::Context;

/// Write the next revision of the manifest at `path` for a new release.
///
/// The artifact at `url` is downloaded and hashed; the new revision must be
/// strictly newer and must pass validation before anything is written.
pub async fn bump(
    ctx: &Context,
    path: &Path,
    version: &str,
    url: &str,
    output_path: Option<&Path>,
) -> Result<()> {
    let output = ctx.output();
    let current = Manifest::from_file(path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut next = current.bumped(Version::from(version), url.to_string(), Sha256Hash::new(""));

    let mut history = Formulary::new();
    history.supersede(current.clone(), Some(path.to_path_buf()))?;
    history.supersede(next.clone(), None)?;

    // Everything but the checksum can be checked before downloading.
    if let Some(problem) = validate_all(&next)
        .into_iter()
        .find(|e| !matches!(e, ValidationError::InvalidChecksum { .. }))
    {
        bail!("{} {version} would be invalid: {problem}", next.name);
    }

    let target = output_path.unwrap_or(path);
    if ctx.dry_run {
        output.info(&format!(
            "Would download {url} and write {} {version} to {}",
            next.name,
            target.display()
        ));
        return Ok(());
    }

    output.info(&format!(
        "Bumping {} {} -> {version}",
        current.name, current.version
    ));
    let staging = tempfile::tempdir().context("Failed to create temp dir")?;
    let dest = staging.path().join("artifact");
    let client = ctx.client()?;
    let reporter = ctx.reporter();
    let digest = DownloadRequest::new(&client, &next.name, &next.version, url, &dest, &reporter)
        .with_retries(ctx.settings.download_retries)
        .execute()
        .await
        .with_context(|| format!("Failed to download {url}"))?;

    next.sha256 = digest.into();
    validate(&next)?;
    next.save(target)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    output.success(&format!(
        "{} {version} written to {} (sha256 {})",
        next.name,
        target.display(),
        next.sha256
    ));
    Ok(())
}
