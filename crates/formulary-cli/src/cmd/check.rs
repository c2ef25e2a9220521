//! Check command

use anyhow::{Context as _, Result, bail};
use formulary_schema::{Manifest, validate_all};
use std::path::{Path, PathBuf};

use crate::context::Context;

/// Validate manifest files, reporting every problem in each.
///
/// With no paths, every revision in the formula directory is checked; loading
/// the directory also rejects duplicate releases.
pub fn check(ctx: &Context, paths: &[PathBuf]) -> Result<()> {
    let output = ctx.output();

    let manifests: Vec<(PathBuf, Manifest)> = if paths.is_empty() {
        let formulary = ctx.formulary()?;
        let names: Vec<&str> = formulary.names().map(|n| n.as_str()).collect();
        if !names.is_empty() {
            output.info(&format!(
                "Checking {} revision(s) of {}",
                formulary.all().count(),
                names.join(", ")
            ));
        }
        formulary
            .all()
            .map(|rev| (rev.path.clone().unwrap_or_default(), rev.manifest.clone()))
            .collect()
    } else {
        paths
            .iter()
            .map(|path| load(path).map(|m| (path.clone(), m)))
            .collect::<Result<_>>()?
    };

    if manifests.is_empty() {
        output.warning("No manifests found");
        return Ok(());
    }

    let mut invalid = 0;
    for (path, manifest) in &manifests {
        let problems = validate_all(manifest);
        if problems.is_empty() {
            output.success(&format!(
                "{}: {} {} is valid",
                path.display(),
                manifest.name,
                manifest.version
            ));
        } else {
            invalid += 1;
            output.error(&format!("{}: {} problem(s)", path.display(), problems.len()));
            for problem in problems {
                output.error(&format!("  {problem}"));
            }
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} manifest(s) invalid", manifests.len());
    }
    Ok(())
}

fn load(path: &Path) -> Result<Manifest> {
    Manifest::from_file(path).with_context(|| format!("Failed to parse {}", path.display()))
}
