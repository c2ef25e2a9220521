//! Uninstall command

use anyhow::{Context as _, Result};

use crate::context::Context;
use crate::package_name;

/// Remove an installed package and its receipt.
pub fn uninstall(ctx: &Context, name: &str) -> Result<()> {
    let name = package_name(name)?;
    let output = ctx.output();
    output.section("Removing");

    let receipt = ctx
        .installer()?
        .uninstall(&name)
        .with_context(|| format!("Failed to uninstall {name}"))?;

    if ctx.dry_run {
        for file in &receipt.files {
            output.info(&format!("Would remove {}", file.display()));
        }
    } else {
        output.success(&format!(
            "Removed {} {} ({} file{})",
            receipt.name,
            receipt.version,
            receipt.files.len(),
            if receipt.files.len() == 1 { "" } else { "s" }
        ));
    }
    Ok(())
}
