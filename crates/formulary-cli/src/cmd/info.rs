//! Info command

use anyhow::Result;
use crossterm::style::Stylize;
use formulary_core::install::plan;
use formulary_core::receipt::Receipt;

use crate::context::Context;
use crate::package_name;

/// Show a package's newest manifest, its release history and install state.
pub fn info(ctx: &Context, name: &str) -> Result<()> {
    let name = package_name(name)?;
    let formulary = ctx.formulary()?;
    let manifest = formulary.get(&name)?;
    let installed = Receipt::load(&ctx.prefix, &name)?;
    ctx.output().wait();

    let lw = 12;

    println!();
    println!(
        "  {} {}",
        manifest.name.as_str().white().bold(),
        manifest.version.as_str().dark_grey()
    );
    if !manifest.desc.is_empty() {
        println!("  {}", manifest.desc);
    }
    println!();

    if !manifest.homepage.is_empty() {
        println!("  {:<lw$}{}", "homepage", manifest.homepage);
    }
    println!("  {:<lw$}{}", "url", manifest.url);
    println!("  {:<lw$}{}", "sha256", manifest.sha256);
    let platform = manifest
        .platform()
        .map_or_else(|| "any".to_string(), |p| p.to_string());
    println!("  {:<lw$}{} ({platform})", "format", manifest.format());

    for target in plan(manifest, &ctx.prefix).targets {
        println!("  {:<lw$}{}", "installs", target.display());
    }
    for command in &manifest.test {
        println!("  {:<lw$}{}", "test", command);
    }

    let history: Vec<&str> = formulary
        .revisions(&name)
        .iter()
        .map(|r| r.manifest.version.as_str())
        .collect();
    if history.len() > 1 {
        println!("  {:<lw$}{}", "releases", history.join(", "));
    }

    match installed {
        Some(receipt) => {
            let mut status = format!("{}, {}", receipt.version, receipt.installed_date());
            if receipt.version != manifest.version {
                status.push_str(&format!(" ({} available)", manifest.version));
            }
            println!("  {:<lw$}{}", "installed", status);
        }
        None => println!("  {:<lw$}{}", "installed", "no".dark_grey()),
    }

    Ok(())
}
