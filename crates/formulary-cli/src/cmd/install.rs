//! Install command

use anyhow::{Context as _, Result, anyhow};
use crossterm::style::Stylize;
use formulary_core::install::Plan;
use formulary_core::{InstallOutcome, Installer};
use formulary_schema::Platform;

use crate::context::Context;
use crate::parse_package_spec;

/// Install one package from the formula directory.
pub async fn install(ctx: &Context, spec: &str, force: bool, run_tests: bool) -> Result<()> {
    let (name, version) = parse_package_spec(spec);
    let formulary = ctx.formulary()?;
    let manifest = match version {
        Some(v) => formulary
            .find_version(name, v)
            .ok_or_else(|| anyhow!("No formula for {name} {v}"))?,
        None => formulary.get(name)?,
    };
    let output = ctx.output();

    if let (Some(target), Some(host)) = (manifest.platform(), Platform::current()) {
        if !target.runs_on(&host) {
            output.warning(&format!(
                "{} is built for {target}; this machine is {host}",
                manifest.artifact_name()
            ));
        }
    }

    let mut options = ctx.install_options();
    options.force = force;
    options.run_tests = run_tests;
    let installer = Installer::new(ctx.client()?, ctx.prefix.clone(), ctx.reporter())
        .with_options(options);

    output.section("Installing");
    let outcome = match installer.install(manifest).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let kind = e.kind();
            return Err(e).with_context(|| format!("Failed to install {name} ({kind})"));
        }
    };

    match outcome {
        InstallOutcome::Planned(plan) => {
            // The plan is printed directly; let queued events render first.
            output.wait();
            print_plan(&plan);
        }
        InstallOutcome::AlreadyInstalled(receipt) => {
            output.info(&format!(
                "{} {} is already installed (use --force to reinstall)",
                receipt.name, receipt.version
            ));
        }
        InstallOutcome::Installed(receipt) => {
            output.success(&format!(
                "{} {} installed to {}",
                receipt.name,
                receipt.version,
                ctx.prefix.root().display()
            ));
            let bin = ctx.prefix.bin();
            let on_path = std::env::var_os("PATH")
                .is_some_and(|path| std::env::split_paths(&path).any(|p| p == bin));
            if !on_path {
                output.info(&format!("Add {} to your PATH", bin.display()));
            }
        }
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    println!();
    println!(
        "  {} {} {}",
        "Would install".dark_grey(),
        plan.name.as_str().white().bold(),
        plan.version.as_str().dark_grey()
    );
    println!("  {:<10}{} ({})", "from", plan.url, plan.format);
    for target in &plan.targets {
        println!("  {:<10}{}", "place", target.display());
    }
}
