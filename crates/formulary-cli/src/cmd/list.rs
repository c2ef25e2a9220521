//! List command

use anyhow::Result;
use formulary_core::receipt::Receipt;

use crate::context::Context;
use crate::ui::list::{print_list_footer, print_list_header, print_list_row};

/// List installed packages, or with `available` every package in the
/// formula directory.
pub fn list(ctx: &Context, available: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();

    if available {
        let formulary = ctx.formulary()?;
        if formulary.is_empty() {
            println!();
            println!("  No formulae in {}.", ctx.formula_dir.display());
            return Ok(());
        }
        print_list_header(&mut out, "Available packages");
        for manifest in formulary.active() {
            print_list_row(&mut out, &manifest.name, manifest.version.as_str(), &manifest.desc);
        }
        print_list_footer(&mut out, formulary.len(), "package");
        return Ok(());
    }

    let receipts = Receipt::list(&ctx.prefix)?;
    if receipts.is_empty() {
        println!();
        println!("  No packages installed.");
        println!("  Run 'formulary install <package>' to get started.");
        return Ok(());
    }

    print_list_header(&mut out, "Installed packages");
    for receipt in &receipts {
        print_list_row(
            &mut out,
            &receipt.name,
            receipt.version.as_str(),
            &receipt.installed_date(),
        );
    }
    print_list_footer(&mut out, receipts.len(), "package");
    Ok(())
}
