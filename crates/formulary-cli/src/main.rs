//! formulary CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use formulary_cli::ui::Output;
use formulary_cli::{Cli, Commands, Context, cmd};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;

    let output = Output::new();
    output.wait();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Commands::Install {
            package,
            force,
            no_test,
        } => cmd::install::install(&ctx, &package, force, !no_test).await,
        Commands::Test { package } => cmd::test::test(&ctx, &package).await,
        Commands::Uninstall { package } => cmd::uninstall::uninstall(&ctx, &package),
        Commands::Check { paths } => cmd::check::check(&ctx, &paths),
        Commands::Info { package } => cmd::info::info(&ctx, &package),
        Commands::List { available } => cmd::list::list(&ctx, available),
        Commands::Bump {
            path,
            version,
            url,
            output,
        } => cmd::bump::bump(&ctx, &path, &version, &url, output.as_deref()).await,
        Commands::Hash { files } => cmd::hash::hash(&files),
    }
}
