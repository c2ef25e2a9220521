//! Shared command context.
//!
//! Groups the resolved settings, directories and global flags every command
//! needs, so command functions take one argument instead of six.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::Cli;
use crate::ui::Output;
use formulary_core::config::Settings;
use formulary_core::paths::{Prefix, try_formulary_home};
use formulary_core::{Formulary, InstallOptions, Installer, NullReporter, Reporter};

/// Name of the formula directory looked up in the working directory and in
/// the formulary home.
const FORMULA_DIR_NAME: &str = "Formula";

#[derive(Clone)]
pub struct Context {
    pub settings: Settings,
    pub formula_dir: PathBuf,
    pub prefix: Prefix,
    pub dry_run: bool,
    pub quiet: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("formula_dir", &self.formula_dir)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Resolve settings and directories for a parsed command line.
    ///
    /// The formula directory comes from `--formula-dir` (or its environment
    /// variable), then `formula_dir` in the settings file, then `./Formula`
    /// when present, then `Formula` in the formulary home.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let home = try_formulary_home()
            .context("Could not determine home directory; set FORMULARY_HOME")?;
        let settings = Settings::load_default()?;

        let formula_dir = cli
            .formula_dir
            .clone()
            .or_else(|| settings.formula_dir.clone())
            .unwrap_or_else(|| {
                let local = PathBuf::from(FORMULA_DIR_NAME);
                if local.is_dir() {
                    local
                } else {
                    home.join(FORMULA_DIR_NAME)
                }
            });
        let prefix = Prefix::new(settings.prefix.clone().unwrap_or(home));
        debug!(formula_dir = %formula_dir.display(), prefix = %prefix.root().display(), "resolved context");

        Ok(Self {
            settings,
            formula_dir,
            prefix,
            dry_run: cli.dry_run,
            quiet: cli.quiet,
        })
    }

    /// Handle for direct messages; informational lines are dropped in quiet
    /// mode.
    pub fn output(&self) -> Output {
        if self.quiet {
            Output::quiet()
        } else {
            Output::new()
        }
    }

    /// Progress sink for core operations.
    pub fn reporter(&self) -> Arc<dyn Reporter> {
        if self.quiet {
            Arc::new(NullReporter)
        } else {
            Arc::new(Output::new())
        }
    }

    pub fn formulary(&self) -> Result<Formulary> {
        if !self.formula_dir.is_dir() {
            anyhow::bail!(
                "Formula directory not found: {} (use --formula-dir)",
                self.formula_dir.display()
            );
        }
        Formulary::load(&self.formula_dir).with_context(|| {
            format!(
                "Failed to load formulae from {}",
                self.formula_dir.display()
            )
        })
    }

    pub fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(formulary_core::USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            retries: self.settings.download_retries,
            test_timeout: self.settings.test_timeout(),
            dry_run: self.dry_run,
            ..InstallOptions::default()
        }
    }

    pub fn installer(&self) -> Result<Installer<Arc<dyn Reporter>>> {
        Ok(
            Installer::new(self.client()?, self.prefix.clone(), self.reporter())
                .with_options(self.install_options()),
        )
    }
}
