pub mod config;
pub mod formulary;
pub mod install;
pub mod io;
pub mod paths;
pub mod receipt;
pub mod smoke;

pub mod reporter;

pub use formulary::Formulary;
pub use install::{ErrorKind, InstallError, InstallOptions, InstallOutcome, Installer};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("formulary/", env!("CARGO_PKG_VERSION"));
