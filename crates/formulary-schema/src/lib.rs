//! Shared manifest types and validation for formulary.
//!
//! A [`Manifest`] is the declarative description of one release of one
//! package. [`validate`] checks it for internal consistency without touching
//! the network or the filesystem.

pub mod arch;
pub mod hash;
pub mod manifest;
pub mod types;
pub mod validate;

// Re-exports
pub use arch::*;
pub use hash::*;
pub use manifest::{Destination, InstallStep, Manifest, ManifestError};
pub use types::*;
pub use validate::{ValidationError, validate, validate_all};
