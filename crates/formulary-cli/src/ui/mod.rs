//! UI Module - terminal output
//!
//! ```text
//! Commands ──> Output ──> Actor ──> stdout
//!                 (events)   (single thread)
//! ```
//!
//! - [`theme`] - Colors, icons, and design constants
//! - [`actor`] - Message-passing event loop
//! - [`output`] - Public API for commands to use
//! - [`list`] - Package listings

pub mod actor;
pub mod list;
pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
