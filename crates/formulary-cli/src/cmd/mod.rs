//! Command modules - one file per CLI command

pub mod bump;
pub mod check;
pub mod hash;
pub mod info;
pub mod install;
pub mod list;
pub mod uninstall;
