//! Subcommand implementations

pub mod available;
pub mod filename;
pub mod install;
pub mod platform;
