//! Shared types and archive naming for pginstall.
//!
//! Everything in this crate is pure: no filesystem or network access. The
//! core crate builds the installer on top of these types.

pub mod archive;
pub mod catalog;
pub mod platform;

// Re-exports
pub use archive::*;
pub use catalog::*;
pub use platform::*;
