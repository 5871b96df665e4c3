//! Core library for pginstall.
//!
//! Resolves the binary archive of a database extension for the running
//! platform, unpacks it into the control and extension trees, and lists the
//! extensions available from the local archive cache and a repository.

pub mod catalog;
pub mod config;
pub mod control;
pub mod error;
pub mod fetch;
pub mod installer;
pub mod io;
pub mod paths;
pub mod platform;
pub mod query;
pub mod remap;
pub mod reporter;

pub use catalog::{CatalogError, CatalogSource, available_extensions, merge};
pub use config::{ConfigError, InstallerConfig};
pub use error::{FatalKind, InstallError};
pub use installer::{InstallOutcome, Installer};
pub use platform::{PlatformError, current_platform};
pub use reporter::{NullReporter, Reporter};
