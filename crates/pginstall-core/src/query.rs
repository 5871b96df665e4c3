//! Tabular query surface: the rows a SQL layer would return.

use pginstall_schema::{ExtensionCatalogEntry, PlatformFingerprint};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, available_extensions};
use crate::config::InstallerConfig;
use crate::platform::{PlatformError, current_platform};

/// Errors raised by the query functions.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Platform detection failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Listing the catalog failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// `(os_name, os_version, arch)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformRow {
    /// Kernel name.
    pub os_name: String,
    /// Distribution name and release.
    pub os_version: String,
    /// Architecture.
    pub arch: String,
}

impl From<&PlatformFingerprint> for PlatformRow {
    fn from(platform: &PlatformFingerprint) -> Self {
        Self {
            os_name: platform.os_name().to_string(),
            os_version: platform.os_version().to_string(),
            arch: platform.arch().to_string(),
        }
    }
}

/// `(id?, shortname, fullname?, uri, description?)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableExtensionRow {
    /// Repository identifier.
    pub id: Option<i64>,
    /// Short identifier.
    pub shortname: String,
    /// Human readable name.
    pub fullname: Option<String>,
    /// Archive path or repository URI.
    pub uri: String,
    /// Free-text description.
    pub description: Option<String>,
}

impl From<ExtensionCatalogEntry> for AvailableExtensionRow {
    fn from(entry: ExtensionCatalogEntry) -> Self {
        Self {
            id: entry.id,
            shortname: entry.shortname,
            fullname: entry.fullname,
            uri: entry.uri,
            description: entry.description,
        }
    }
}

/// Exactly one row describing the running host.
///
/// # Errors
///
/// Returns an error if the platform cannot be detected.
pub fn platform_rows() -> Result<Vec<PlatformRow>, QueryError> {
    let platform = current_platform()?;
    Ok(vec![PlatformRow::from(&platform)])
}

/// The merged catalog for `platform`, in merge order.
///
/// # Errors
///
/// Returns an error if a catalog source cannot be read.
pub fn available_extension_rows_for(
    config: &InstallerConfig,
    platform: &PlatformFingerprint,
) -> Result<Vec<AvailableExtensionRow>, QueryError> {
    Ok(available_extensions(config, platform)?
        .into_iter()
        .map(AvailableExtensionRow::from)
        .collect())
}

/// The merged catalog for the running host.
///
/// # Errors
///
/// Returns an error if the platform cannot be detected or a catalog source
/// cannot be read.
pub fn available_extension_rows(
    config: &InstallerConfig,
) -> Result<Vec<AvailableExtensionRow>, QueryError> {
    let platform = current_platform()?;
    available_extension_rows_for(config, &platform)
}
