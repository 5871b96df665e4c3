//! Extension catalog entries as produced by the cache and the repository.

use serde::{Deserialize, Serialize};

/// Where a catalog entry came from. Cache entries win shortname collisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Found as an archive in the local archive directory.
    Cache,
    /// Listed by the remote repository (the default for wire documents).
    #[default]
    Repository,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Repository => write!(f, "repository"),
        }
    }
}

/// One extension available for installation.
///
/// `shortname` is the unique key within a merged catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionCatalogEntry {
    /// Repository identifier, absent for cache entries.
    #[serde(default)]
    pub id: Option<i64>,
    /// Short identifier (e.g. `hstore`).
    pub shortname: String,
    /// Human readable name.
    #[serde(default)]
    pub fullname: Option<String>,
    /// Location of the extension: archive path or repository URI.
    pub uri: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Provenance, used to break merge ties.
    #[serde(default, skip_serializing)]
    pub origin: Origin,
}

/// Errors that can occur when validating an [`ExtensionCatalogEntry`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CatalogEntryError {
    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(&'static str),
}

impl ExtensionCatalogEntry {
    /// Create an entry with only the required fields set.
    pub fn new(shortname: impl Into<String>, uri: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: None,
            shortname: shortname.into(),
            fullname: None,
            uri: uri.into(),
            description: None,
            origin,
        }
    }

    /// Set the repository identifier.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the human readable name.
    pub fn with_fullname(mut self, fullname: impl Into<String>) -> Self {
        self.fullname = Some(fullname.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogEntryError::EmptyField`] if `shortname` or `uri` is empty.
    pub fn validate(&self) -> Result<(), CatalogEntryError> {
        if self.shortname.is_empty() {
            return Err(CatalogEntryError::EmptyField("shortname"));
        }
        if self.uri.is_empty() {
            return Err(CatalogEntryError::EmptyField("uri"));
        }
        Ok(())
    }
}
