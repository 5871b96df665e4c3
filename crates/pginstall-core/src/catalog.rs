//! Extension catalog: listing sources and the shortname merge.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pginstall_schema::{
    ArchiveName, CatalogEntryError, ExtensionCatalogEntry, Origin, PlatformFingerprint,
};
use thiserror::Error;

use crate::config::{ConfigError, InstallerConfig};

/// Errors raised while listing a catalog source.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A directory or catalog file could not be read.
    #[error("Failed to read catalog {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The repository document is not a valid JSON catalog.
    #[error("Failed to parse catalog {}: {source}", path.display())]
    Parse {
        /// Catalog file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A repository entry lacks a required field.
    #[error("Invalid catalog entry #{index} in {}: {source}", path.display())]
    Entry {
        /// Catalog file path.
        path: PathBuf,
        /// Position of the entry in the document.
        index: usize,
        /// What is wrong with it.
        source: CatalogEntryError,
    },

    /// The configuration does not allow building the source.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A provider of catalog entries for one platform.
pub trait CatalogSource {
    /// List the entries available for `platform`, in source order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn list(&self, platform: &PlatformFingerprint)
    -> Result<Vec<ExtensionCatalogEntry>, CatalogError>;
}

/// Combine cache and repository listings.
///
/// Keeps every cache entry, followed by the repository entries whose
/// shortname no cache entry uses. Order within each group is preserved.
/// Shortnames repeated inside a single listing are passed through; the
/// sources are expected to list each extension once.
///
/// ```
/// use pginstall_core::catalog::merge;
/// use pginstall_schema::{ExtensionCatalogEntry, Origin};
///
/// let cache = vec![ExtensionCatalogEntry::new("foo", "A", Origin::Cache)];
/// let repo = vec![
///     ExtensionCatalogEntry::new("foo", "B", Origin::Repository),
///     ExtensionCatalogEntry::new("bar", "C", Origin::Repository),
/// ];
/// let merged = merge(cache, repo);
/// let uris: Vec<_> = merged.iter().map(|e| e.uri.as_str()).collect();
/// assert_eq!(uris, ["A", "C"]);
/// ```
pub fn merge(
    cache: Vec<ExtensionCatalogEntry>,
    repository: Vec<ExtensionCatalogEntry>,
) -> Vec<ExtensionCatalogEntry> {
    if cache.is_empty() {
        return repository;
    }

    let cached: HashSet<String> = cache.iter().map(|e| e.shortname.clone()).collect();
    let mut merged = cache;
    merged.extend(
        repository
            .into_iter()
            .filter(|e| !cached.contains(&e.shortname)),
    );
    merged
}

/// Lists the archives already present in the archive directory.
#[derive(Debug, Clone)]
pub struct ArchiveDirCatalog {
    dir: PathBuf,
    server_version: String,
}

impl ArchiveDirCatalog {
    /// Catalog of archives in `dir` built for `server_version`.
    pub fn new(dir: impl Into<PathBuf>, server_version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            server_version: server_version.into(),
        }
    }
}

impl CatalogSource for ArchiveDirCatalog {
    fn list(
        &self,
        platform: &PlatformFingerprint,
    ) -> Result<Vec<ExtensionCatalogEntry>, CatalogError> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Archive directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut found: Vec<(String, PathBuf)> = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| CatalogError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let Ok(filename) = dir_entry.file_name().into_string() else {
                continue;
            };
            let Some(name) = ArchiveName::parse(&filename) else {
                continue;
            };
            if !name.matches(&self.server_version, platform) {
                continue;
            }
            if !dir_entry.path().is_file() {
                continue;
            }
            found.push((filename, dir_entry.path()));
        }
        found.sort();

        Ok(found
            .into_iter()
            .filter_map(|(filename, path)| {
                let name = ArchiveName::parse(&filename)?;
                Some(ExtensionCatalogEntry::new(
                    name.extname,
                    path.to_string_lossy(),
                    Origin::Cache,
                ))
            })
            .collect())
    }
}

/// Repository catalog read from a JSON document.
///
/// The location is a local path or a `file://` URI. Network locations are
/// recognised but not fetched.
#[derive(Debug, Clone)]
pub struct IndexFileRepository {
    location: String,
}

impl IndexFileRepository {
    /// Repository at `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Local path of the catalog document, or `None` for network locations.
    pub fn local_path(&self) -> Option<&Path> {
        if self.location.starts_with("http://") || self.location.starts_with("https://") {
            return None;
        }
        Some(Path::new(
            self.location
                .strip_prefix("file://")
                .unwrap_or(&self.location),
        ))
    }
}

impl CatalogSource for IndexFileRepository {
    fn list(
        &self,
        _platform: &PlatformFingerprint,
    ) -> Result<Vec<ExtensionCatalogEntry>, CatalogError> {
        let Some(path) = self.local_path() else {
            tracing::warn!(
                "Repository {} is remote; remote catalogs are not supported, skipping",
                self.location
            );
            return Ok(Vec::new());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut entries: Vec<ExtensionCatalogEntry> =
            serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        for (index, entry) in entries.iter_mut().enumerate() {
            entry.validate().map_err(|source| CatalogError::Entry {
                path: path.to_path_buf(),
                index,
                source,
            })?;
            entry.origin = Origin::Repository;
        }
        tracing::debug!("Read {} entries from {}", entries.len(), path.display());
        Ok(entries)
    }
}

/// Collect and merge the enabled sources.
///
/// The cache is consulted only when `serve_from_archive_dir` is set, the
/// repository only when one is configured.
///
/// # Errors
///
/// Returns the first error raised by a consulted source.
pub fn gather(
    config: &InstallerConfig,
    platform: &PlatformFingerprint,
    cache: Option<&dyn CatalogSource>,
    repository: Option<&dyn CatalogSource>,
) -> Result<Vec<ExtensionCatalogEntry>, CatalogError> {
    let cache_entries = match cache {
        Some(source) if config.serve_from_archive_dir => source.list(platform)?,
        _ => Vec::new(),
    };
    let repo_entries = match repository {
        Some(source) if config.repository().is_some() => source.list(platform)?,
        _ => Vec::new(),
    };
    Ok(merge(cache_entries, repo_entries))
}

/// The merged catalog for `platform` using the sources named by `config`.
///
/// # Errors
///
/// Returns [`CatalogError::Config`] if the archive directory is served but no
/// server version is configured, or any error raised by a source.
pub fn available_extensions(
    config: &InstallerConfig,
    platform: &PlatformFingerprint,
) -> Result<Vec<ExtensionCatalogEntry>, CatalogError> {
    let cache = if config.serve_from_archive_dir {
        Some(ArchiveDirCatalog::new(
            &config.archive_dir,
            config.server_version()?,
        ))
    } else {
        None
    };
    let repository = config.repository().map(IndexFileRepository::new);

    gather(
        config,
        platform,
        cache.as_ref().map(|c| c as &dyn CatalogSource),
        repository.as_ref().map(|r| r as &dyn CatalogSource),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(shortname: &str, uri: &str, origin: Origin) -> ExtensionCatalogEntry {
        ExtensionCatalogEntry::new(shortname, uri, origin)
    }

    fn ubuntu() -> PlatformFingerprint {
        PlatformFingerprint::new("Linux", "Ubuntu 22.04", "x86_64")
    }

    #[test]
    fn test_merge_cache_wins() {
        let cache = vec![entry("foo", "A", Origin::Cache)];
        let repo = vec![
            entry("foo", "B", Origin::Repository),
            entry("bar", "C", Origin::Repository),
        ];
        let merged = merge(cache, repo);
        assert_eq!(
            merged,
            vec![
                entry("foo", "A", Origin::Cache),
                entry("bar", "C", Origin::Repository)
            ]
        );
    }

    #[test]
    fn test_merge_identity() {
        let cache = vec![entry("a", "1", Origin::Cache), entry("b", "2", Origin::Cache)];
        let repo = vec![entry("c", "3", Origin::Repository)];
        assert_eq!(merge(cache.clone(), Vec::new()), cache);
        assert_eq!(merge(Vec::new(), repo.clone()), repo);
    }

    #[test]
    fn test_merge_is_order_independent() {
        // Colliding entries at every position of the repository list.
        let cache = vec![entry("x", "c1", Origin::Cache), entry("y", "c2", Origin::Cache)];
        let repo = vec![
            entry("y", "r1", Origin::Repository),
            entry("z", "r2", Origin::Repository),
            entry("x", "r3", Origin::Repository),
        ];
        let merged = merge(cache, repo);
        let names: Vec<_> = merged.iter().map(|e| (e.shortname.as_str(), e.uri.as_str())).collect();
        assert_eq!(names, [("x", "c1"), ("y", "c2"), ("z", "r2")]);
    }

    #[test]
    fn test_merge_only_resolves_collisions_across_sources() {
        // Duplicates inside one listing pass through unchanged. Only a cache
        // entry shadows repository entries.
        let repo = vec![
            entry("foo", "B1", Origin::Repository),
            entry("foo", "B2", Origin::Repository),
        ];
        let merged = merge(vec![entry("bar", "A", Origin::Cache)], repo.clone());
        let uris: Vec<_> = merged.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, ["A", "B1", "B2"]);

        let merged = merge(vec![entry("foo", "A", Origin::Cache)], repo);
        let uris: Vec<_> = merged.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, ["A"]);
    }

    #[test]
    fn test_archive_dir_catalog_filters_platform() {
        let dir = tempdir().unwrap();
        for name in [
            "hstore--16--Linux--Ubuntu_22.04--x86_64.tar.gz",
            "citext--16--Linux--Ubuntu_22.04--x86_64.tar.gz",
            "hstore--15--Linux--Ubuntu_22.04--x86_64.tar.gz",
            "hstore--16--Linux--Debian_12--x86_64.tar.gz",
            "README",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("ltree--16--Linux--Ubuntu_22.04--x86_64.tar.gz"))
            .unwrap();

        let entries = ArchiveDirCatalog::new(dir.path(), "16").list(&ubuntu()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.shortname.as_str()).collect();
        assert_eq!(names, ["citext", "hstore"]);
        assert!(entries.iter().all(|e| e.origin == Origin::Cache && e.id.is_none()));
        assert!(entries[1].uri.ends_with("hstore--16--Linux--Ubuntu_22.04--x86_64.tar.gz"));
    }

    #[test]
    fn test_archive_dir_catalog_missing_dir() {
        let dir = tempdir().unwrap();
        let catalog = ArchiveDirCatalog::new(dir.path().join("absent"), "16");
        assert!(catalog.list(&ubuntu()).unwrap().is_empty());
    }

    #[test]
    fn test_index_file_repository() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "shortname": "hstore", "fullname": "HStore", "uri": "https://x/hstore", "description": "kv"},
                {"shortname": "citext", "uri": "https://x/citext", "origin": "cache"}
            ]"#,
        )
        .unwrap();

        let repo = IndexFileRepository::new(format!("file://{}", path.display()));
        let entries = repo.list(&ubuntu()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, Some(1));
        assert_eq!(entries[0].fullname.as_deref(), Some("HStore"));
        assert_eq!(entries[1].description, None);
        assert!(entries.iter().all(|e| e.origin == Origin::Repository));
    }

    #[test]
    fn test_index_file_repository_rejects_empty_shortname() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"[{"shortname": "", "uri": "x"}]"#).unwrap();

        let err = IndexFileRepository::new(path.to_string_lossy())
            .list(&ubuntu())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Entry { index: 0, .. }));
    }

    #[test]
    fn test_remote_repository_is_skipped() {
        let repo = IndexFileRepository::new("https://repo.example.org/catalog.json");
        assert!(repo.local_path().is_none());
        assert!(repo.list(&ubuntu()).unwrap().is_empty());
    }

    #[test]
    fn test_gather_respects_switches() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("foo--16--Linux--Ubuntu_22.04--x86_64.tar.gz"),
            b"",
        )
        .unwrap();
        let catalog = dir.path().join("catalog.json");
        std::fs::write(&catalog, r#"[{"shortname": "bar", "uri": "B"}]"#).unwrap();

        let mut config = InstallerConfig::rooted_at(dir.path());
        config.archive_dir = dir.path().to_path_buf();
        config.server_version = Some("16".to_string());
        config.repository = Some(catalog.to_string_lossy().into_owned());

        let all = available_extensions(&config, &ubuntu()).unwrap();
        assert_eq!(all.len(), 2);

        config.serve_from_archive_dir = false;
        let repo_only = available_extensions(&config, &ubuntu()).unwrap();
        assert_eq!(repo_only.len(), 1);
        assert_eq!(repo_only[0].shortname, "bar");

        config.repository = Some(String::new());
        assert!(available_extensions(&config, &ubuntu()).unwrap().is_empty());
    }

    #[test]
    fn test_available_needs_server_version_for_cache() {
        let dir = tempdir().unwrap();
        let config = InstallerConfig::rooted_at(dir.path());
        let err = available_extensions(&config, &ubuntu()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Config(ConfigError::MissingServerVersion)
        ));
    }
}
