//! Archive fetch collaborators.
//!
//! A fetcher makes a best effort to place the resolved archive in the archive
//! directory. The installer only checks the result: whether the file is there
//! and readable afterwards.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pginstall_schema::PlatformFingerprint;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised while fetching an archive. Never fatal to an install.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The archive could not be read from its source.
    #[error("Failed to read {}: {source}", path.display())]
    Source {
        /// Source path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The archive could not be stored in the archive directory.
    #[error("Failed to store {}: {source}", path.display())]
    Store {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Places archives in the archive directory.
pub trait ArchiveFetcher: Send + Sync {
    /// Try to make `archive_path` exist, holding the build of `extname` for
    /// `platform`. Finding nothing to fetch is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a source archive exists but cannot be copied.
    fn fetch(
        &self,
        archive_path: &Path,
        extname: &str,
        platform: &PlatformFingerprint,
    ) -> Result<(), FetchError>;
}

/// Uses whatever is already in the archive directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCacheOnly;

impl ArchiveFetcher for LocalCacheOnly {
    fn fetch(&self, archive_path: &Path, extname: &str, _: &PlatformFingerprint) -> Result<(), FetchError> {
        tracing::debug!(
            "No remote fetch for {extname}; expecting {}",
            archive_path.display()
        );
        Ok(())
    }
}

/// Copies archives from a mirror directory laid out like the archive directory.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    mirror_dir: PathBuf,
}

impl MirrorFetcher {
    /// Fetcher reading from `mirror_dir`.
    pub fn new(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
        }
    }

    /// The mirror directory.
    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }
}

impl ArchiveFetcher for MirrorFetcher {
    fn fetch(&self, archive_path: &Path, extname: &str, _: &PlatformFingerprint) -> Result<(), FetchError> {
        let Some(filename) = archive_path.file_name() else {
            return Ok(());
        };
        let source = self.mirror_dir.join(filename);
        if !source.is_file() {
            tracing::debug!("Mirror has no {} for {extname}", source.display());
            return Ok(());
        }

        let dir = archive_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let store_error = |source| FetchError::Store {
            path: archive_path.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(store_error)?;

        let bytes = fs::read(&source).map_err(|e| FetchError::Source {
            path: source.clone(),
            source: e,
        })?;

        // Write to a temp file beside the target, then rename into place.
        let mut temp = NamedTempFile::new_in(dir).map_err(store_error)?;
        temp.write_all(&bytes).map_err(store_error)?;
        temp.persist(archive_path)
            .map_err(|e| store_error(e.error))?;

        tracing::info!("Fetched {} from {}", archive_path.display(), self.mirror_dir.display());
        Ok(())
    }
}
