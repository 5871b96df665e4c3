//! Fatal install errors

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::control::RelocateError;
use crate::io::extract::ExtractError;
use crate::platform::PlatformError;

/// Why an install was aborted.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The host platform could not be identified.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The archive is unreadable, corrupt, or not a tar.gz file.
    #[error("Cannot open archive {}: {source}", archive.display())]
    ArchiveOpen {
        /// Archive path.
        archive: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An entry header in the archive could not be read.
    #[error("Cannot read archive {}: {source}", archive.display())]
    ArchiveRead {
        /// Archive path.
        archive: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An extracted entry could not be finalized on disk.
    #[error("Cannot write {} from archive {}: {source}", target.display(), archive.display())]
    ArchiveWrite {
        /// Archive path.
        archive: PathBuf,
        /// Entry destination.
        target: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The installed control file could not be relocated.
    #[error(transparent)]
    Relocate(#[from] RelocateError),

    /// The installer is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of an [`InstallError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// Platform detection failed.
    Platform,
    /// The archive could not be opened.
    Open,
    /// An archive header could not be read.
    Read,
    /// A written entry could not be finalized.
    Finish,
    /// Control file relocation failed.
    Relocate,
    /// Configuration problem.
    Config,
}

impl std::fmt::Display for FatalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Platform => "platform",
            Self::Open => "open",
            Self::Read => "read",
            Self::Finish => "finish",
            Self::Relocate => "relocate",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

impl InstallError {
    /// Attach the archive path to an extraction failure.
    pub fn from_extract(archive: impl Into<PathBuf>, err: ExtractError) -> Self {
        let archive = archive.into();
        match err {
            ExtractError::Open { source, .. } => Self::ArchiveOpen { archive, source },
            ExtractError::Read(source) => Self::ArchiveRead { archive, source },
            ExtractError::Finish { target, source } => Self::ArchiveWrite {
                archive,
                target,
                source,
            },
        }
    }

    /// Which step failed.
    pub fn kind(&self) -> FatalKind {
        match self {
            Self::Platform(_) => FatalKind::Platform,
            Self::ArchiveOpen { .. } => FatalKind::Open,
            Self::ArchiveRead { .. } => FatalKind::Read,
            Self::ArchiveWrite { .. } => FatalKind::Finish,
            Self::Relocate(_) => FatalKind::Relocate,
            Self::Config(_) => FatalKind::Config,
        }
    }
}
