//! Archive extraction module
//!
//! Streams a tar.gz extension archive one entry at a time. Each entry is
//! routed by [`PathRemapper`] and handed to an [`EntryWriter`]:
//!
//! ```text
//! ReadNextHeader ──eof──▶ Closed
//!       │ ok                 ▲
//!       ▼                    │ fatal (read / finish)
//! WriteHeader ──fail──▶ warn, next entry
//!       │ ok
//!       ▼
//! CopyData (BLOCK_SIZE blocks, write failure: warn, stop copying)
//!       ▼
//! FinishEntry ──ok──▶ ReadNextHeader
//! ```

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::remap::{ArchiveEntryPlan, PathRemapper};

/// Size of the blocks streamed from reader to writer.
pub const BLOCK_SIZE: usize = 10240;

/// Reader type of an opened extension archive.
pub type GzArchive = tar::Archive<GzDecoder<BufReader<File>>>;

/// Fatal extraction failures. Each one aborts the whole extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The archive file is missing, unreadable, or not gzip data.
    #[error("Failed to open archive \"{}\": {source}", path.display())]
    Open {
        /// Archive path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// An entry header could not be read.
    #[error("Failed to read archive entry: {0}")]
    Read(#[source] io::Error),

    /// A written entry could not be finalized.
    #[error("Failed to finish \"{}\": {source}", target.display())]
    Finish {
        /// Destination of the entry.
        target: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

/// What an entry is, with link targets already remapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with data.
    File,
    /// Directory.
    Directory,
    /// Symbolic link to the given (verbatim) target.
    Symlink(PathBuf),
    /// Hard link to another entry, planned like an entry of its own.
    HardLink(ArchiveEntryPlan),
    /// Anything else (devices, fifos, ...), described for diagnostics.
    Other(String),
}

/// Metadata cloned from an archive entry, with its destination.
#[derive(Debug, Clone)]
pub struct EntryHeader {
    /// Where the entry goes.
    pub plan: ArchiveEntryPlan,
    /// Entry type.
    pub kind: EntryKind,
    /// Permission bits, if recorded.
    pub mode: Option<u32>,
    /// Modification time in seconds since the epoch, if recorded.
    pub mtime: Option<u64>,
    /// Size of the entry data.
    pub size: u64,
}

/// Destination side of an extraction.
pub trait EntryWriter {
    /// Create the entry described by `header`.
    ///
    /// # Errors
    ///
    /// A failure here skips the entry and is reported as a warning.
    fn write_header(&mut self, header: &EntryHeader) -> io::Result<()>;

    /// Write one block of entry data at `offset`.
    ///
    /// # Errors
    ///
    /// A failure here stops the copy for this entry and is reported as a warning.
    fn write_block(&mut self, offset: u64, block: &[u8]) -> io::Result<()>;

    /// Finalize the current entry (size, times, permissions).
    ///
    /// # Errors
    ///
    /// A failure here aborts the extraction.
    fn finish_entry(&mut self) -> io::Result<()>;

    /// Release any resources still held.
    fn close(&mut self) {}
}

impl<W: EntryWriter + ?Sized> EntryWriter for &mut W {
    fn write_header(&mut self, header: &EntryHeader) -> io::Result<()> {
        (**self).write_header(header)
    }
    fn write_block(&mut self, offset: u64, block: &[u8]) -> io::Result<()> {
        (**self).write_block(offset, block)
    }
    fn finish_entry(&mut self) -> io::Result<()> {
        (**self).finish_entry()
    }
    fn close(&mut self) {
        (**self).close();
    }
}

/// Extraction step at which a recoverable problem happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningPhase {
    /// The entry could not be created; it was skipped.
    WriteHeader,
    /// Writing entry data failed; the entry may be incomplete.
    CopyData,
}

/// A recoverable problem with a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractWarning {
    /// Entry path as recorded in the archive.
    pub source_path: String,
    /// Intended destination.
    pub target_path: PathBuf,
    /// Where it went wrong.
    pub phase: WarningPhase,
    /// Error message.
    pub message: String,
}

impl std::fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self.phase {
            WarningPhase::WriteHeader => "skipped",
            WarningPhase::CopyData => "incomplete",
        };
        write!(
            f,
            "{} ({action}): {}",
            self.target_path.display(),
            self.message
        )
    }
}

/// Result of processing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Written and finalized.
    Written(ArchiveEntryPlan),
    /// Finalized after its data copy stopped early.
    Partial(ArchiveEntryPlan, ExtractWarning),
    /// Not written at all.
    Skipped(ExtractWarning),
}

/// Summary of a completed extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries that were written, fully or partially, in archive order.
    pub entries: Vec<ArchiveEntryPlan>,
    /// Recoverable problems, in archive order.
    pub warnings: Vec<ExtractWarning>,
}

impl ExtractReport {
    /// No warnings were raised.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadNextHeader,
    Closed,
}

/// An extraction in progress: one iterator step per archive entry.
///
/// After end of archive or the first fatal error the writer is closed and the
/// iterator keeps returning `None`.
pub struct Extraction<'a, R: Read + 'a, W: EntryWriter> {
    entries: tar::Entries<'a, R>,
    remapper: &'a PathRemapper,
    writer: W,
    state: State,
}

impl<'a, R: Read + 'a, W: EntryWriter> std::fmt::Debug for Extraction<'a, R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extraction")
            .field("remapper", &self.remapper)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Read + 'a, W: EntryWriter> Extraction<'a, R, W> {
    /// Start extracting `entries` through `writer`.
    pub fn new(entries: tar::Entries<'a, R>, remapper: &'a PathRemapper, writer: W) -> Self {
        Self {
            entries,
            remapper,
            writer,
            state: State::ReadNextHeader,
        }
    }

    /// Whether the extraction has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Drive the extraction to completion.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; entries already written stay on disk.
    pub fn run(mut self) -> Result<ExtractReport, ExtractError> {
        let mut report = ExtractReport::default();
        for outcome in &mut self {
            match outcome? {
                EntryOutcome::Written(plan) => report.entries.push(plan),
                EntryOutcome::Partial(plan, warning) => {
                    report.entries.push(plan);
                    report.warnings.push(warning);
                }
                EntryOutcome::Skipped(warning) => report.warnings.push(warning),
            }
        }
        Ok(report)
    }

    fn close(&mut self) {
        if self.state != State::Closed {
            self.writer.close();
            self.state = State::Closed;
        }
    }

    fn process(&mut self, mut entry: tar::Entry<'a, R>) -> Result<EntryOutcome, ExtractError> {
        let header = self.clone_header(&entry).map_err(ExtractError::Read)?;

        tracing::debug!(
            "Extracting \"{}\" to \"{}\"",
            header.plan.source_path,
            header.plan.target_path.display()
        );

        // WriteHeader
        if let Err(e) = self.writer.write_header(&header) {
            tracing::warn!("{}: {e}", header.plan.target_path.display());
            return Ok(EntryOutcome::Skipped(warning(
                &header.plan,
                WarningPhase::WriteHeader,
                &e,
            )));
        }

        // CopyData
        let copy_warning = self.copy_data(&mut entry, &header.plan);

        // FinishEntry
        self.writer
            .finish_entry()
            .map_err(|source| ExtractError::Finish {
                target: header.plan.target_path.clone(),
                source,
            })?;

        Ok(match copy_warning {
            Some(w) => EntryOutcome::Partial(header.plan, w),
            None => EntryOutcome::Written(header.plan),
        })
    }

    fn clone_header(&self, entry: &tar::Entry<'a, R>) -> io::Result<EntryHeader> {
        let path_bytes = entry.path_bytes();
        let plan = self.remapper.plan(&path_bytes);
        let entry_type = entry.header().entry_type();

        let kind = if entry_type.is_dir() {
            EntryKind::Directory
        } else if entry_type.is_file() || entry_type.is_contiguous() || entry_type.is_gnu_sparse() {
            EntryKind::File
        } else if entry_type.is_symlink() {
            EntryKind::Symlink(link_target(entry)?)
        } else if entry_type.is_hard_link() {
            let link = entry.link_name_bytes().unwrap_or_default();
            EntryKind::HardLink(self.remapper.plan(&link))
        } else {
            EntryKind::Other(format!("{entry_type:?}"))
        };

        Ok(EntryHeader {
            plan,
            kind,
            mode: entry.header().mode().ok(),
            mtime: entry.header().mtime().ok(),
            size: entry.size(),
        })
    }

    fn copy_data(
        &mut self,
        entry: &mut tar::Entry<'a, R>,
        plan: &ArchiveEntryPlan,
    ) -> Option<ExtractWarning> {
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut offset = 0u64;
        loop {
            let n = match entry.read(&mut block) {
                Ok(0) => return None,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Stopped reading {}: {e}", plan.source_path);
                    return None;
                }
            };
            if let Err(e) = self.writer.write_block(offset, &block[..n]) {
                tracing::warn!("{}: {e}", plan.target_path.display());
                return Some(warning(plan, WarningPhase::CopyData, &e));
            }
            offset += n as u64;
        }
    }
}

impl<'a, R: Read + 'a, W: EntryWriter> Iterator for Extraction<'a, R, W> {
    type Item = Result<EntryOutcome, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Closed {
            return None;
        }

        let entry = match self.entries.next() {
            None => {
                self.close();
                return None;
            }
            Some(Err(e)) => {
                self.close();
                return Some(Err(ExtractError::Read(e)));
            }
            Some(Ok(entry)) => entry,
        };

        let outcome = self.process(entry);
        if outcome.is_err() {
            self.close();
        }
        Some(outcome)
    }
}

fn warning(plan: &ArchiveEntryPlan, phase: WarningPhase, error: &io::Error) -> ExtractWarning {
    ExtractWarning {
        source_path: plan.source_path.clone(),
        target_path: plan.target_path.clone(),
        phase,
        message: error.to_string(),
    }
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>) -> io::Result<PathBuf> {
    entry
        .link_name()?
        .map(Cow::into_owned)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "symlink without a target"))
}

/// Open a tar.gz archive for reading.
///
/// The gzip header is parsed immediately, so a file that is not gzip data
/// fails here rather than at the first entry.
///
/// # Errors
///
/// Returns [`ExtractError::Open`] if the file cannot be opened or does not
/// start with a valid gzip header.
pub fn open_archive(path: &Path) -> Result<GzArchive, ExtractError> {
    let open_error = |source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_error)?;
    let decoder = GzDecoder::new(BufReader::with_capacity(BLOCK_SIZE, file));
    if decoder.header().is_none() {
        return Err(open_error(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a gzip-compressed archive",
        )));
    }
    Ok(tar::Archive::new(decoder))
}

/// Extract the tar.gz archive at `path` through `writer`.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened, an entry header cannot
/// be read, or a written entry cannot be finalized.
pub fn extract_archive<W: EntryWriter>(
    path: &Path,
    remapper: &PathRemapper,
    writer: W,
) -> Result<ExtractReport, ExtractError> {
    let mut archive = open_archive(path)?;
    tracing::debug!("Unpacking archive \"{}\"", path.display());

    let entries = archive.entries().map_err(|source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Extraction::new(entries, remapper, writer).run()
}

/// Writes entries to the local filesystem.
///
/// Refuses entries, and hard-link targets, with absolute paths or `..`
/// components, and never writes through a symlink below the destination
/// root. Restores the modification time of files and, on unix, their
/// permission bits.
#[derive(Debug, Default)]
pub struct DiskWriter {
    current: Option<OpenEntry>,
}

#[derive(Debug)]
struct OpenEntry {
    target: PathBuf,
    file: Option<File>,
    mode: Option<u32>,
    mtime: Option<u64>,
    size: u64,
}

impl DiskWriter {
    /// A writer with no entry open.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryWriter for DiskWriter {
    fn write_header(&mut self, header: &EntryHeader) -> io::Result<()> {
        self.current = None;
        check_contained(&header.plan)?;

        let target = &header.plan.target_path;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = match &header.kind {
            EntryKind::Directory => {
                fs::create_dir_all(target)?;
                None
            }
            EntryKind::File => {
                remove_existing_link(target)?;
                Some(File::create(target)?)
            }
            EntryKind::Symlink(link) => {
                remove_existing(target)?;
                symlink(link, target)?;
                None
            }
            EntryKind::HardLink(link) => {
                check_contained(link)?;
                remove_existing(target)?;
                fs::hard_link(&link.target_path, target)?;
                None
            }
            EntryKind::Other(kind) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported entry type {kind}"),
                ));
            }
        };

        self.current = Some(OpenEntry {
            target: target.clone(),
            file,
            mode: header.mode,
            mtime: header.mtime,
            size: header.size,
        });
        Ok(())
    }

    fn write_block(&mut self, offset: u64, block: &[u8]) -> io::Result<()> {
        let file = self
            .current
            .as_mut()
            .and_then(|entry| entry.file.as_mut())
            .ok_or_else(|| io::Error::other("no file entry open for data"))?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(block)
    }

    fn finish_entry(&mut self) -> io::Result<()> {
        let Some(entry) = self.current.take() else {
            return Ok(());
        };
        let Some(file) = entry.file else {
            return Ok(());
        };

        // Sparse entries may end in a hole.
        file.set_len(entry.size)?;
        if let Some(mtime) = entry.mtime {
            file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime))?;
        }
        drop(file);

        #[cfg(unix)]
        if let Some(mode) = entry.mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&entry.target, fs::Permissions::from_mode(mode & 0o7777))?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.current = None;
    }
}

/// Reject absolute paths and `..` components (Zip Slip).
fn check_relative(source_path: &str) -> io::Result<()> {
    let escapes = Path::new(source_path).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid path in archive: {source_path}"),
        ));
    }
    Ok(())
}

/// `plan.target_path` stays inside `plan.root`, even with links on disk.
fn check_contained(plan: &ArchiveEntryPlan) -> io::Result<()> {
    check_relative(&plan.source_path)?;
    check_ancestors(plan)
}

/// Reject a destination whose parent directories include a symlink.
fn check_ancestors(plan: &ArchiveEntryPlan) -> io::Result<()> {
    let mut dir = plan.root.clone();
    let mut components = Path::new(&plan.source_path).components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        let Component::Normal(name) = component else {
            continue;
        };
        dir.push(name);
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("symbolic link in path: {}", dir.display()),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn remove_existing_link(target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(target),
        _ => Ok(()),
    }
}

fn remove_existing(target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "a directory is in the way",
        )),
        Ok(_) => fs::remove_file(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn symlink(_link: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
