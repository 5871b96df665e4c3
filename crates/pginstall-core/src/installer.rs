//! Install orchestration.
//!
//! fingerprint → archive filename → fetch → extract → relocate control file

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pginstall_schema::{ArchiveDescriptor, PlatformFingerprint, control_filename, resolve};

use crate::config::InstallerConfig;
use crate::control::{ControlFileRewriter, ControlRelocator};
use crate::error::InstallError;
use crate::fetch::{ArchiveFetcher, LocalCacheOnly};
use crate::io::extract::{DiskWriter, EntryWriter, ExtractReport, extract_archive};
use crate::platform::current_platform;
use crate::remap::PathRemapper;
use crate::reporter::{NullReporter, Reporter};

/// Result of an install request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The archive was extracted and its control file relocated.
    Installed {
        /// Extension name.
        extname: String,
        /// Archive that was extracted.
        archive: PathBuf,
        /// Relocated control file.
        control_file: PathBuf,
        /// Entries written and recoverable warnings.
        report: ExtractReport,
    },
    /// No readable archive was found. Another mechanism (an OS package, say)
    /// may still satisfy the request.
    NotFound {
        /// Extension name.
        extname: String,
        /// Where the archive was expected.
        archive: PathBuf,
    },
}

impl InstallOutcome {
    /// Whether the extension was installed by this call.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Installs extension archives into the configured directories.
pub struct Installer {
    config: InstallerConfig,
    fetcher: Box<dyn ArchiveFetcher>,
    relocator: Box<dyn ControlRelocator>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Installer using pre-seeded archives and the default control rewriter.
    pub fn new(config: InstallerConfig) -> Self {
        let relocator = ControlFileRewriter::new(&config.extension_dir);
        Self {
            config,
            fetcher: Box::new(LocalCacheOnly),
            relocator: Box::new(relocator),
            reporter: Arc::new(NullReporter),
        }
    }

    /// Use `fetcher` to populate the archive directory.
    pub fn with_fetcher(mut self, fetcher: impl ArchiveFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Use `relocator` on installed control files.
    pub fn with_relocator(mut self, relocator: impl ControlRelocator + 'static) -> Self {
        self.relocator = Box::new(relocator);
        self
    }

    /// Send progress to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The configuration this installer writes with.
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Where the archive for `descriptor` is expected.
    pub fn archive_path(&self, descriptor: &ArchiveDescriptor) -> PathBuf {
        self.config.archive_dir.join(resolve(descriptor))
    }

    /// Install `extname` built for `server_version` on the running host.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot be detected, or for any fatal
    /// failure listed by [`Installer::install_for`].
    pub fn install(
        &self,
        extname: &str,
        server_version: &str,
    ) -> Result<InstallOutcome, InstallError> {
        let platform = current_platform()?;
        self.install_for(extname, server_version, &platform)
    }

    /// Install `extname` built for `server_version` on `platform`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be opened, an entry header
    /// cannot be read, a written entry cannot be finalized, or the control
    /// file cannot be relocated.
    pub fn install_for(
        &self,
        extname: &str,
        server_version: &str,
        platform: &PlatformFingerprint,
    ) -> Result<InstallOutcome, InstallError> {
        self.install_with_writer(extname, server_version, platform, DiskWriter::new())
    }

    /// Like [`Installer::install_for`], writing entries through `writer`.
    ///
    /// # Errors
    ///
    /// See [`Installer::install_for`].
    pub fn install_with_writer<W: EntryWriter>(
        &self,
        extname: &str,
        server_version: &str,
        platform: &PlatformFingerprint,
        writer: W,
    ) -> Result<InstallOutcome, InstallError> {
        let descriptor = ArchiveDescriptor::new(extname, server_version, platform.clone());
        let archive = self.archive_path(&descriptor);

        self.reporter.section("Installing");

        if let Err(e) = self.fetcher.fetch(&archive, extname, platform) {
            tracing::warn!("Fetching {extname} failed: {e}");
            self.reporter.warning(&e.to_string());
        }

        if !is_readable(&archive) {
            tracing::info!(
                "No archive for {extname} at {}, deferring",
                archive.display()
            );
            self.reporter.not_found(extname, &archive);
            return Ok(InstallOutcome::NotFound {
                extname: extname.to_string(),
                archive,
            });
        }

        self.reporter.extracting(extname, &archive);
        let remapper = PathRemapper::new(
            extname,
            &self.config.control_dir,
            &self.config.extension_dir,
        );
        let report = extract_archive(&archive, &remapper, writer)
            .map_err(|e| InstallError::from_extract(&archive, e))?;
        for warning in &report.warnings {
            self.reporter.entry_warning(warning);
        }

        let control_file = self.config.control_dir.join(control_filename(extname));
        self.relocator.relocate(extname, &control_file)?;
        self.reporter.info(&format!("Relocated {}", control_filename(extname)));

        tracing::info!(
            "Installed {extname} from {} ({} entries, {} warnings)",
            archive.display(),
            report.entries.len(),
            report.warnings.len()
        );
        self.reporter
            .installed(extname, &archive, report.entries.len());

        Ok(InstallOutcome::Installed {
            extname: extname.to_string(),
            archive,
            control_file,
            report,
        })
    }
}

fn is_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}
