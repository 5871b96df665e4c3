//! End-to-end installs against a temporary installer home.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;
use pginstall_core::fetch::MirrorFetcher;
use pginstall_core::io::extract::{
    DiskWriter, EntryHeader, EntryWriter, ExtractWarning, WarningPhase,
};
use pginstall_core::{FatalKind, InstallError, InstallOutcome, Installer, InstallerConfig, Reporter};
use pginstall_schema::{ArchiveDescriptor, PlatformFingerprint};
use tempfile::TempDir;

/// Scratch installer home with the default layout.
struct TestContext {
    _temp_dir: TempDir,
    config: InstallerConfig,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = InstallerConfig::rooted_at(temp_dir.path());
        fs::create_dir_all(&config.archive_dir).expect("failed to create archive dir");
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    fn archive_path(&self, extname: &str) -> PathBuf {
        let descriptor = ArchiveDescriptor::new(extname, "16", ubuntu());
        self.config.archive_dir.join(descriptor.filename())
    }
}

fn ubuntu() -> PlatformFingerprint {
    PlatformFingerprint::new("Linux", "Ubuntu 22.04", "x86_64")
}

fn write_archive(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Fails `write_header` for the n-th entry (1-based), forwards the rest.
struct FailNthHeader {
    inner: DiskWriter,
    fail_at: usize,
    seen: usize,
}

impl EntryWriter for FailNthHeader {
    fn write_header(&mut self, header: &EntryHeader) -> io::Result<()> {
        self.seen += 1;
        if self.seen == self.fail_at {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected"));
        }
        self.inner.write_header(header)
    }
    fn write_block(&mut self, offset: u64, block: &[u8]) -> io::Result<()> {
        self.inner.write_block(offset, block)
    }
    fn finish_entry(&mut self) -> io::Result<()> {
        self.inner.finish_entry()
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, title: &str) {
        self.push(format!("section {title}"));
    }
    fn extracting(&self, extname: &str, _: &Path) {
        self.push(format!("extracting {extname}"));
    }
    fn entry_warning(&self, warning: &ExtractWarning) {
        self.push(format!("entry_warning {}", warning.source_path));
    }
    fn installed(&self, extname: &str, _: &Path, entries: usize) {
        self.push(format!("installed {extname} {entries}"));
    }
    fn not_found(&self, extname: &str, _: &Path) {
        self.push(format!("not_found {extname}"));
    }
    fn info(&self, msg: &str) {
        self.push(format!("info {msg}"));
    }
    fn warning(&self, msg: &str) {
        self.push(format!("warning {msg}"));
    }
    fn error(&self, msg: &str) {
        self.push(format!("error {msg}"));
    }
}

#[test]
fn test_filename_end_to_end() {
    let ctx = TestContext::new();
    assert!(
        ctx.archive_path("foo")
            .ends_with("foo--16--Linux--Ubuntu_22.04--x86_64.tar.gz")
    );
}

#[test]
fn test_install_routes_control_and_payload() {
    let ctx = TestContext::new();
    write_archive(
        &ctx.archive_path("foo"),
        &[
            ("foo.control", b"comment = 'foo'\nmodule_pathname = '$libdir/foo'\n"),
            ("foo/foo--1.0.sql", b"SELECT 1;"),
            ("foo/foo.so", b"\x7fELF"),
        ],
    );

    let installer = Installer::new(ctx.config.clone());
    let outcome = installer.install_for("foo", "16", &ubuntu()).unwrap();

    let InstallOutcome::Installed {
        control_file,
        report,
        ..
    } = outcome
    else {
        panic!("expected an install, got {outcome:?}");
    };
    assert_eq!(control_file, ctx.config.control_dir.join("foo.control"));
    assert_eq!(report.entries.len(), 3);
    assert!(report.is_clean());
    assert!(report.entries[0].is_control);

    assert!(ctx.config.extension_dir.join("foo/foo.so").is_file());
    let control = fs::read_to_string(&control_file).unwrap();
    let install_dir = ctx.config.extension_dir.join("foo");
    assert!(control.contains(&format!("directory = '{}'", install_dir.display())));
    assert!(control.contains(&format!(
        "module_pathname = '{}/foo'",
        install_dir.display()
    )));
    assert!(control.contains("comment = 'foo'"));
}

#[test]
fn test_header_write_failure_is_recoverable() {
    let ctx = TestContext::new();
    write_archive(
        &ctx.archive_path("foo"),
        &[
            ("foo.control", b"comment = 'foo'\n"),
            ("foo/broken.sql", b"never written"),
            ("foo/foo--1.0.sql", b"SELECT 1;"),
        ],
    );

    let reporter = Arc::new(RecordingReporter::default());
    let installer = Installer::new(ctx.config.clone()).with_reporter(reporter.clone());
    let writer = FailNthHeader {
        inner: DiskWriter::new(),
        fail_at: 2,
        seen: 0,
    };
    let outcome = installer
        .install_with_writer("foo", "16", &ubuntu(), writer)
        .unwrap();

    let InstallOutcome::Installed { report, .. } = outcome else {
        panic!("expected an install");
    };
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].source_path, "foo/broken.sql");
    assert_eq!(report.warnings[0].phase, WarningPhase::WriteHeader);

    assert!(ctx.config.control_dir.join("foo.control").is_file());
    assert!(!ctx.config.extension_dir.join("foo/broken.sql").exists());
    assert_eq!(
        fs::read(ctx.config.extension_dir.join("foo/foo--1.0.sql")).unwrap(),
        b"SELECT 1;"
    );

    assert_eq!(
        reporter.events(),
        [
            "section Installing",
            "extracting foo",
            "entry_warning foo/broken.sql",
            "info Relocated foo.control",
            "installed foo 2",
        ]
    );
}

#[test]
fn test_unopenable_archive_is_fatal() {
    let ctx = TestContext::new();
    fs::write(ctx.archive_path("foo"), b"definitely not gzip").unwrap();

    let installer = Installer::new(ctx.config.clone());
    let err = installer.install_for("foo", "16", &ubuntu()).unwrap_err();

    assert!(matches!(err, InstallError::ArchiveOpen { .. }));
    assert_eq!(err.kind(), FatalKind::Open);
    assert!(!ctx.config.control_dir.exists());
    assert!(!ctx.config.extension_dir.exists());
}

#[test]
fn test_missing_control_file_fails_relocation() {
    let ctx = TestContext::new();
    write_archive(&ctx.archive_path("foo"), &[("foo/foo.so", b"so")]);

    let err = Installer::new(ctx.config.clone())
        .install_for("foo", "16", &ubuntu())
        .unwrap_err();
    assert_eq!(err.kind(), FatalKind::Relocate);
}

#[test]
fn test_not_found_is_soft() {
    let ctx = TestContext::new();
    let reporter = Arc::new(RecordingReporter::default());
    let outcome = Installer::new(ctx.config.clone())
        .with_reporter(reporter.clone())
        .install_for("absent", "16", &ubuntu())
        .unwrap();

    assert_eq!(
        outcome,
        InstallOutcome::NotFound {
            extname: "absent".to_string(),
            archive: ctx.archive_path("absent"),
        }
    );
    assert!(reporter.events().contains(&"not_found absent".to_string()));
}

#[test]
fn test_install_from_mirror() {
    let ctx = TestContext::new();
    let mirror = TempDir::new().unwrap();
    let filename = ctx.archive_path("foo").file_name().unwrap().to_owned();
    write_archive(
        &mirror.path().join(&filename),
        &[("foo.control", b"comment = 'foo'\n"), ("foo/a.sql", b"")],
    );

    let outcome = Installer::new(ctx.config.clone())
        .with_fetcher(MirrorFetcher::new(mirror.path()))
        .install_for("foo", "16", &ubuntu())
        .unwrap();

    assert!(outcome.is_installed());
    assert!(ctx.archive_path("foo").is_file());
}
