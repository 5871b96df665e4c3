//! Command line behaviour of the `pginstall` binary.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

const FILENAME: &str = "foo--16--Linux--Ubuntu_22.04--x86_64.tar.gz";

/// Test context with an isolated installer home
struct TestContext {
    temp_dir: TempDir,
    home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join(".pginstall");
        std::fs::create_dir_all(home.join("archives")).expect("failed to create archive dir");
        Self { temp_dir, home }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pginstall"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("PGINSTALL_HOME", &self.home);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("PGINSTALL_SERVER_VERSION");
        cmd.env_remove("PGINSTALL_REPOSITORY");
        cmd
    }

    /// Command with the test platform pinned.
    fn pinned(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .args([
                "--os-name",
                "Linux",
                "--os-version",
                "Ubuntu 22.04",
                "--arch",
                "x86_64",
            ])
            .output()
            .expect("failed to run pginstall")
    }
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

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.cmd().arg("--help").output().expect("failed to run pginstall");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("install"));
}

#[test]
fn test_filename_command() {
    let ctx = TestContext::new();
    let output = ctx.pinned(&["--server-version", "16", "filename", "foo"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), FILENAME);
}

#[test]
fn test_filename_reads_server_version_from_config() {
    let ctx = TestContext::new();
    std::fs::write(ctx.home.join("config.toml"), "server_version = \"16\"\n").unwrap();
    let output = ctx.pinned(&["filename", "foo"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), FILENAME);
}

#[test]
fn test_filename_without_server_version_fails() {
    let ctx = TestContext::new();
    let output = ctx.pinned(&["filename", "foo"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No server version configured"));
}

#[test]
fn test_install_and_available() {
    let ctx = TestContext::new();
    write_archive(
        &ctx.home.join("archives").join(FILENAME),
        &[
            ("foo.control", b"comment = 'foo'\n"),
            ("foo/foo--1.0.sql", b"SELECT 1;"),
        ],
    );

    let output = ctx.pinned(&["--server-version", "16", "--json", "install", "foo"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["status"], "installed");
    assert_eq!(result["entries"], 2);

    assert!(ctx.home.join("control/foo.control").is_file());
    assert!(ctx.home.join("extensions/foo/foo--1.0.sql").is_file());

    let output = ctx.pinned(&["--server-version", "16", "--json", "available"]);
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["shortname"], "foo");
}

#[test]
fn test_install_missing_archive_is_deferred() {
    let ctx = TestContext::new();
    let output = ctx.pinned(&["--server-version", "16", "install", "foo"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("deferring"));
}

#[test]
fn test_install_corrupt_archive_fails() {
    let ctx = TestContext::new();
    std::fs::write(ctx.home.join("archives").join(FILENAME), b"garbage").unwrap();

    let output = ctx.pinned(&["--server-version", "16", "install", "foo"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot open archive"));
    assert!(!ctx.home.join("extensions").exists());
}
