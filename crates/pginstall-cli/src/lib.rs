//! pginstall - binary extension archive installer
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs prebuilt database extensions from platform-specific tar.gz
//! archives.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.pginstall/
//! ├── config.toml  # Optional settings
//! ├── archives/    # <ext>--<server>--<os>--<release>--<arch>.tar.gz
//! ├── control/     # <ext>.control files
//! └── extensions/  # <ext>/... payload files
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pginstall_core::platform::check_fingerprint;
use pginstall_core::{InstallerConfig, PlatformError, current_platform};
use pginstall_schema::PlatformFingerprint;

#[derive(Debug, Parser)]
#[command(name = "pginstall")]
#[command(author, version, about = "pginstall - binary extension archive installer")]
pub struct Cli {
    /// Config file (default: $PGINSTALL_HOME/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding extension archives
    #[arg(long, global = true)]
    pub archive_dir: Option<PathBuf>,

    /// Directory receiving control files
    #[arg(long, global = true)]
    pub control_dir: Option<PathBuf>,

    /// Directory receiving extension payloads
    #[arg(long, global = true)]
    pub extension_dir: Option<PathBuf>,

    /// Repository catalog (path or file:// URI)
    #[arg(long, global = true)]
    pub repository: Option<String>,

    /// Database server version to install for (e.g. 16)
    #[arg(long, global = true)]
    pub server_version: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the platform of this host
    Platform,
    /// List extensions available from the archive directory and repository
    Available {
        #[command(flatten)]
        platform: PlatformArgs,
    },
    /// Print the archive filename of an extension
    Filename {
        /// Extension name
        extname: String,
        #[command(flatten)]
        platform: PlatformArgs,
    },
    /// Install an extension from its archive
    Install {
        /// Extension name
        extname: String,
        /// Copy the archive from this directory first
        #[arg(long)]
        mirror: Option<PathBuf>,
        #[command(flatten)]
        platform: PlatformArgs,
    },
}

/// Overrides for the detected platform, for preparing archives for other hosts.
#[derive(Debug, Clone, Default, Args)]
pub struct PlatformArgs {
    /// Kernel name (e.g. Linux)
    #[arg(long)]
    pub os_name: Option<String>,
    /// Distribution and release (e.g. "Ubuntu 22.04")
    #[arg(long)]
    pub os_version: Option<String>,
    /// Architecture (e.g. x86_64)
    #[arg(long)]
    pub arch: Option<String>,
}

impl PlatformArgs {
    /// The detected platform with any overrides applied. Detection is skipped
    /// when all three fields are given.
    pub fn resolve(&self) -> Result<PlatformFingerprint, PlatformError> {
        let platform = if let (Some(os_name), Some(os_version), Some(arch)) =
            (&self.os_name, &self.os_version, &self.arch)
        {
            PlatformFingerprint::new(os_name, os_version, arch)
        } else {
            let detected = current_platform()?;
            PlatformFingerprint::new(
                self.os_name.as_deref().unwrap_or(detected.os_name()),
                self.os_version.as_deref().unwrap_or(detected.os_version()),
                self.arch.as_deref().unwrap_or(detected.arch()),
            )
        };
        check_fingerprint(&platform)?;
        Ok(platform)
    }
}

impl Cli {
    /// Installer configuration with the command line flags applied last.
    pub fn installer_config(&self) -> Result<InstallerConfig> {
        let mut config =
            InstallerConfig::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(dir) = &self.archive_dir {
            config.archive_dir.clone_from(dir);
        }
        if let Some(dir) = &self.control_dir {
            config.control_dir.clone_from(dir);
        }
        if let Some(dir) = &self.extension_dir {
            config.extension_dir.clone_from(dir);
        }
        if let Some(repository) = &self.repository {
            config.repository = Some(repository.clone());
        }
        if let Some(version) = &self.server_version {
            config.server_version = Some(version.clone());
        }
        Ok(config)
    }
}
