//! Installer configuration.
//!
//! Built once per process and passed by reference to everything that needs a
//! directory: the installer, the extractor and the catalog sources. Later
//! layers override earlier ones: defaults under the installer home, then the
//! TOML config file, then `PGINSTALL_*` environment variables. The CLI applies
//! its own flags on top.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::paths;

/// Errors raised while building an [`InstallerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither `PGINSTALL_HOME` nor the user's home directory is available.
    #[error("Could not determine home directory. Set {} to override.", paths::HOME_ENV)]
    NoHome,

    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A setting holds a value of the wrong shape.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// An operation needs the server version and none is configured.
    #[error(
        "No server version configured. Pass --server-version or set PGINSTALL_SERVER_VERSION."
    )]
    MissingServerVersion,
}

/// Settings shared by every install and catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Where resolved archive files are expected after fetch.
    pub archive_dir: PathBuf,
    /// Where control files are written.
    pub control_dir: PathBuf,
    /// Where extension payload files are written.
    pub extension_dir: PathBuf,
    /// Repository location; `None` or empty disables the repository catalog.
    pub repository: Option<String>,
    /// Whether archives in `archive_dir` are listed as available.
    pub serve_from_archive_dir: bool,
    /// Database server version archives must be built for.
    pub server_version: Option<String>,
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    archive_dir: Option<PathBuf>,
    control_dir: Option<PathBuf>,
    extension_dir: Option<PathBuf>,
    repository: Option<String>,
    serve_from_archive_dir: Option<bool>,
    server_version: Option<String>,
}

impl InstallerConfig {
    /// Defaults with every directory under `home`.
    pub fn rooted_at(home: &Path) -> Self {
        Self {
            archive_dir: paths::archive_dir(home),
            control_dir: paths::control_dir(home),
            extension_dir: paths::extension_dir(home),
            repository: None,
            serve_from_archive_dir: true,
            server_version: None,
        }
    }

    /// Build the configuration from defaults, config file and environment.
    ///
    /// `config_file` overrides `<home>/config.toml`. An explicit file must
    /// exist; the default one is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be resolved, the config
    /// file cannot be read or parsed, or an environment variable holds an
    /// invalid value.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let home = paths::try_pginstall_home().ok_or(ConfigError::NoHome)?;
        let mut config = Self::rooted_at(&home);

        match config_file {
            Some(path) => config = config.merge_file(path)?,
            None => {
                let default = paths::config_file(&home);
                if default.is_file() {
                    config = config.merge_file(&default)?;
                }
            }
        }

        config.merge_vars(|key| std::env::var(key).ok())
    }

    /// Overlay the keys present in a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config TOML.
    pub fn merge_file(self, path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(self.overlay(file))
    }

    /// Overlay `PGINSTALL_*` variables as returned by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PGINSTALL_SERVE_FROM_ARCHIVE_DIR`
    /// is not a boolean.
    pub fn merge_vars(self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let serve_from_archive_dir = match lookup("PGINSTALL_SERVE_FROM_ARCHIVE_DIR") {
            Some(value) => Some(parse_bool("PGINSTALL_SERVE_FROM_ARCHIVE_DIR", value)?),
            None => None,
        };
        Ok(self.overlay(ConfigFile {
            archive_dir: lookup("PGINSTALL_ARCHIVE_DIR").map(PathBuf::from),
            control_dir: lookup("PGINSTALL_CONTROL_DIR").map(PathBuf::from),
            extension_dir: lookup("PGINSTALL_EXTENSION_DIR").map(PathBuf::from),
            repository: lookup("PGINSTALL_REPOSITORY"),
            serve_from_archive_dir,
            server_version: lookup("PGINSTALL_SERVER_VERSION"),
        }))
    }

    fn overlay(mut self, file: ConfigFile) -> Self {
        if let Some(dir) = file.archive_dir {
            self.archive_dir = dir;
        }
        if let Some(dir) = file.control_dir {
            self.control_dir = dir;
        }
        if let Some(dir) = file.extension_dir {
            self.extension_dir = dir;
        }
        if file.repository.is_some() {
            self.repository = file.repository;
        }
        if let Some(serve) = file.serve_from_archive_dir {
            self.serve_from_archive_dir = serve;
        }
        if file.server_version.is_some() {
            self.server_version = file.server_version;
        }
        self
    }

    /// The repository location, if one is configured and non-empty.
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref().filter(|r| !r.is_empty())
    }

    /// The configured server version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingServerVersion`] if none is set.
    pub fn server_version(&self) -> Result<&str, ConfigError> {
        self.server_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingServerVersion)
    }
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}
