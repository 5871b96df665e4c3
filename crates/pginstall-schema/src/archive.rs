//! Archive naming: how an extension build is named on disk and inside.
//!
//! Layout: `{extname}--{server_version}--{os_name}--{os_version}--{arch}.tar.gz`
//! with the three platform fields escaped. Cache lookups depend on this
//! string matching byte for byte.

use crate::platform::PlatformFingerprint;

/// Suffix shared by every binary extension archive.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Separator between the fields of an archive filename.
pub const FIELD_SEPARATOR: &str = "--";

/// Suffix of the per-extension control file.
pub const CONTROL_SUFFIX: &str = ".control";

/// Name of the control file an archive for `extname` must contain.
///
/// ```
/// assert_eq!(pginstall_schema::control_filename("pgcrypto"), "pgcrypto.control");
/// ```
pub fn control_filename(extname: &str) -> String {
    format!("{extname}{CONTROL_SUFFIX}")
}

/// Everything needed to name the archive of one extension build.
///
/// Request scoped: build one per install, and use the same descriptor both to
/// name the file to fetch and to look for it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveDescriptor {
    extname: String,
    server_version: String,
    platform: PlatformFingerprint,
}

impl ArchiveDescriptor {
    /// Describe the archive of `extname` built for `server_version` on `platform`.
    pub fn new(
        extname: impl Into<String>,
        server_version: impl Into<String>,
        platform: PlatformFingerprint,
    ) -> Self {
        Self {
            extname: extname.into(),
            server_version: server_version.into(),
            platform,
        }
    }

    /// Extension name.
    pub fn extname(&self) -> &str {
        &self.extname
    }

    /// Database server version the archive was built against.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Target platform.
    pub fn platform(&self) -> &PlatformFingerprint {
        &self.platform
    }

    /// The canonical archive filename. Pure and deterministic.
    ///
    /// ```
    /// use pginstall_schema::{ArchiveDescriptor, PlatformFingerprint};
    ///
    /// let platform = PlatformFingerprint::new("Linux", "Ubuntu 22.04", "x86_64");
    /// let descriptor = ArchiveDescriptor::new("foo", "16", platform);
    /// assert_eq!(descriptor.filename(), "foo--16--Linux--Ubuntu_22.04--x86_64.tar.gz");
    /// ```
    pub fn filename(&self) -> String {
        let [os_name, os_version, arch] = self.platform.escaped_fields();
        [
            self.extname.as_str(),
            self.server_version.as_str(),
            os_name.as_str(),
            os_version.as_str(),
            arch.as_str(),
        ]
        .join(FIELD_SEPARATOR)
            + ARCHIVE_SUFFIX
    }
}

/// Resolve the archive filename for `descriptor`.
pub fn resolve(descriptor: &ArchiveDescriptor) -> String {
    descriptor.filename()
}

/// The fields recovered from an archive filename.
///
/// Platform fields stay in their escaped form: spaces were already turned
/// into underscores when the name was built and cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// Extension name.
    pub extname: String,
    /// Database server version.
    pub server_version: String,
    /// Escaped kernel name.
    pub os_name: String,
    /// Escaped distribution name and release.
    pub os_version: String,
    /// Escaped architecture.
    pub arch: String,
}

impl ArchiveName {
    /// Parse a filename produced by [`ArchiveDescriptor::filename`].
    ///
    /// Returns `None` unless the name ends in `.tar.gz` and splits into
    /// exactly five non-empty fields.
    ///
    /// ```
    /// use pginstall_schema::ArchiveName;
    ///
    /// let name = ArchiveName::parse("hstore--16--Linux--Ubuntu_22.04--x86_64.tar.gz").unwrap();
    /// assert_eq!(name.extname, "hstore");
    /// assert_eq!(name.os_version, "Ubuntu_22.04");
    /// assert!(ArchiveName::parse("hstore.tar.gz").is_none());
    /// ```
    pub fn parse(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(ARCHIVE_SUFFIX)?;
        let fields: Vec<&str> = stem.split(FIELD_SEPARATOR).collect();
        let [extname, server_version, os_name, os_version, arch] = fields.as_slice() else {
            return None;
        };
        if fields.iter().any(|f| f.is_empty()) {
            return None;
        }
        Some(Self {
            extname: (*extname).to_string(),
            server_version: (*server_version).to_string(),
            os_name: (*os_name).to_string(),
            os_version: (*os_version).to_string(),
            arch: (*arch).to_string(),
        })
    }

    /// Whether this archive was built for `server_version` on `platform`.
    pub fn matches(&self, server_version: &str, platform: &PlatformFingerprint) -> bool {
        let [os_name, os_version, arch] = platform.escaped_fields();
        self.server_version == server_version
            && self.os_name == os_name
            && self.os_version == os_version
            && self.arch == arch
    }
}
