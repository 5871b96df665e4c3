//! Routing of archive entries to the control or extension tree.
//!
//! An extension archive holds one `<extname>.control` file, which belongs in
//! the control directory, and payload files named `<extname>/<path>`, which
//! belong under the extension directory. The test is a raw byte prefix
//! comparison against the control filename: any entry whose path merely
//! starts with those bytes (`pgcrypto.control_backup`, say) is routed to the
//! control directory as well.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pginstall_schema::control_filename;

/// Where one archive entry will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryPlan {
    /// Path as recorded in the archive.
    pub source_path: String,
    /// Control or extension directory the entry is routed to.
    pub root: PathBuf,
    /// Destination on disk: `<root>/<source_path>`.
    pub target_path: PathBuf,
    /// Whether the entry is routed to the control directory.
    pub is_control: bool,
}

/// Classifies archive entries of one extension.
#[derive(Debug, Clone)]
pub struct PathRemapper {
    control_filename: String,
    control_dir: PathBuf,
    extension_dir: PathBuf,
}

impl PathRemapper {
    /// Remapper for the archive of `extname`.
    pub fn new(
        extname: &str,
        control_dir: impl Into<PathBuf>,
        extension_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            control_filename: control_filename(extname),
            control_dir: control_dir.into(),
            extension_dir: extension_dir.into(),
        }
    }

    /// `<extname>.control`
    pub fn control_filename(&self) -> &str {
        &self.control_filename
    }

    /// Whether the first `len(control_filename)` bytes of `entry_path` are
    /// the control filename.
    pub fn is_control(&self, entry_path: &[u8]) -> bool {
        entry_path.starts_with(self.control_filename.as_bytes())
    }

    /// Destination root for `entry_path`.
    pub fn target_root(&self, entry_path: &[u8]) -> &Path {
        if self.is_control(entry_path) {
            &self.control_dir
        } else {
            &self.extension_dir
        }
    }

    /// Plan the destination of an entry given its raw archive path.
    pub fn plan(&self, entry_path: &[u8]) -> ArchiveEntryPlan {
        let source_path = String::from_utf8_lossy(entry_path).into_owned();
        let is_control = self.is_control(entry_path);
        let root = self.target_root(entry_path).to_path_buf();
        let target_path = join_verbatim(&root, &source_path);
        ArchiveEntryPlan {
            source_path,
            root,
            target_path,
            is_control,
        }
    }
}

/// `root + "/" + entry_path`, without any normalisation of `entry_path`.
fn join_verbatim(root: &Path, entry_path: &str) -> PathBuf {
    let mut joined = OsString::from(root.as_os_str());
    joined.push("/");
    joined.push(entry_path);
    PathBuf::from(joined)
}

/// String form of the routing rule.
///
/// ```
/// use pginstall_core::remap::compute_target;
///
/// assert_eq!(
///     compute_target("hstore.control", "hstore", "/ctl", "/ext"),
///     "/ctl/hstore.control"
/// );
/// assert_eq!(
///     compute_target("hstore/hstore.so", "hstore", "/ctl", "/ext"),
///     "/ext/hstore/hstore.so"
/// );
/// ```
pub fn compute_target(
    entry_path: &str,
    extname: &str,
    control_dir: &str,
    extension_dir: &str,
) -> String {
    let root = if entry_path
        .as_bytes()
        .starts_with(control_filename(extname).as_bytes())
    {
        control_dir
    } else {
        extension_dir
    };
    format!("{root}/{entry_path}")
}
