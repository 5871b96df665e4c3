//! Control file relocation.
//!
//! Archives are built for the server's default layout. Once the payload lands
//! under `<extension_dir>/<extname>`, the control file must point there.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

const LIBDIR_PREFIX: &str = "$libdir/";

/// Errors raised while relocating a control file.
#[derive(Error, Debug)]
pub enum RelocateError {
    /// The control file could not be read.
    #[error("Failed to read control file {}: {source}", path.display())]
    Read {
        /// Control file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The rewritten control file could not be saved.
    #[error("Failed to write control file {}: {source}", path.display())]
    Write {
        /// Control file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Adjusts an installed control file to the installed location.
pub trait ControlRelocator: Send + Sync {
    /// Relocate `control_file`, the control file of `extname`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    fn relocate(&self, extname: &str, control_file: &Path) -> Result<(), RelocateError>;
}

/// Rewrites `directory` and `module_pathname` to the extension tree.
#[derive(Debug, Clone)]
pub struct ControlFileRewriter {
    extension_dir: PathBuf,
}

impl ControlFileRewriter {
    /// Rewriter for payloads installed under `extension_dir`.
    pub fn new(extension_dir: impl Into<PathBuf>) -> Self {
        Self {
            extension_dir: extension_dir.into(),
        }
    }

    /// Rewrite the contents of the control file of `extname`.
    ///
    /// Sets `directory` (appending it when absent) and maps `module_pathname`
    /// values under `$libdir/` into the extension tree. Other lines are kept
    /// verbatim.
    ///
    /// ```
    /// use pginstall_core::control::ControlFileRewriter;
    ///
    /// let rewriter = ControlFileRewriter::new("/srv/ext");
    /// let out = rewriter.rewrite("hstore", "module_pathname = '$libdir/hstore'\n");
    /// assert_eq!(
    ///     out,
    ///     "module_pathname = '/srv/ext/hstore/hstore'\ndirectory = '/srv/ext/hstore'\n"
    /// );
    /// ```
    pub fn rewrite(&self, extname: &str, contents: &str) -> String {
        let install_dir = self.extension_dir.join(extname);
        let install_dir = install_dir.to_string_lossy();

        let mut out = String::with_capacity(contents.len() + install_dir.len() + 16);
        let mut has_directory = false;

        for line in contents.lines() {
            match key_of(line) {
                Some("directory") => {
                    has_directory = true;
                    out.push_str(&format!("directory = '{install_dir}'"));
                }
                Some("module_pathname") => {
                    out.push_str(&relocate_module_pathname(line, &install_dir));
                }
                _ => out.push_str(line),
            }
            out.push('\n');
        }

        if !has_directory {
            out.push_str(&format!("directory = '{install_dir}'\n"));
        }
        out
    }
}

impl ControlRelocator for ControlFileRewriter {
    fn relocate(&self, extname: &str, control_file: &Path) -> Result<(), RelocateError> {
        let contents = fs::read_to_string(control_file).map_err(|source| RelocateError::Read {
            path: control_file.to_path_buf(),
            source,
        })?;
        let rewritten = self.rewrite(extname, &contents);
        if rewritten == contents {
            return Ok(());
        }

        let write_error = |source| RelocateError::Write {
            path: control_file.to_path_buf(),
            source,
        };
        let dir = control_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
        temp.write_all(rewritten.as_bytes()).map_err(write_error)?;
        temp.persist(control_file)
            .map_err(|e| write_error(e.error))?;

        tracing::debug!("Relocated {}", control_file.display());
        Ok(())
    }
}

/// Key of a `key = value` control file line, ignoring comments.
fn key_of(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let (key, _) = trimmed.split_once('=')?;
    Some(key.trim())
}

fn relocate_module_pathname(line: &str, install_dir: &str) -> String {
    let Some((key, value)) = line.split_once('=') else {
        return line.to_string();
    };
    let value = value.trim();
    let quote = if value.starts_with('"') { '"' } else { '\'' };
    let inner = value.trim_matches(|c| c == '\'' || c == '"');
    match inner.strip_prefix(LIBDIR_PREFIX) {
        Some(module) => format!("{key}= {quote}{install_dir}/{module}{quote}"),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rewrite_replaces_directory() {
        let rewriter = ControlFileRewriter::new("/srv/ext");
        let input = "# pgcrypto extension\ncomment = 'cryptographic functions'\ndefault_version = '1.3'\ndirectory = 'pgcrypto'\nrelocatable = true\n";
        let out = rewriter.rewrite("pgcrypto", input);
        assert_eq!(
            out,
            "# pgcrypto extension\ncomment = 'cryptographic functions'\ndefault_version = '1.3'\ndirectory = '/srv/ext/pgcrypto'\nrelocatable = true\n"
        );
    }

    #[test]
    fn test_rewrite_leaves_absolute_module_path() {
        let rewriter = ControlFileRewriter::new("/srv/ext");
        let out = rewriter.rewrite("x", "module_pathname = '/opt/lib/x'\ndirectory = 'x'\n");
        assert_eq!(
            out,
            "module_pathname = '/opt/lib/x'\ndirectory = '/srv/ext/x'\n"
        );
    }

    #[test]
    fn test_commented_directory_is_not_a_key() {
        let rewriter = ControlFileRewriter::new("/e");
        let out = rewriter.rewrite("x", "# directory = 'old'\n");
        assert_eq!(out, "# directory = 'old'\ndirectory = '/e/x'\n");
    }

    #[test]
    fn test_relocate_in_place() {
        let dir = tempdir().unwrap();
        let control = dir.path().join("hstore.control");
        std::fs::write(&control, "module_pathname = '$libdir/hstore'\n").unwrap();

        let rewriter = ControlFileRewriter::new(dir.path().join("ext"));
        rewriter.relocate("hstore", &control).unwrap();

        let contents = std::fs::read_to_string(&control).unwrap();
        assert!(contents.contains(&format!(
            "directory = '{}'",
            dir.path().join("ext/hstore").display()
        )));
        assert!(!contents.contains("$libdir"));

        // Relocating twice is stable.
        rewriter.relocate("hstore", &control).unwrap();
        assert_eq!(std::fs::read_to_string(&control).unwrap(), contents);
    }

    #[test]
    fn test_relocate_missing_file() {
        let dir = tempdir().unwrap();
        let err = ControlFileRewriter::new("/e")
            .relocate("x", &dir.path().join("x.control"))
            .unwrap_err();
        assert!(matches!(err, RelocateError::Read { .. }));
    }
}
