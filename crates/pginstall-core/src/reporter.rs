//! Reporter trait for dependency injection
//!
//! Lets the installer report progress without being coupled to a terminal.

use std::path::Path;

use crate::io::extract::ExtractWarning;

/// Receiver of user-facing install progress.
pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Installing").
    fn section(&self, title: &str);

    /// An archive is about to be unpacked.
    fn extracting(&self, extname: &str, archive: &Path);

    /// One entry could not be written, or was written partially.
    fn entry_warning(&self, warning: &ExtractWarning);

    /// An extension was installed from `archive`.
    fn installed(&self, extname: &str, archive: &Path, entries: usize);

    /// No readable archive exists for the extension.
    fn not_found(&self, extname: &str, archive: &Path);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn extracting(&self, extname: &str, archive: &Path) {
        (**self).extracting(extname, archive);
    }
    fn entry_warning(&self, warning: &ExtractWarning) {
        (**self).entry_warning(warning);
    }
    fn installed(&self, extname: &str, archive: &Path, entries: usize) {
        (**self).installed(extname, archive, entries);
    }
    fn not_found(&self, extname: &str, archive: &Path) {
        (**self).not_found(extname, archive);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g. testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn extracting(&self, _: &str, _: &Path) {}
    fn entry_warning(&self, _: &ExtractWarning) {}
    fn installed(&self, _: &str, _: &Path, _: usize) {}
    fn not_found(&self, _: &str, _: &Path) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
