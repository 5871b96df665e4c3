//! Console reporter
//!
//! Progress goes to stdout, warnings and errors to stderr.

use std::path::Path;

use crossterm::style::Stylize;
use pginstall_core::Reporter;
use pginstall_core::io::extract::ExtractWarning;

use super::theme::Theme;

/// Prints install progress to the terminal.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    theme: Theme,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only print warnings and errors.
    pub fn quiet() -> Self {
        Self {
            theme: Theme::default(),
            quiet: true,
        }
    }

    fn file_name(archive: &Path) -> String {
        archive.file_name().map_or_else(
            || archive.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if !self.quiet {
            println!();
            println!("  {}", title.bold());
        }
    }

    fn extracting(&self, extname: &str, archive: &Path) {
        if !self.quiet {
            let nw = self.theme.name_width;
            println!(
                "  {} {} {}",
                self.theme.icons.active.with(self.theme.colors.secondary),
                format!("{extname:<nw$}").with(self.theme.colors.name),
                Self::file_name(archive).with(self.theme.colors.secondary),
            );
        }
    }

    fn entry_warning(&self, warning: &ExtractWarning) {
        eprintln!(
            "  {} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            warning
        );
    }

    fn installed(&self, extname: &str, _archive: &Path, entries: usize) {
        if !self.quiet {
            let nw = self.theme.name_width;
            println!(
                "  {} {} {}",
                self.theme.icons.success.with(self.theme.colors.success),
                format!("{extname:<nw$}").with(self.theme.colors.name),
                format!("{entries} files").with(self.theme.colors.secondary),
            );
        }
    }

    fn not_found(&self, extname: &str, archive: &Path) {
        if !self.quiet {
            let nw = self.theme.name_width;
            println!(
                "  {} {} {}",
                self.theme.icons.info.with(self.theme.colors.secondary),
                format!("{extname:<nw$}").with(self.theme.colors.name),
                format!("no archive {}, deferring", Self::file_name(archive))
                    .with(self.theme.colors.secondary),
            );
        }
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {msg}");
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!(
            "  {} {msg}",
            self.theme.icons.warning.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }
}
