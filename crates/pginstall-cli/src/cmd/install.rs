//! Install command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use pginstall_core::fetch::MirrorFetcher;
use pginstall_core::{InstallOutcome, Installer, InstallerConfig, Reporter};

use crate::PlatformArgs;
use crate::ui::ConsoleReporter;

/// Install `extname` for `server_version`.
///
/// A missing archive is not a failure: the request is deferred to whatever
/// else may provide the extension.
pub fn install(
    config: InstallerConfig,
    extname: &str,
    server_version: &str,
    mirror: Option<&Path>,
    platform: &PlatformArgs,
    json: bool,
) -> Result<()> {
    let platform = platform.resolve().context("Failed to detect platform")?;
    tracing::debug!("Installing {extname} for server {server_version} on {platform}");

    let reporter: Arc<dyn Reporter> = if json {
        Arc::new(ConsoleReporter::quiet())
    } else {
        Arc::new(ConsoleReporter::new())
    };

    let mut installer = Installer::new(config).with_reporter(reporter.clone());
    if let Some(dir) = mirror {
        installer = installer.with_fetcher(MirrorFetcher::new(dir));
    }

    let outcome = match installer.install_for(extname, server_version, &platform) {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.error(&format!("{extname} failed ({})", e.kind()));
            return Err(e).with_context(|| format!("Failed to install {extname}"));
        }
    };

    if json {
        println!("{}", outcome_json(&outcome));
    }
    Ok(())
}

fn outcome_json(outcome: &InstallOutcome) -> serde_json::Value {
    match outcome {
        InstallOutcome::Installed {
            extname,
            archive,
            control_file,
            report,
        } => serde_json::json!({
            "status": "installed",
            "extname": extname,
            "archive": archive,
            "control_file": control_file,
            "entries": report.entries.len(),
            "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }),
        InstallOutcome::NotFound { extname, archive } => serde_json::json!({
            "status": "not_found",
            "extname": extname,
            "archive": archive,
        }),
    }
}
