//! Filename command

use anyhow::{Context, Result};
use pginstall_schema::{ArchiveDescriptor, resolve};

use crate::PlatformArgs;

/// Print the archive filename of `extname` for the configured server version
pub fn filename(
    extname: &str,
    server_version: &str,
    platform: &PlatformArgs,
    json: bool,
) -> Result<()> {
    let platform = platform.resolve().context("Failed to detect platform")?;
    let descriptor = ArchiveDescriptor::new(extname, server_version, platform);
    let name = resolve(&descriptor);

    if json {
        println!("{}", serde_json::json!({ "filename": name }));
    } else {
        println!("{name}");
    }
    Ok(())
}
