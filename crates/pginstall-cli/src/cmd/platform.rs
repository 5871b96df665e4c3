//! Platform command

use anyhow::{Context, Result};
use pginstall_core::query::platform_rows;

use crate::ui::Theme;

/// Print the platform row of this host
pub fn platform(json: bool) -> Result<()> {
    let rows = platform_rows().context("Failed to detect platform")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let lw = Theme::default().label_width;
    for row in &rows {
        println!("  {:<lw$}{}", "os_name", row.os_name);
        println!("  {:<lw$}{}", "os_version", row.os_version);
        println!("  {:<lw$}{}", "arch", row.arch);
    }
    Ok(())
}
