//! Available command

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use pginstall_core::InstallerConfig;
use pginstall_core::query::available_extension_rows_for;

use crate::PlatformArgs;
use crate::ui::Theme;

/// List the merged catalog
pub fn available(config: &InstallerConfig, platform: &PlatformArgs, json: bool) -> Result<()> {
    let platform = platform.resolve().context("Failed to detect platform")?;
    let rows = available_extension_rows_for(config, &platform)
        .context("Failed to list available extensions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("  {}", "No extensions available".dark_grey());
        return Ok(());
    }

    let theme = Theme::default();
    let nw = theme.name_width;
    for row in &rows {
        let label = row.fullname.as_deref().or(row.description.as_deref()).unwrap_or("");
        println!(
            "  {} {}",
            format!("{:<nw$}", row.shortname).with(theme.colors.name),
            label
        );
        println!(
            "  {:<nw$} {}",
            "",
            row.uri.as_str().with(theme.colors.secondary)
        );
    }
    println!();
    println!("  {}", format!("{} extensions", rows.len()).dark_grey());
    Ok(())
}
