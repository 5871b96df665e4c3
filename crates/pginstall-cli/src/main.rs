//! pginstall - binary extension archive installer

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pginstall_cli::{Cli, Commands, cmd};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match &cli.command {
        Commands::Platform => cmd::platform::platform(json),
        Commands::Available { platform } => {
            let config = cli.installer_config()?;
            cmd::available::available(&config, platform, json)
        }
        Commands::Filename { extname, platform } => {
            let config = cli.installer_config()?;
            let server_version = config.server_version()?;
            cmd::filename::filename(extname, server_version, platform, json)
        }
        Commands::Install {
            extname,
            mirror,
            platform,
        } => {
            let config = cli.installer_config()?;
            let server_version = config.server_version()?.to_string();
            cmd::install::install(
                config,
                extname,
                &server_version,
                mirror.as_deref(),
                platform,
                json,
            )
        }
    }
}
