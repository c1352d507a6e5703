//! Config command

use anyhow::{Context, Result};
use camino::Utf8Path;
use crashloop_core::{ConfigLoader, RestartConfig};

use crate::cli::{ConfigCommands, ConfigShowArgs};

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config_path),
    }
}

fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let loader = ConfigLoader::new()?;
    println!("{}", resolve(&loader, config_path, args.json)?);
    Ok(())
}

/// Load the effective configuration and render it for display
fn resolve(loader: &ConfigLoader, config_path: Option<&Utf8Path>, json: bool) -> Result<String> {
    let config = loader
        .load_with_file(config_path)
        .context("Failed to load configuration")?;
    render(&config, json)
}

fn render(config: &RestartConfig, json: bool) -> Result<String> {
    let rendered = if json {
        serde_json::to_string_pretty(config)?
    } else {
        serde_yaml_ng::to_string(config)?
    };
    Ok(rendered)
}
