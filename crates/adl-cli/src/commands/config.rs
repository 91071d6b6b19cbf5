use adl_config::{CompilerConfig, ConfigLoader};
use anyhow::{Context, Result};

use crate::cli::ConfigCommands;

/// Execute config subcommand
pub fn execute(config: &CompilerConfig, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { format } => {
            println!("{}", render(config, &format)?);
        }
        ConfigCommands::Path => {
            println!("{}", ConfigLoader::default_path().display());
        }
    }
    Ok(())
}

/// The effective configuration as `toml` or `json`
pub fn render(config: &CompilerConfig, format: &str) -> Result<String> {
    match format {
        "json" => serde_json::to_string_pretty(config).context("Failed to render config as JSON"),
        _ => toml::to_string_pretty(config).context("Failed to render config as TOML"),
    }
}
