use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use adl_cli::{
    cli::{Cli, Commands},
    commands,
};
use adl_config::ConfigLoader;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // RUST_LOG wins over every other level source
    let level = cli.level_filter(&config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "adl_cli={level},adl_codegen={level},adl_query={level},adl_config={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(backend = %config.backend, "configuration loaded");

    match cli.command {
        Commands::Compile { query, file, output } => {
            let source = commands::compile::QuerySource::from_args(query, file)?;
            commands::compile::execute(config, source, output)?
        }
        Commands::Parse { query, json } => commands::parse::execute(&query, json)?,
        Commands::Config(cmd) => commands::config::execute(&config, cmd)?,
    }

    Ok(())
}
