use adl_config::BackendKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages, one per pipeline stage
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "adlc")]
#[command(about = "adlc - compile functional event-data queries to ATLAS xAOD or CMS AOD C++")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/adlc/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend to compile for (overrides config file and ADLC_BACKEND)
    #[arg(short, long, global = true)]
    pub backend: Option<BackendKind>,
}

impl Cli {
    /// The level to log at: `--verbose`, then `--log-level`, then config
    pub fn level_filter(&self, configured: &str) -> LevelFilter {
        if self.verbose {
            return LevelFilter::DEBUG;
        }
        match self.log_level {
            Some(level) => level.into(),
            None => configured.parse().unwrap_or(LevelFilter::WARN),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile one query and print the translation artifact as JSON
    Compile {
        /// Query text
        #[arg(short, long, conflicts_with = "file")]
        query: Option<String>,

        /// Read the query from a file ('-' for stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Write the JSON document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the parsed and normalized query tree without generating code
    Parse {
        /// Query text
        query: String,

        /// Print the tree as JSON instead of query syntax
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output format (toml, json)
        #[arg(short, long, default_value = "toml")]
        format: String,
    },

    /// Print the default config file path
    Path,
}
