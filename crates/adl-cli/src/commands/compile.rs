//! `adlc compile`

use adl_codegen::{JsonWriter, TranslationArtifact, TranslationPipeline};
use adl_config::CompilerConfig;
use adl_query::parse_query;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the query text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    Text(String),
    /// A file, or stdin for `-`
    File(PathBuf),
}

impl QuerySource {
    pub fn from_args(query: Option<String>, file: Option<PathBuf>) -> Result<Self> {
        match (query, file) {
            (Some(text), None) => Ok(Self::Text(text)),
            (None, Some(path)) => Ok(Self::File(path)),
            (None, None) => bail!("no query given; pass --query or --file"),
            (Some(_), Some(_)) => bail!("--query and --file cannot be used together"),
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::File(path) if path == Path::new("-") => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read query from stdin")?;
                Ok(text)
            }
            Self::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read query file {}", path.display())),
        }
    }
}

/// Compile `text` and write the JSON document to `out`
pub fn compile_to<W: Write>(
    config: CompilerConfig,
    text: &str,
    out: W,
) -> Result<(TranslationArtifact, W)> {
    let pipeline = TranslationPipeline::new(config).context("Invalid compiler configuration")?;
    let query = parse_query(text).context("Failed to parse query")?;
    let mut writer = JsonWriter::new(out);
    let artifact = pipeline
        .translate(query, &mut writer)
        .with_context(|| format!("Failed to compile query for the {} backend", pipeline.config().backend))?;
    Ok((artifact, writer.into_inner()))
}

/// Execute compile subcommand
pub fn execute(config: CompilerConfig, source: QuerySource, output: Option<PathBuf>) -> Result<()> {
    let text = source.read()?;
    debug!(backend = %config.backend, chars = text.len(), "compiling query");

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let (_, mut out) = compile_to(config, &text, BufWriter::new(file))?;
            out.flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let (_, mut out) = compile_to(config, &text, io::stdout().lock())?;
            out.flush().context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
