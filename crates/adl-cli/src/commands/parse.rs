//! `adlc parse`

use adl_query::{extract_metadata, normalize, parse_query, Expr};
use anyhow::{Context, Result};

/// Parse, strip `MetaData` blocks and normalize
pub fn normalized(text: &str) -> Result<(Expr, usize)> {
    let query = parse_query(text).context("Failed to parse query")?;
    let (query, blocks) = extract_metadata(query).context("Failed to read MetaData blocks")?;
    let query = normalize(query).context("Failed to normalize query")?;
    Ok((query, blocks.len()))
}

/// Execute parse subcommand
pub fn execute(text: &str, json: bool) -> Result<()> {
    let (query, blocks) = normalized(text)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&query)?);
    } else {
        println!("{}", query);
    }
    if blocks > 0 {
        eprintln!("({} MetaData block(s) removed)", blocks);
    }
    Ok(())
}
