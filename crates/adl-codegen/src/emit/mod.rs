//! C++ emission.
//!
//! The pipeline hands the validated tree to an [`EmissionVisitor`]. The
//! built-in one is [`LoopEmitter`], which writes one nested loop per
//! sequence and fills an ntuple row at the innermost point.

mod buffer;
mod dialect;
mod loop_emitter;
mod value;

pub use buffer::{LineBuffer, Reserved};
pub use dialect::NtupleDialect;
pub use loop_emitter::LoopEmitter;
pub use value::{is_primitive, promote, string_literal, Env, Value};

use crate::error::CodegenResult;
use adl_query::Expr;
use adl_types::TypeRegistry;
use serde::{Deserialize, Serialize};

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// C++ type of the branch
    pub cpp_type: String,
}

/// Where the result goes and what it looks like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDescriptor {
    /// `ResultTTree`, `ResultAwkwardArray` or `ResultParquet`
    pub format: String,
    pub tree_name: String,
    pub file_name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Everything an emitter produced for one query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Emission {
    pub result: Option<ResultDescriptor>,
    /// Member declarations of the generated class
    pub class_decl: Vec<String>,
    /// Per-event code
    pub query_lines: Vec<String>,
    /// Output tree creation, run once
    pub book_lines: Vec<String>,
    /// Lines for the initialize step
    pub init_lines: Vec<String>,
    pub include_files: Vec<String>,
    pub link_libraries: Vec<String>,
}

/// Turns a validated tree into C++
pub trait EmissionVisitor {
    /// Emit code for `tree`, looking method types up in `registry`
    fn emit(&mut self, tree: &Expr, registry: &TypeRegistry) -> CodegenResult<Emission>;
}

/// Append `item` unless already present
pub(crate) fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
