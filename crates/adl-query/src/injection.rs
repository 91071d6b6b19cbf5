//! Injected backend code carried in the tree.
//!
//! The rewrite pass replaces a callee with an [`InjectionNode`]; the emitter
//! later renders its [`CodeTemplate`]s once the argument values are known.

use crate::ast::Expr;
use adl_types::CppType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A run of identifier characters. Whole runs are matched against slot
/// names, so `result` never matches inside `my_result` or `result2`.
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").unwrap());

/// Hint used when declaring the variable an injection writes into
pub const RESULT_HINT: &str = "r";

/// A piece of a compiled template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Slot(String),
}

/// A line of C++ with named slots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeTemplate {
    segments: Vec<Segment>,
}

impl CodeTemplate {
    /// Compile `line`, turning every identifier token equal to one of
    /// `slots` into a slot
    pub fn compile<S: AsRef<str>>(line: &str, slots: &[S]) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        for word in WORD_RE.find_iter(line) {
            if slots.iter().any(|s| s.as_ref() == word.as_str()) {
                text.push_str(&line[last..word.start()]);
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Slot(word.as_str().to_string()));
                last = word.end();
            }
        }
        text.push_str(&line[last..]);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self { segments }
    }

    /// Fill slots from `bindings`. The first binding for a name wins; an
    /// unbound slot renders as its own name.
    pub fn render(&self, bindings: &[(String, String)]) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Slot(name) => bindings
                    .iter()
                    .find(|(slot, _)| slot == name)
                    .map_or(name.as_str(), |(_, value)| value.as_str()),
            })
            .collect()
    }

    /// Slot names in order of appearance
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for CodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(text)?,
                Segment::Slot(name) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

/// The object a method-style injection was called on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverBinding {
    /// Slot name the receiver fills
    pub placeholder: String,
    /// The receiver expression, still unevaluated
    pub value: Expr,
}

/// Anything that can hand out a fresh variable in the current scope
pub trait DeclareVariable {
    /// Declare a variable of type `ty` and return its name
    fn declare_variable(&mut self, hint: &str, ty: &CppType) -> String;
}

/// One call site of injected code.
///
/// Built by the rewrite pass from an injection spec, consumed once by the
/// emitter. Template substitution is deferred until the emitter has resolved
/// the call's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionNode {
    pub name: String,
    pub include_files: Vec<String>,
    pub link_libraries: Vec<String>,
    /// Lines for the algorithm's initialize step, emitted verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_code: Vec<String>,
    pub running_code: Vec<CodeTemplate>,
    pub formal_params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<ReceiverBinding>,
    pub result_placeholder: CodeTemplate,
    pub result_type: CppType,
}

impl InjectionNode {
    /// Ask `sink` for the variable this call's result is written into
    pub fn declare_result(&self, sink: &mut dyn DeclareVariable) -> String {
        sink.declare_variable(RESULT_HINT, &self.result_type)
    }
}
