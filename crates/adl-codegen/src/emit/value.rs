//! Values produced while walking the tree.

use adl_query::Expr;
use adl_types::{CppType, TerminalType};
use std::collections::HashMap;

/// Lambda parameters in scope
pub type Env = HashMap<String, Value>;

/// What an expression evaluates to at a point in the generated code
#[derive(Debug, Clone)]
pub enum Value {
    /// The current event
    Event,
    /// A C++ expression of known type
    Scalar { code: String, ty: CppType },
    Tuple(Vec<Value>),
    Dict(Vec<(String, Value)>),
    /// A sequence not yet looped over, with the scope it was written in
    Seq { expr: Expr, env: Env },
}

impl Value {
    pub fn scalar(code: impl Into<String>, ty: impl Into<CppType>) -> Self {
        Self::Scalar {
            code: code.into(),
            ty: ty.into(),
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Event => "the event".to_string(),
            Self::Scalar { ty, .. } => ty.to_string(),
            Self::Tuple(_) => "a tuple".to_string(),
            Self::Dict(_) => "a dictionary".to_string(),
            Self::Seq { expr, .. } => format!("the sequence {}", expr),
        }
    }

    /// True for anything that can be looped over
    pub fn is_sequence(&self) -> bool {
        match self {
            Self::Seq { .. } => true,
            Self::Scalar { ty, .. } => ty.is_collection(),
            _ => false,
        }
    }
}

const PRIMITIVES: &[&str] = &[
    "bool",
    "char",
    "short",
    "int",
    "unsigned int",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "size_t",
    "float",
    "double",
    "std::string",
];

/// Built-in value types; they have no methods to call
pub fn is_primitive(ty: &CppType) -> bool {
    !ty.is_collection() && ty.pointer_depth() == 0 && PRIMITIVES.contains(&ty.name())
}

fn rank(ty: &CppType) -> usize {
    match ty.name() {
        "bool" => 0,
        "char" | "short" | "int" => 1,
        "unsigned int" | "long" | "unsigned long" | "long long" | "unsigned long long"
        | "size_t" => 2,
        "float" => 3,
        "double" => 4,
        _ => 5,
    }
}

/// Type of an arithmetic result or of a variable assigned from both sides.
/// Anything non-numeric keeps the left type.
pub fn promote(left: &CppType, right: &CppType) -> CppType {
    if left == right {
        return left.clone();
    }
    let (l, r) = (rank(left), rank(right));
    if l == 5 || r == 5 {
        return left.clone();
    }
    // mixed bool arithmetic is int arithmetic in C++
    match l.max(r) {
        0 | 1 => TerminalType::new("int").into(),
        _ if l >= r => left.clone(),
        _ => right.clone(),
    }
}

/// A string as a C++ literal
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
