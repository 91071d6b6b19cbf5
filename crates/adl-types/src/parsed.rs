//! Parsing of C++ type text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A type name split into its base name, pointer depth and const marker.
///
/// `const Foo**` parses to `{name: "Foo", pointer_depth: 2, is_const: true}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedTypeInfo {
    /// Base type name (`int`, `std::vector<float>`, `xAOD::Jet`)
    pub name: String,
    /// Number of trailing `*` (2 for `int**`)
    pub pointer_depth: usize,
    /// True if the type text started with `const `
    #[serde(default)]
    pub is_const: bool,
}

impl ParsedTypeInfo {
    /// Build from parts
    pub fn new(name: impl Into<String>, pointer_depth: usize, is_const: bool) -> Self {
        Self {
            name: name.into(),
            pointer_depth,
            is_const,
        }
    }
}

impl fmt::Display for ParsedTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        write!(f, "{}{}", self.name, "*".repeat(self.pointer_depth))
    }
}

/// Split type text into name, pointer depth and const marker.
///
/// Trailing `*` are stripped first (whitespace between them is tolerated),
/// then a leading `const `. Nothing else is validated: `const Foo* const*`
/// comes back with the inner qualifier left in the name.
pub fn parse_type(text: &str) -> ParsedTypeInfo {
    let mut rest = text.trim();
    let mut pointer_depth = 0;
    while let Some(stripped) = rest.strip_suffix('*') {
        pointer_depth += 1;
        rest = stripped.trim_end();
    }

    let (is_const, name) = match rest.strip_prefix("const ") {
        Some(stripped) => (true, stripped.trim_start()),
        None => (false, rest),
    };

    ParsedTypeInfo::new(name, pointer_depth, is_const)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("int", "int", 0, false ; "plain")]
    #[test_case("float*", "float", 1, false ; "single pointer")]
    #[test_case("const Foo**", "Foo", 2, true ; "const double pointer")]
    #[test_case("xAOD::Jet * *", "xAOD::Jet", 2, false ; "spaced stars")]
    #[test_case("std::vector<float>", "std::vector<float>", 0, false ; "template")]
    #[test_case("  const   double  ", "double", 0, true ; "padding")]
    fn test_parse_type(text: &str, name: &str, depth: usize, is_const: bool) {
        let info = parse_type(text);
        assert_eq!(info.name, name);
        assert_eq!(info.pointer_depth, depth);
        assert_eq!(info.is_const, is_const);
    }

    #[test]
    fn test_display_reproduces_text() {
        assert_eq!(parse_type("const Foo**").to_string(), "const Foo**");
        assert_eq!(parse_type("int").to_string(), "int");
    }

    #[test]
    fn test_malformed_qualifiers_are_not_inspected() {
        let info = parse_type("const Foo* const*");
        assert_eq!(info.pointer_depth, 1);
        assert_eq!(info.name, "Foo* const");
        assert!(info.is_const);
    }
}
