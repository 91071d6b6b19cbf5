//! Terminal and collection types.

use crate::error::{TypeError, TypeResult};
use crate::parsed::{parse_type, ParsedTypeInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A type the generator cannot see inside: `double`, `xAOD::Jet*`, etc.
///
/// The optional spelling overrides how the type is written in C++ without
/// changing its logical pointer depth. A CMS `edm::Handle<T>` behaves like a
/// `T*` (it is followed with `->`) but has to be declared as a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalType {
    info: ParsedTypeInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spelling: Option<String>,
}

impl TerminalType {
    /// A non-pointer, non-const type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ParsedTypeInfo::new(name, 0, false),
            spelling: None,
        }
    }

    /// A type from C++ text such as `const xAOD::Jet*`
    pub fn parse(text: &str) -> Self {
        Self::from(parse_type(text))
    }

    /// Set the pointer depth
    pub fn with_pointer_depth(mut self, depth: usize) -> Self {
        self.info.pointer_depth = depth;
        self
    }

    /// Set the const marker
    pub fn with_const(mut self, is_const: bool) -> Self {
        self.info.is_const = is_const;
        self
    }

    /// Override the C++ spelling
    pub fn spelled(mut self, spelling: impl Into<String>) -> Self {
        self.spelling = Some(spelling.into());
        self
    }

    /// Base type name, without qualifiers or pointers
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Levels of indirection to reach the named type
    pub fn pointer_depth(&self) -> usize {
        self.info.pointer_depth
    }

    /// True if at least one dereference is possible
    pub fn is_pointer(&self) -> bool {
        self.info.pointer_depth > 0
    }

    /// True if declared const
    pub fn is_const(&self) -> bool {
        self.info.is_const
    }

    /// The parsed parts of this type
    pub fn info(&self) -> &ParsedTypeInfo {
        &self.info
    }

    /// Explicit spelling override, if any
    pub fn spelling(&self) -> Option<&str> {
        self.spelling.as_deref()
    }

    /// The type after one dereference. The spelling override does not
    /// survive: dereferencing a handle yields the plain object.
    pub fn dereference(&self) -> TypeResult<Self> {
        if self.info.pointer_depth == 0 {
            return Err(TypeError::cannot_dereference(self.to_string()));
        }
        let mut info = self.info.clone();
        info.pointer_depth -= 1;
        Ok(Self {
            info,
            spelling: None,
        })
    }
}

impl From<ParsedTypeInfo> for TerminalType {
    fn from(info: ParsedTypeInfo) -> Self {
        Self {
            info,
            spelling: None,
        }
    }
}

impl fmt::Display for TerminalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.spelling {
            Some(spelling) => f.write_str(spelling),
            None => fmt::Display::fmt(&self.info, f),
        }
    }
}

/// A container type with a known element type.
///
/// Container and element pointer-ness are independent: the ATLAS backend
/// hands out `const xAOD::JetContainer*` holding `const xAOD::Jet*`, while a
/// `std::vector<double>` returned by value holds plain doubles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionType {
    container: TerminalType,
    element: Box<CppType>,
}

impl CollectionType {
    /// A container with an explicit container type
    pub fn new(container: TerminalType, element: impl Into<CppType>) -> Self {
        Self {
            container,
            element: Box::new(element.into()),
        }
    }

    /// `std::vector<element>`, held by value
    pub fn vector_of(element: impl Into<CppType>) -> Self {
        let element = element.into();
        let container = TerminalType::new(format!("std::vector<{}>", element));
        Self::new(container, element)
    }

    /// The container type
    pub fn container(&self) -> &TerminalType {
        &self.container
    }

    /// The type of each element
    pub fn element_type(&self) -> &CppType {
        &self.element
    }

    /// Dereference the container; the element type is unchanged
    pub fn dereference(&self) -> TypeResult<Self> {
        Ok(Self {
            container: self.container.dereference()?,
            element: self.element.clone(),
        })
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.container, f)
    }
}

/// Any type the generator tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CppType {
    /// Opaque value
    Terminal(TerminalType),
    /// Iterable container
    Collection(CollectionType),
}

impl CppType {
    /// A terminal type from C++ text
    pub fn parse(text: &str) -> Self {
        Self::Terminal(TerminalType::parse(text))
    }

    /// The outermost terminal (the container, for collections)
    pub fn terminal(&self) -> &TerminalType {
        match self {
            Self::Terminal(t) => t,
            Self::Collection(c) => c.container(),
        }
    }

    /// Base name used for method lookup
    pub fn name(&self) -> &str {
        self.terminal().name()
    }

    /// Pointer depth of the outermost terminal
    pub fn pointer_depth(&self) -> usize {
        self.terminal().pointer_depth()
    }

    /// True if the outermost terminal is a pointer
    pub fn is_pointer(&self) -> bool {
        self.terminal().is_pointer()
    }

    /// True for collections
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Element type for collections
    pub fn element_type(&self) -> Option<&CppType> {
        match self {
            Self::Terminal(_) => None,
            Self::Collection(c) => Some(c.element_type()),
        }
    }

    /// Dereference once
    pub fn dereference(&self) -> TypeResult<Self> {
        match self {
            Self::Terminal(t) => t.dereference().map(Self::Terminal),
            Self::Collection(c) => c.dereference().map(Self::Collection),
        }
    }
}

impl From<TerminalType> for CppType {
    fn from(t: TerminalType) -> Self {
        Self::Terminal(t)
    }
}

impl From<CollectionType> for CppType {
    fn from(c: CollectionType) -> Self {
        Self::Collection(c)
    }
}

impl fmt::Display for CppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(t) => fmt::Display::fmt(t, f),
            Self::Collection(c) => fmt::Display::fmt(c, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dereference_depth_zero_fails() {
        let t = TerminalType::new("double");
        let err = t.dereference().unwrap_err();
        assert_eq!(err, TypeError::cannot_dereference("double"));
        assert!(err.to_string().contains("Cannot dereference type double"));
    }

    #[test]
    fn test_dereference_reduces_depth() {
        let t = TerminalType::parse("const Foo**");
        let once = t.dereference().unwrap();
        assert_eq!(once.pointer_depth(), 1);
        assert_eq!(once.to_string(), "const Foo*");
        let twice = once.dereference().unwrap();
        assert_eq!(twice.pointer_depth(), 0);
        assert!(twice.dereference().is_err());
    }

    #[test]
    fn test_spelling_survives_display_not_dereference() {
        let handle = TerminalType::new("reco::TrackCollection")
            .with_pointer_depth(1)
            .spelled("edm::Handle<reco::TrackCollection>");
        assert_eq!(handle.to_string(), "edm::Handle<reco::TrackCollection>");
        assert_eq!(handle.dereference().unwrap().to_string(), "reco::TrackCollection");
    }

    #[test]
    fn test_collection_independent_pointers() {
        let coll = CollectionType::new(
            TerminalType::parse("const xAOD::JetContainer*"),
            TerminalType::parse("const xAOD::Jet*"),
        );
        assert_eq!(coll.to_string(), "const xAOD::JetContainer*");
        assert_eq!(coll.element_type().pointer_depth(), 1);

        let deref = coll.dereference().unwrap();
        assert_eq!(deref.container().pointer_depth(), 0);
        assert_eq!(deref.element_type().pointer_depth(), 1);
    }

    #[test]
    fn test_vector_of() {
        let v = CppType::from(CollectionType::vector_of(TerminalType::new("double")));
        assert_eq!(v.to_string(), "std::vector<double>");
        assert_eq!(v.name(), "std::vector<double>");
        assert_eq!(v.element_type().map(|e| e.name()), Some("double"));
        assert!(!v.is_pointer());
    }

    #[test]
    fn test_cpp_type_serde_roundtrip() {
        let t = CppType::from(CollectionType::vector_of(TerminalType::parse("myobj**")));
        let json = serde_json::to_string(&t).unwrap();
        let back: CppType = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
