//! Event collection catalogs.
//!
//! Each backend knows which collections an event offers, how to spell their
//! C++ types, how to fetch one from the event store, and which method return
//! types to seed the registry with. Collection accessors are exposed to the
//! query as injected calls: `e.Jets("AntiKt4EMTopoJets")`.

mod atlas;
mod cms;

pub use atlas::AtlasBackend;
pub use cms::CmsBackend;

use crate::directive::CollectionInfo;
use crate::emit::NtupleDialect;
use crate::error::{CodegenError, CodegenResult};
use crate::inject::{build_injection, CallRewriter, CodeInjectionSpec, RewriterMap};
use adl_config::BackendKind;
use adl_query::{Call, Expr};
use adl_types::{CppType, TerminalType, TypeRegistry};
use std::sync::Arc;
use tracing::debug;

/// Placeholder the fetch code reads the collection key from
pub const COLLECTION_KEY: &str = "collection_name";

/// One collection an event offers
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
    /// Name the query calls it by, e.g. `Jets`
    pub accessor_name: String,
    pub experiment: String,
    pub include_files: Vec<String>,
    /// Type of the fetched object; a collection type if iterable
    pub container_type: CppType,
    pub link_libraries: Vec<String>,
    /// Key used when the accessor is called with no arguments
    pub default_key: Option<String>,
}

impl CollectionEntry {
    /// Entry for an event collection directive
    pub fn from_info(info: &CollectionInfo, backend: &dyn Backend) -> CodegenResult<Self> {
        let container_type = match (info.contains_collection, &info.element_type) {
            (true, Some(element)) => backend.collection_type(
                &info.container_type,
                Some((element.as_str(), info.element_pointer)),
            ),
            (true, None) => {
                return Err(CodegenError::malformed(
                    "add_event_collection_info",
                    format!("{} contains a collection but has no element_type", info.name),
                ))
            }
            (false, _) => backend.collection_type(&info.container_type, None),
        };
        Ok(Self {
            accessor_name: info.name.clone(),
            experiment: info
                .experiment
                .clone()
                .unwrap_or_else(|| backend.experiment().to_string()),
            include_files: info.include_files.clone(),
            container_type,
            link_libraries: info.link_libraries.clone(),
            default_key: None,
        })
    }
}

/// What a target framework contributes to code generation
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Experiment tag directives are checked against
    fn experiment(&self) -> &'static str {
        self.kind().experiment()
    }

    /// Built-in collections
    fn collections(&self) -> &[CollectionEntry];

    /// The fetched type for `container`; `element` is the element type name
    /// and whether iteration yields pointers
    fn collection_type(&self, container: &str, element: Option<(&str, bool)>) -> CppType;

    /// Lines that load a collection into `result`, keyed by `collection_name`
    fn fetch_code(&self, container: &CppType) -> Vec<String>;

    /// Register the built-in method return types
    fn seed_types(&self, registry: &mut TypeRegistry);

    fn ntuple_dialect(&self) -> NtupleDialect;
}

/// The backend for `kind`
pub fn backend_for(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::Atlas => Box::new(AtlasBackend),
        BackendKind::Cms => Box::new(CmsBackend),
    }
}

/// Element type of a built-in or declared collection
pub(crate) fn element_type(text: &str, is_pointer: bool) -> TerminalType {
    let element = TerminalType::parse(text);
    if is_pointer && !element.is_pointer() {
        element.with_pointer_depth(1)
    } else {
        element
    }
}

/// Rewrites calls to one collection accessor
#[derive(Debug, Clone)]
pub struct CollectionAccessor {
    entry: CollectionEntry,
    spec: CodeInjectionSpec,
}

impl CollectionAccessor {
    pub fn new(entry: CollectionEntry, backend: &dyn Backend) -> Self {
        let spec = CodeInjectionSpec {
            include_files: entry.include_files.clone(),
            link_libraries: entry.link_libraries.clone(),
            formal_params: vec![COLLECTION_KEY.to_string()],
            running_code: backend.fetch_code(&entry.container_type),
            ..CodeInjectionSpec::new(&entry.accessor_name, entry.container_type.clone())
        };
        Self { entry, spec }
    }

    pub fn entry(&self) -> &CollectionEntry {
        &self.entry
    }
}

impl CallRewriter for CollectionAccessor {
    fn rewrite(&self, mut call: Call) -> CodegenResult<Expr> {
        let name = &self.entry.accessor_name;
        match call.args.len() {
            0 => match &self.entry.default_key {
                Some(key) => {
                    debug!(collection = %name, %key, "using default collection key");
                    call.args.push(Expr::string(key));
                }
                None => {
                    return Err(CodegenError::CollectionArity {
                        name: name.clone(),
                        found: 0,
                    })
                }
            },
            1 if call.args[0].as_str().is_none() => {
                return Err(CodegenError::CollectionKeyType {
                    name: name.clone(),
                    found: call.args[0].to_string(),
                })
            }
            1 => {}
            found => {
                return Err(CodegenError::CollectionArity {
                    name: name.clone(),
                    found,
                })
            }
        }
        build_injection(&self.spec, call)
    }
}

/// Add an accessor for `entry`, replacing any accessor of the same name
pub fn register_collection(map: &mut RewriterMap, entry: CollectionEntry, backend: &dyn Backend) {
    let name = entry.accessor_name.clone();
    map.insert(name, Arc::new(CollectionAccessor::new(entry, backend)));
}

/// Rewriter map holding every built-in accessor of `backend`
pub fn declare_accessors(backend: &dyn Backend) -> RewriterMap {
    let mut map = RewriterMap::new();
    for entry in backend.collections() {
        register_collection(&mut map, entry.clone(), backend);
    }
    debug!(backend = backend.experiment(), count = map.len(), "declared collection accessors");
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::rewrite_calls;
    use adl_query::{parse_query, InjectionNode};

    fn rewrite(text: &str) -> CodegenResult<Expr> {
        let backend = AtlasBackend;
        rewrite_calls(parse_query(text).unwrap(), &declare_accessors(&backend))
    }

    fn node(expr: &Expr) -> InjectionNode {
        match expr {
            Expr::Call(call) => match call.func.as_ref() {
                Expr::Injection(node) => node.as_ref().clone(),
                other => panic!("expected an injection, got {}", other),
            },
            other => panic!("expected a call, got {}", other),
        }
    }

    #[test]
    fn test_accessor_builds_fetch() {
        let out = rewrite("e.Jets('AntiKt4EMTopoJets')").unwrap();
        let node = node(&out);
        assert_eq!(node.formal_params, vec![COLLECTION_KEY.to_string()]);
        assert_eq!(node.result_type.to_string(), "const xAOD::JetContainer*");
        assert_eq!(
            node.running_code[1].to_string(),
            "ANA_CHECK (evtStore()->retrieve(result, collection_name));"
        );
        assert_eq!(out.as_call().unwrap().args, vec![Expr::string("AntiKt4EMTopoJets")]);
    }

    #[test]
    fn test_default_key() {
        let out = rewrite("e.Jets()").unwrap();
        assert_eq!(out.as_call().unwrap().args, vec![Expr::string("AntiKt4EMTopoJets")]);
    }

    #[test]
    fn test_two_arguments() {
        let err = rewrite("e.Jets('a', 'b')").unwrap_err();
        assert!(err.to_string().contains("only one argument"));
    }

    #[test]
    fn test_non_string_key() {
        let err = rewrite("e.Jets(1)").unwrap_err();
        assert!(err.to_string().contains("is a string"));
    }

    #[test]
    fn test_directive_collection() {
        let info = CollectionInfo {
            name: "Vertices".into(),
            include_files: vec!["xAODTracking/VertexContainer.h".into()],
            container_type: "xAOD::VertexContainer".into(),
            contains_collection: true,
            element_type: Some("xAOD::Vertex".into()),
            element_pointer: true,
            link_libraries: vec!["xAODTracking".into()],
            experiment: None,
        };
        let entry = CollectionEntry::from_info(&info, &AtlasBackend).unwrap();
        assert_eq!(entry.experiment, "atlas");
        let element = entry.container_type.element_type().unwrap();
        assert_eq!(element.name(), "xAOD::Vertex");
        assert_eq!(element.pointer_depth(), 1);
    }

    #[test]
    fn test_directive_collection_without_element() {
        let info = CollectionInfo {
            name: "Vertices".into(),
            include_files: vec![],
            container_type: "xAOD::VertexContainer".into(),
            contains_collection: true,
            element_type: None,
            element_pointer: true,
            link_libraries: vec![],
            experiment: None,
        };
        assert!(CollectionEntry::from_info(&info, &AtlasBackend).is_err());
    }

    #[test]
    fn test_backend_for() {
        assert_eq!(backend_for(BackendKind::Cms).experiment(), "cms");
        assert_eq!(backend_for(BackendKind::Atlas).ntuple_dialect(), NtupleDialect::Atlas);
    }
}
