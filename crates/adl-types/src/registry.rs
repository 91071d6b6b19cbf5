//! Method return-type registry.

use crate::types::CppType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// What calling a method produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInvokeInfo {
    /// Declared return type
    pub return_type: CppType,
    /// Dereferences applied to the calling object before the call.
    /// 0 is `obj.method()` on a value, 1 is `(*obj)` first, and so on.
    pub deref_depth: usize,
}

/// Maps `(owner type, method)` to [`MethodInvokeInfo`].
///
/// Registering the same key twice overwrites: per-query metadata is expected
/// to override backend defaults. A missing entry is not an error here; the
/// emitter asking the question decides whether it can proceed without one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeRegistry {
    methods: HashMap<String, HashMap<String, MethodInvokeInfo>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the return type of `owner::method`
    pub fn register(
        &mut self,
        owner: impl Into<String>,
        method: impl Into<String>,
        return_type: impl Into<CppType>,
        deref_depth: usize,
    ) {
        let owner = owner.into();
        let method = method.into();
        let return_type = return_type.into();
        trace!(%owner, %method, %return_type, deref_depth, "registering method type");

        self.methods.entry(owner).or_default().insert(
            method,
            MethodInvokeInfo {
                return_type,
                deref_depth,
            },
        );
    }

    /// Look up `owner::method`
    pub fn lookup(&self, owner: &str, method: &str) -> Option<&MethodInvokeInfo> {
        self.methods.get(owner)?.get(method)
    }

    /// True if `owner::method` is registered
    pub fn contains(&self, owner: &str, method: &str) -> bool {
        self.lookup(owner, method).is_some()
    }

    /// Copy every entry of `other` into this registry, overwriting clashes
    pub fn merge(&mut self, other: &TypeRegistry) {
        for (owner, method, info) in other.iter() {
            self.register(owner, method, info.return_type.clone(), info.deref_depth);
        }
    }

    /// Iterate over `(owner, method, info)` in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &MethodInvokeInfo)> {
        self.methods.iter().flat_map(|(owner, methods)| {
            methods
                .iter()
                .map(move |(method, info)| (owner.as_str(), method.as_str(), info))
        })
    }

    /// Number of registered methods
    pub fn len(&self) -> usize {
        self.methods.values().map(HashMap::len).sum()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
