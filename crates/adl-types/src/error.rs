//! Type error types

use thiserror::Error;

/// Errors raised while manipulating C++ types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Attempted to dereference a type that is not a pointer
    #[error("Cannot dereference type {ty}: it is not a pointer")]
    CannotDereference {
        /// The offending type, as C++ text
        ty: String,
    },
}

/// Specialized Result type for type operations
pub type TypeResult<T> = Result<T, TypeError>;

impl TypeError {
    /// Create a dereference error for the given type text
    pub fn cannot_dereference(ty: impl Into<String>) -> Self {
        Self::CannotDereference { ty: ty.into() }
    }
}
