//! Code generation error types

use adl_config::ConfigError;
use adl_query::{ParseError, TransformError};
use adl_types::TypeError;
use thiserror::Error;

/// Errors raised while translating a query to C++
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A `MetaData` block is not a valid directive
    #[error("Malformed {kind} directive: {message}")]
    MalformedDirective { kind: String, message: String },

    /// A directive names a different experiment than the active backend
    #[error("Attempt to use {requested} {directive} with the {active} backend; only {active} is allowed")]
    ExperimentMismatch {
        requested: String,
        directive: String,
        active: String,
    },

    /// Injected code called with the wrong number of arguments
    #[error("The call of {name} expects {expected} arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Method-style injected code called as a plain function
    #[error("{name} must be called as a method on an object")]
    MissingReceiver { name: String },

    /// A collection accessor given more than one argument
    #[error("The collection {name} takes only one argument, the collection key; found {found}")]
    CollectionArity { name: String, found: usize },

    /// A collection accessor given a non-string key
    #[error("The collection {name} requires that its only argument is a string, found {found}")]
    CollectionKeyType { name: String, found: String },

    /// The query root is not something that produces output
    #[error("Unknown query root shape: {root}")]
    UnknownRootShape { root: String },

    /// No type information for a method, and no safe default
    #[error("Unable to call method {method} on type {ty}")]
    UnresolvableMethod { method: String, ty: String },

    /// Operator with no C++ translation
    #[error("Operator {op} is not supported in generated code")]
    UnsupportedOperator { op: String },

    /// The emitter could not translate the tree
    #[error("Emission failed: {0}")]
    Emission(String),

    /// The artifact could not be handed to the writer
    #[error("Output failed: {0}")]
    Output(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transform(TransformError),
}

/// Specialized Result type for code generation
pub type CodegenResult<T> = Result<T, CodegenError>;

impl From<TransformError> for CodegenError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::UnknownRootShape { root } => Self::UnknownRootShape { root },
            other => Self::Transform(other),
        }
    }
}

impl CodegenError {
    pub fn malformed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDirective {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn emission(message: impl Into<String>) -> Self {
        Self::Emission(message.into())
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }

    pub fn unresolvable(method: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::UnresolvableMethod {
            method: method.into(),
            ty: ty.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_shape_keeps_its_kind() {
        let err: CodegenError = TransformError::UnknownRootShape {
            root: "Aggregate".into(),
        }
        .into();
        assert!(matches!(err, CodegenError::UnknownRootShape { ref root } if root == "Aggregate"));
    }

    #[test]
    fn test_messages() {
        let err = CodegenError::ExperimentMismatch {
            requested: "cms".into(),
            directive: "collection".into(),
            active: "atlas".into(),
        };
        assert_eq!(
            err.to_string(),
            "Attempt to use cms collection with the atlas backend; only atlas is allowed"
        );
        assert_eq!(
            CodegenError::unresolvable("eta", "double").to_string(),
            "Unable to call method eta on type double"
        );
    }
}
