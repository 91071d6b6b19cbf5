//! Error types for parsing and tree transforms

use thiserror::Error;

/// Query text could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Syntax error, with line and column details
    #[error("Query syntax error:\n{message}")]
    Syntax { message: String },
}

/// A transform rejected the tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A reserved call was used with the wrong arguments
    #[error("Invalid call to {name}: {message}")]
    InvalidCall { name: String, message: String },

    /// A `MetaData` block could not be converted to a directive map
    #[error("Invalid MetaData block: {message}")]
    InvalidMetadata { message: String },

    /// The query root is not a result-format call or a sequence
    #[error("Unknown query root shape: {root}; expected ResultTTree, ResultAwkwardArray, ResultParquet or a sequence")]
    UnknownRootShape { root: String },
}

impl TransformError {
    pub fn invalid_call(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCall {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }
}
