//! Tree transforms.
//!
//! Normalization turns the sugar a user may write into the small core the
//! emitter understands. Each pass is a [`QueryTransform`]; [`normalize`] runs
//! them in a fixed order, and running it twice gives the same tree.

mod aggregate;
mod extension;
mod known_functions;
mod simplify;
mod validate;

pub use aggregate::AggregateShortcuts;
pub use extension::{ExtensionCalls, EVENT_SOURCE, RESERVED_NAMES, SEQUENCE_OPS};
pub use known_functions::{lookup_known_function, KnownFunctions};
pub use simplify::{free_names, substitute, SimplifyChains};
pub use validate::{ValidateRoot, RESULT_FORMATS};

use crate::ast::Expr;
use crate::error::TransformError;
use tracing::{debug, trace};

/// A pass over the query tree
pub trait QueryTransform: Send + Sync {
    /// Unique name for this transform
    fn name(&self) -> &'static str;

    /// Transform the tree
    fn transform(&self, expr: Expr) -> Result<Expr, TransformError>;
}

/// Normalization passes in the order they must run
pub fn default_transforms() -> Vec<Box<dyn QueryTransform>> {
    vec![
        Box::new(AggregateShortcuts),
        Box::new(ExtensionCalls),
        Box::new(SimplifyChains),
        Box::new(KnownFunctions),
    ]
}

/// Run every normalization pass
pub fn normalize(expr: Expr) -> Result<Expr, TransformError> {
    run_transforms(&default_transforms(), expr)
}

/// Run `transforms` in order, stopping at the first error
pub fn run_transforms(
    transforms: &[Box<dyn QueryTransform>],
    mut expr: Expr,
) -> Result<Expr, TransformError> {
    for transform in transforms {
        debug!(transform = transform.name(), "running transform");
        expr = transform.transform(expr)?;
        trace!(transform = transform.name(), tree = %expr, "transform complete");
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rename;

    impl QueryTransform for Rename {
        fn name(&self) -> &'static str {
            "rename"
        }

        fn transform(&self, expr: Expr) -> Result<Expr, TransformError> {
            Ok(match expr {
                Expr::Name(_) => Expr::name("renamed"),
                other => other,
            })
        }
    }

    struct Reject;

    impl QueryTransform for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn transform(&self, _expr: Expr) -> Result<Expr, TransformError> {
            Err(TransformError::invalid_call("x", "always fails"))
        }
    }

    #[test]
    fn test_transforms_run_in_order() {
        let transforms: Vec<Box<dyn QueryTransform>> = vec![Box::new(Rename)];
        let out = run_transforms(&transforms, Expr::name("a")).unwrap();
        assert_eq!(out, Expr::name("renamed"));
    }

    #[test]
    fn test_first_error_stops() {
        let transforms: Vec<Box<dyn QueryTransform>> = vec![Box::new(Reject), Box::new(Rename)];
        assert!(run_transforms(&transforms, Expr::name("a")).is_err());
    }

    #[test]
    fn test_default_order() {
        let names: Vec<_> = default_transforms().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["aggregate_shortcuts", "extension_calls", "simplify_chains", "known_functions"]
        );
    }
}
