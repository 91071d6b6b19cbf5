//! Root-shape validation.
//!
//! Runs after injection rewriting, just before emission.

use crate::ast::{Call, Expr};
use crate::error::TransformError;
use crate::transform::{QueryTransform, SEQUENCE_OPS};

/// Calls that materialize a query result
pub const RESULT_FORMATS: &[&str] = &["ResultTTree", "ResultAwkwardArray", "ResultParquet"];

/// Checks that the root is a result-format call.
///
/// A bare `Select`, `SelectMany` or `Where` root is written to the default
/// ntuple: `ResultTTree(root, [], tree_name, file_name)`. A `ResultTTree`
/// without tree or file names gets the defaults filled in.
#[derive(Debug, Clone)]
pub struct ValidateRoot {
    pub tree_name: String,
    pub file_name: String,
}

impl ValidateRoot {
    pub fn new(tree_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            tree_name: tree_name.into(),
            file_name: file_name.into(),
        }
    }
}

impl QueryTransform for ValidateRoot {
    fn name(&self) -> &'static str {
        "validate_root"
    }

    fn transform(&self, expr: Expr) -> Result<Expr, TransformError> {
        match expr.callee_name() {
            Some("ResultTTree") => self.fill_ttree_names(expr),
            Some(name) if RESULT_FORMATS.contains(&name) => Ok(expr),
            Some(name) if SEQUENCE_OPS.contains(&name) => Ok(Expr::call_named(
                "ResultTTree",
                vec![
                    expr,
                    Expr::List(Vec::new()),
                    Expr::string(&self.tree_name),
                    Expr::string(&self.file_name),
                ],
            )),
            Some(name) => Err(TransformError::UnknownRootShape {
                root: name.to_string(),
            }),
            None => Err(TransformError::UnknownRootShape {
                root: expr.to_string(),
            }),
        }
    }
}

impl ValidateRoot {
    fn fill_ttree_names(&self, expr: Expr) -> Result<Expr, TransformError> {
        let Expr::Call(Call { func, mut args }) = expr else {
            return Ok(expr);
        };
        match args.len() {
            2 => {
                args.push(Expr::string(&self.tree_name));
                args.push(Expr::string(&self.file_name));
            }
            3 => args.push(Expr::string(&self.file_name)),
            4 => {}
            found => {
                return Err(TransformError::invalid_call(
                    "ResultTTree",
                    format!("expected (source, columns, tree?, file?), found {} arguments", found),
                ))
            }
        }
        Ok(Expr::Call(Call { func, args }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use test_case::test_case;

    fn run(text: &str) -> Result<String, TransformError> {
        ValidateRoot::new("atlas_tree", "ANALYSIS.root")
            .transform(parse_query(text).unwrap())
            .map(|e| e.to_string())
    }

    #[test_case("Select(s, e => e.x())", "ResultTTree(Select(s, e => e.x()), [], \"atlas_tree\", \"ANALYSIS.root\")" ; "bare select")]
    #[test_case("Where(s, e => e.x())", "ResultTTree(Where(s, e => e.x()), [], \"atlas_tree\", \"ANALYSIS.root\")" ; "bare where")]
    #[test_case("ResultTTree(s, ['a'])", "ResultTTree(s, [\"a\"], \"atlas_tree\", \"ANALYSIS.root\")" ; "fills names")]
    #[test_case("ResultTTree(s, ['a'], 't')", "ResultTTree(s, [\"a\"], \"t\", \"ANALYSIS.root\")" ; "fills file")]
    #[test_case("ResultTTree(s, ['a'], 't', 'f.root')", "ResultTTree(s, [\"a\"], \"t\", \"f.root\")" ; "complete")]
    #[test_case("ResultAwkwardArray(s, ['a'])", "ResultAwkwardArray(s, [\"a\"])" ; "awkward")]
    fn test_accepted_roots(text: &str, expected: &str) {
        assert_eq!(run(text).unwrap(), expected);
    }

    #[test_case("Aggregate(s, 0, (a, b) => a + b)", "Aggregate" ; "aggregate")]
    #[test_case("First(s)", "First" ; "first")]
    #[test_case("1 + 2", "(1 + 2)" ; "not a call")]
    fn test_unknown_root(text: &str, root: &str) {
        let err = ValidateRoot::new("t", "f")
            .transform(parse_query(text).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::UnknownRootShape {
                root: root.to_string()
            }
        );
    }

    #[test]
    fn test_ttree_arity() {
        assert!(run("ResultTTree(s)").is_err());
    }
}
