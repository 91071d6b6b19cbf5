//! Method-style sequence operators as plain calls.

use crate::ast::{Call, Expr};
use crate::error::TransformError;
use crate::transform::QueryTransform;

/// Name of the implicit per-event source
pub const EVENT_SOURCE: &str = "EventDataset";

/// Operators that take a source and one lambda
pub const SEQUENCE_OPS: &[&str] = &["Select", "SelectMany", "Where"];

/// Names handled as extension calls
pub const RESERVED_NAMES: &[&str] = &[
    "Select",
    "SelectMany",
    "Where",
    "Aggregate",
    "First",
    "Count",
    "Sum",
    "Max",
    "Min",
    "ResultTTree",
    "ResultAwkwardArray",
    "ResultParquet",
];

/// Rewrites `source.Op(args...)` to `Op(source, args...)` for reserved
/// names.
///
/// Also:
/// - a sequence operator given only a lambda reads from `EventDataset()`
/// - `AsROOTTTree(file, tree, columns)`, `AsAwkwardArray(columns)` and
///   `AsParquetFiles(file, columns)` become the matching `Result*` call
pub struct ExtensionCalls;

impl QueryTransform for ExtensionCalls {
    fn name(&self) -> &'static str {
        "extension_calls"
    }

    fn transform(&self, expr: Expr) -> Result<Expr, TransformError> {
        rewrite(expr)
    }
}

fn rewrite(expr: Expr) -> Result<Expr, TransformError> {
    match expr.try_map_children(rewrite)? {
        Expr::Call(Call { func, args }) => rewrite_call(*func, args),
        other => Ok(other),
    }
}

fn rewrite_call(func: Expr, mut args: Vec<Expr>) -> Result<Expr, TransformError> {
    match func {
        Expr::Attribute { value, attr } if RESERVED_NAMES.contains(&attr.as_str()) => {
            args.insert(0, *value);
            Ok(Expr::call_named(attr, args))
        }
        Expr::Attribute { value, attr } if is_format_alias(&attr) => {
            format_alias(&attr, *value, args)
        }
        Expr::Name(name)
            if SEQUENCE_OPS.contains(&name.as_str())
                && args.len() == 1
                && matches!(args[0], Expr::Lambda(_)) =>
        {
            args.insert(0, Expr::call_named(EVENT_SOURCE, Vec::new()));
            Ok(Expr::call_named(name, args))
        }
        func => Ok(Expr::call(func, args)),
    }
}

fn is_format_alias(name: &str) -> bool {
    matches!(name, "AsROOTTTree" | "AsAwkwardArray" | "AsParquetFiles")
}

fn format_alias(name: &str, source: Expr, args: Vec<Expr>) -> Result<Expr, TransformError> {
    let found = args.len();
    let wrong = |expected: &str| {
        TransformError::invalid_call(name, format!("expected {}, found {} arguments", expected, found))
    };
    match name {
        "AsROOTTTree" => {
            let [file, tree, columns]: [Expr; 3] =
                args.try_into().map_err(|_| wrong("(file, tree, columns)"))?;
            Ok(Expr::call_named("ResultTTree", vec![source, columns, tree, file]))
        }
        "AsAwkwardArray" => {
            let [columns]: [Expr; 1] = args.try_into().map_err(|_| wrong("(columns)"))?;
            Ok(Expr::call_named("ResultAwkwardArray", vec![source, columns]))
        }
        _ => {
            let [file, columns]: [Expr; 2] =
                args.try_into().map_err(|_| wrong("(file, columns)"))?;
            Ok(Expr::call_named("ResultParquet", vec![source, columns, file]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use test_case::test_case;

    fn run(text: &str) -> Result<String, TransformError> {
        ExtensionCalls
            .transform(parse_query(text).unwrap())
            .map(|e| e.to_string())
    }

    #[test_case("s.Select(j => j.pt())", "Select(s, j => j.pt())" ; "select")]
    #[test_case("s.Where(j => j.pt() > 1).First()", "First(Where(s, j => (j.pt() > 1)))" ; "chain")]
    #[test_case("s.Aggregate(0, (a, b) => a + b)", "Aggregate(s, 0, (a, b) => (a + b))" ; "aggregate")]
    #[test_case("e.Jets('x')", "e.Jets(\"x\")" ; "collection untouched")]
    #[test_case("Select(e => e.x())", "Select(EventDataset(), e => e.x())" ; "implicit source")]
    #[test_case("Select(s, e => e.x())", "Select(s, e => e.x())" ; "explicit source")]
    fn test_extension_calls(text: &str, expected: &str) {
        assert_eq!(run(text).unwrap(), expected);
    }

    #[test]
    fn test_nested_in_lambda() {
        assert_eq!(
            run("EventDataset().Select(e => e.Jets().Select(j => j.pt()))").unwrap(),
            "Select(EventDataset(), e => Select(e.Jets(), j => j.pt()))"
        );
    }

    #[test_case("s.AsROOTTTree('f.root', 'tree', ['a'])", "ResultTTree(s, [\"a\"], \"tree\", \"f.root\")" ; "root tree")]
    #[test_case("s.AsAwkwardArray(['a', 'b'])", "ResultAwkwardArray(s, [\"a\", \"b\"])" ; "awkward")]
    #[test_case("s.AsParquetFiles('f.parquet', ['a'])", "ResultParquet(s, [\"a\"], \"f.parquet\")" ; "parquet")]
    fn test_format_aliases(text: &str, expected: &str) {
        assert_eq!(run(text).unwrap(), expected);
    }

    #[test]
    fn test_format_alias_arity() {
        let err = run("s.AsROOTTTree('f.root')").unwrap_err();
        assert!(err.to_string().contains("AsROOTTTree"));
    }
}
