//! `Count`, `Sum`, `Max` and `Min` as `Aggregate` calls.

use crate::ast::{BinaryOp, Call, Expr};
use crate::error::TransformError;
use crate::transform::QueryTransform;

const SHORTCUTS: &[&str] = &["Count", "Sum", "Max", "Min"];

/// Rewrites aggregate shortcuts, in call or method form, to `Aggregate`.
///
/// - `s.Count()` is `Aggregate(s, 0, (acc, v) => acc + 1)`; `s.Count(p)`
///   counts `Where(s, p)`
/// - `s.Sum()` is `Aggregate(s, 0, (acc, v) => acc + v)`; `s.Sum(f)` sums
///   `Select(s, f)`
/// - `s.Max()` / `s.Min()` have no seed: the first element starts the fold
pub struct AggregateShortcuts;

impl QueryTransform for AggregateShortcuts {
    fn name(&self) -> &'static str {
        "aggregate_shortcuts"
    }

    fn transform(&self, expr: Expr) -> Result<Expr, TransformError> {
        rewrite(expr)
    }
}

fn rewrite(expr: Expr) -> Result<Expr, TransformError> {
    match expr.try_map_children(rewrite)? {
        Expr::Call(Call { func, args }) => match shortcut_name(&func) {
            Some(name) => expand(name, *func, args),
            None => Ok(Expr::Call(Call { func, args })),
        },
        other => Ok(other),
    }
}

fn shortcut_name(func: &Expr) -> Option<&'static str> {
    let name = match func {
        Expr::Name(name) => name,
        Expr::Attribute { attr, .. } => attr,
        _ => return None,
    };
    SHORTCUTS.iter().copied().find(|s| *s == name.as_str())
}

fn expand(name: &'static str, func: Expr, mut args: Vec<Expr>) -> Result<Expr, TransformError> {
    let source = match func {
        Expr::Attribute { value, .. } => *value,
        _ if args.is_empty() => {
            return Err(TransformError::invalid_call(name, "missing the sequence argument"))
        }
        _ => args.remove(0),
    };
    if args.len() > 1 {
        return Err(TransformError::invalid_call(
            name,
            format!("takes at most one function argument, found {}", args.len()),
        ));
    }
    let selector = args.pop();

    let acc = || Expr::name("acc");
    let v = || Expr::name("v");
    let fold = |body: Expr| Expr::lambda(vec!["acc".into(), "v".into()], body);

    let aggregate = match name {
        "Count" => {
            let source = match selector {
                Some(pred) => Expr::call_named("Where", vec![source, pred]),
                None => source,
            };
            let body = Expr::binop(BinaryOp::Add, acc(), Expr::int(1));
            Expr::call_named("Aggregate", vec![source, Expr::int(0), fold(body)])
        }
        "Sum" => {
            let source = select(source, selector);
            let body = Expr::binop(BinaryOp::Add, acc(), v());
            Expr::call_named("Aggregate", vec![source, Expr::int(0), fold(body)])
        }
        _ => {
            let op = if name == "Max" { BinaryOp::Gt } else { BinaryOp::Lt };
            let body = Expr::IfExpr {
                test: Box::new(Expr::binop(op, acc(), v())),
                body: Box::new(acc()),
                orelse: Box::new(v()),
            };
            Expr::call_named("Aggregate", vec![select(source, selector), fold(body)])
        }
    };
    Ok(aggregate)
}

fn select(source: Expr, selector: Option<Expr>) -> Expr {
    match selector {
        Some(f) => Expr::call_named("Select", vec![source, f]),
        None => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use test_case::test_case;

    fn run(text: &str) -> String {
        AggregateShortcuts
            .transform(parse_query(text).unwrap())
            .unwrap()
            .to_string()
    }

    #[test_case("s.Count()", "Aggregate(s, 0, (acc, v) => (acc + 1))" ; "count method")]
    #[test_case("Count(s)", "Aggregate(s, 0, (acc, v) => (acc + 1))" ; "count call")]
    #[test_case("s.Count(j => j.pt() > 1)", "Aggregate(Where(s, j => (j.pt() > 1)), 0, (acc, v) => (acc + 1))" ; "count predicate")]
    #[test_case("s.Sum()", "Aggregate(s, 0, (acc, v) => (acc + v))" ; "sum")]
    #[test_case("s.Sum(j => j.pt())", "Aggregate(Select(s, j => j.pt()), 0, (acc, v) => (acc + v))" ; "sum selector")]
    #[test_case("s.Max()", "Aggregate(s, (acc, v) => (acc if (acc > v) else v))" ; "max")]
    #[test_case("Min(s)", "Aggregate(s, (acc, v) => (acc if (acc < v) else v))" ; "min")]
    fn test_shortcuts(text: &str, expected: &str) {
        assert_eq!(run(text), expected);
    }

    #[test]
    fn test_nested_shortcuts() {
        assert_eq!(
            run("e.Jets().Select(j => j.tracks().Count()).Max()"),
            "Aggregate(e.Jets().Select(j => Aggregate(j.tracks(), 0, (acc, v) => (acc + 1))), (acc, v) => (acc if (acc > v) else v))"
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let err = AggregateShortcuts
            .transform(parse_query("s.Sum(a, b)").unwrap())
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidCall { ref name, .. } if name == "Sum"));
    }

    #[test]
    fn test_call_form_needs_source() {
        assert!(AggregateShortcuts
            .transform(parse_query("Count()").unwrap())
            .is_err());
    }
}
