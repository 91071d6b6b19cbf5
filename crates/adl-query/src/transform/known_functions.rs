//! Math calls mapped onto the C++ standard library.

use crate::ast::{Call, Expr, KnownFunction};
use crate::error::TransformError;
use crate::transform::QueryTransform;

const CMATH: &str = "cmath";

const KNOWN: &[&str] = &[
    "abs", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sinh", "cosh", "tanh", "exp", "log",
    "log10", "sqrt", "pow", "ceil", "floor",
];

/// The C++ function a query-level name stands for, if any
pub fn lookup_known_function(name: &str) -> Option<KnownFunction> {
    KNOWN.contains(&name).then(|| KnownFunction {
        name: name.to_string(),
        cpp_name: format!("std::{}", name),
        include: CMATH.to_string(),
        return_type: "double".to_string(),
    })
}

/// Replaces `sqrt(x)` and `math.sqrt(x)` callees with [`Expr::KnownFunction`].
///
/// A lambda parameter with the same name shadows the function.
pub struct KnownFunctions;

impl QueryTransform for KnownFunctions {
    fn name(&self) -> &'static str {
        "known_functions"
    }

    fn transform(&self, expr: Expr) -> Result<Expr, TransformError> {
        Ok(rewrite(expr, &mut Vec::new()))
    }
}

fn rewrite(expr: Expr, bound: &mut Vec<String>) -> Expr {
    match expr {
        Expr::Lambda(lambda) => {
            let depth = bound.len();
            bound.extend(lambda.params.iter().cloned());
            let out = Expr::Lambda(lambda).map_children(|child| rewrite(child, bound));
            bound.truncate(depth);
            out
        }
        Expr::Call(Call { func, args }) => {
            let args = args.into_iter().map(|arg| rewrite(arg, bound)).collect();
            let func = match known_callee(&func, bound) {
                Some(known) => Expr::KnownFunction(known),
                None => rewrite(*func, bound),
            };
            Expr::call(func, args)
        }
        other => other.map_children(|child| rewrite(child, bound)),
    }
}

fn known_callee(func: &Expr, bound: &[String]) -> Option<KnownFunction> {
    let name = match func {
        Expr::Name(name) if !bound.contains(name) => name,
        Expr::Attribute { value, attr } => match value.as_ref() {
            Expr::Name(module) if module == "math" && !bound.contains(module) => attr,
            _ => return None,
        },
        _ => return None,
    };
    lookup_known_function(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;

    fn run(text: &str) -> Expr {
        KnownFunctions.transform(parse_query(text).unwrap()).unwrap()
    }

    #[test]
    fn test_lookup() {
        let f = lookup_known_function("sqrt").unwrap();
        assert_eq!(f.cpp_name, "std::sqrt");
        assert_eq!(f.include, "cmath");
        assert_eq!(f.return_type, "double");
        assert!(lookup_known_function("frobnicate").is_none());
    }

    #[test]
    fn test_bare_and_module_calls() {
        for text in ["j => sqrt(j.pt())", "j => math.sqrt(j.pt())"] {
            let out = run(text);
            let body = &out.as_lambda().unwrap().body;
            let func = &body.as_call().unwrap().func;
            assert!(matches!(func.as_ref(), Expr::KnownFunction(k) if k.cpp_name == "std::sqrt"));
        }
    }

    #[test]
    fn test_lambda_parameter_shadows() {
        let out = run("abs => abs(1)");
        assert_eq!(out, parse_query("abs => abs(1)").unwrap());
    }

    #[test]
    fn test_method_named_like_function_untouched() {
        let out = run("j => j.abs()");
        assert_eq!(out, parse_query("j => j.abs()").unwrap());
    }

    #[test]
    fn test_nested_arguments() {
        let out = run("pow(sin(x), 2)");
        let call = out.as_call().unwrap();
        assert!(matches!(call.func.as_ref(), Expr::KnownFunction(k) if k.name == "pow"));
        assert!(matches!(
            call.args[0].as_call().unwrap().func.as_ref(),
            Expr::KnownFunction(k) if k.name == "sin"
        ));
    }
}
