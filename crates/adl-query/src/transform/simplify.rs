//! Chain fusion and beta reduction.

use crate::ast::{BinaryOp, Call, Constant, Expr, Lambda};
use crate::error::TransformError;
use crate::transform::QueryTransform;
use std::collections::{BTreeSet, HashMap};

/// Collapses operator chains so each source is walked once.
///
/// - `(x => body)(a)` reduces to `body[x := a]`
/// - `Select(Select(s, f), g)` is `Select(s, x => g(f(x)))`
/// - `SelectMany(Select(s, f), g)` is `SelectMany(s, x => g(f(x)))`
/// - `Where(Select(s, f), g)` is `Select(Where(s, x => g(f(x))), f)`
/// - `Select`, `SelectMany` or `Where` over `SelectMany(s, f)` moves inside
///   the inner lambda
/// - `Where(Where(s, f), g)` is `Where(s, x => f(x) and g(x))`
/// - indexing a literal tuple, list or dict picks the element
///
/// Substitution renames lambda parameters that would capture a free name.
pub struct SimplifyChains;

impl QueryTransform for SimplifyChains {
    fn name(&self) -> &'static str {
        "simplify_chains"
    }

    fn transform(&self, expr: Expr) -> Result<Expr, TransformError> {
        Ok(simplify(expr))
    }
}

fn simplify(expr: Expr) -> Expr {
    let expr = expr.map_children(simplify);
    match beta(&expr)
        .or_else(|| fuse(&expr))
        .or_else(|| project(&expr))
    {
        Some(rewritten) => simplify(rewritten),
        None => expr,
    }
}

// ============================================================================
// Names and substitution
// ============================================================================

/// Names referenced but not bound by an enclosing lambda
pub fn free_names(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_free(expr, &mut Vec::new(), &mut out);
    out
}

fn collect_free(expr: &Expr, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Name(name) => {
            if !bound.contains(name) {
                out.insert(name.clone());
            }
        }
        Expr::Lambda(Lambda { params, body }) => {
            let depth = bound.len();
            bound.extend(params.iter().cloned());
            collect_free(body, bound, out);
            bound.truncate(depth);
        }
        other => other.for_each_child(|child| collect_free(child, bound, out)),
    }
}

fn fresh_name(base: &str, avoid: &BTreeSet<String>) -> String {
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !avoid.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Replace free occurrences of each bound name, all at once
pub fn substitute(expr: Expr, bindings: &HashMap<String, Expr>) -> Expr {
    if bindings.is_empty() {
        return expr;
    }
    match expr {
        Expr::Name(name) => bindings.get(&name).cloned().unwrap_or(Expr::Name(name)),
        Expr::Lambda(Lambda { params, body }) => {
            let mut inner: HashMap<String, Expr> = bindings
                .iter()
                .filter(|(name, _)| !params.contains(*name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            if inner.is_empty() {
                return Expr::Lambda(Lambda { params, body });
            }

            let captured: BTreeSet<String> = inner.values().flat_map(free_names).collect();
            let mut avoid = free_names(&body);
            avoid.extend(captured.iter().cloned());
            avoid.extend(params.iter().cloned());

            let mut renamed = Vec::with_capacity(params.len());
            for param in params {
                if captured.contains(&param) {
                    let fresh = fresh_name(&param, &avoid);
                    avoid.insert(fresh.clone());
                    inner.insert(param, Expr::name(fresh.clone()));
                    renamed.push(fresh);
                } else {
                    renamed.push(param);
                }
            }
            Expr::lambda(renamed, substitute(*body, &inner))
        }
        other => other.map_children(|child| substitute(child, bindings)),
    }
}

fn bind(name: &str, value: Expr) -> HashMap<String, Expr> {
    HashMap::from([(name.to_string(), value)])
}

// ============================================================================
// Rewrite rules
// ============================================================================

fn beta(expr: &Expr) -> Option<Expr> {
    let Expr::Call(Call { func, args }) = expr else {
        return None;
    };
    let Expr::Lambda(Lambda { params, body }) = func.as_ref() else {
        return None;
    };
    if params.len() != args.len() {
        return None;
    }
    let bindings = params.iter().cloned().zip(args.iter().cloned()).collect();
    Some(substitute(body.as_ref().clone(), &bindings))
}

/// `(operator, source, lambda param, lambda body)` for a sequence call
fn chain_link(expr: &Expr) -> Option<(&str, &Expr, &str, &Expr)> {
    let name = expr.callee_name()?;
    if !matches!(name, "Select" | "SelectMany" | "Where") {
        return None;
    }
    let [source, func] = expr.as_call()?.args.as_slice() else {
        return None;
    };
    let lambda = func.as_lambda()?;
    Some((name, source, lambda.single_param()?, lambda.body.as_ref()))
}

fn op(name: &str, source: Expr, lambda: Expr) -> Expr {
    Expr::call_named(name, vec![source, lambda])
}

fn fuse(expr: &Expr) -> Option<Expr> {
    let (outer, inner_call, g_param, g_body) = chain_link(expr)?;
    let (inner, source, f_param, f_body) = chain_link(inner_call)?;

    // The fused lambda binds f's parameter around g's body, so it must not
    // capture anything g refers to.
    let g = Expr::lambda(vec![g_param.to_string()], g_body.clone());
    let g_free = free_names(&g);
    let (param, f_body) = if g_free.contains(f_param) {
        let mut avoid = g_free;
        avoid.extend(free_names(f_body));
        let fresh = fresh_name(f_param, &avoid);
        let body = substitute(f_body.clone(), &bind(f_param, Expr::name(fresh.clone())));
        (fresh, body)
    } else {
        (f_param.to_string(), f_body.clone())
    };

    let lambda = |body: Expr| Expr::lambda(vec![param.clone()], body);
    let composed = || substitute(g_body.clone(), &bind(g_param, f_body.clone()));
    let source = source.clone();

    Some(match (inner, outer) {
        ("Select", "Select") => op("Select", source, lambda(composed())),
        ("Select", "SelectMany") => op("SelectMany", source, lambda(composed())),
        ("Select", "Where") => {
            let filtered = op("Where", source, lambda(composed()));
            op("Select", filtered, lambda(f_body.clone()))
        }
        ("SelectMany", outer) => {
            op("SelectMany", source, lambda(op(outer, f_body.clone(), g)))
        }
        ("Where", "Where") => {
            let second = substitute(g_body.clone(), &bind(g_param, Expr::name(param.clone())));
            op(
                "Where",
                source,
                lambda(Expr::binop(BinaryOp::And, f_body.clone(), second)),
            )
        }
        _ => return None,
    })
}

fn project(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Subscript { value, index } => match (value.as_ref(), index.as_ref()) {
            (Expr::Tuple(items) | Expr::List(items), Expr::Constant(Constant::Int(i))) => {
                usize::try_from(*i).ok().and_then(|i| items.get(i)).cloned()
            }
            (Expr::Dict(entries), Expr::Constant(Constant::Str(key))) => dict_get(entries, key),
            _ => None,
        },
        Expr::Attribute { value, attr } => match value.as_ref() {
            Expr::Dict(entries) => dict_get(entries, attr),
            _ => None,
        },
        _ => None,
    }
}

fn dict_get(entries: &[(Expr, Expr)], key: &str) -> Option<Expr> {
    entries
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v.clone())
}
