//! Code injection.
//!
//! Backend code is exposed to the query language as ordinary calls. A
//! [`CodeInjectionSpec`] describes the code once; the rewrite pass swaps the
//! callee of every matching call site for an [`InjectionNode`], and the
//! emitter later renders it through [`apply_injection`] once argument values
//! are known.

mod apply;

pub use apply::{apply_injection, InjectionContext};

use crate::directive::CppFunction;
use crate::error::{CodegenError, CodegenResult};
use adl_query::{Call, CodeTemplate, Expr, InjectionNode, ReceiverBinding};
use adl_types::CppType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Everything needed to inject one piece of backend code
#[derive(Debug, Clone, PartialEq)]
pub struct CodeInjectionSpec {
    /// Name the query calls it by
    pub name: String,
    pub include_files: Vec<String>,
    pub link_libraries: Vec<String>,
    /// Lines for the algorithm's initialize step
    pub init_code: Vec<String>,
    /// Placeholders bound to the call's arguments, in order
    pub formal_params: Vec<String>,
    /// Placeholder bound to the object in `obj.name(...)`
    pub receiver_param: Option<String>,
    pub running_code: Vec<String>,
    /// Expression copied into the result variable after the code runs
    pub result_placeholder: String,
    pub result_type: CppType,
}

impl CodeInjectionSpec {
    pub fn new(name: impl Into<String>, result_type: impl Into<CppType>) -> Self {
        Self {
            name: name.into(),
            include_files: Vec::new(),
            link_libraries: Vec::new(),
            init_code: Vec::new(),
            formal_params: Vec::new(),
            receiver_param: None,
            running_code: Vec::new(),
            result_placeholder: "result".to_string(),
            result_type: result_type.into(),
        }
    }

    /// Spec for an `add_cpp_function` directive
    pub fn from_function(function: &CppFunction) -> Self {
        Self {
            include_files: function.include_files.clone(),
            formal_params: function.arguments.clone(),
            receiver_param: function.instance_object.clone(),
            running_code: function.code.clone(),
            result_placeholder: function
                .result_name
                .clone()
                .unwrap_or_else(|| "result".to_string()),
            ..Self::new(&function.name, CppType::parse(&function.return_type))
        }
    }

    /// Slot names the templates may refer to
    fn slots(&self) -> Vec<&str> {
        self.receiver_param
            .iter()
            .chain(self.formal_params.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Build the injection node for one call site and splice it in as the
/// callee. Arguments are left untouched.
pub fn build_injection(spec: &CodeInjectionSpec, call: Call) -> CodegenResult<Expr> {
    let Call { func, args } = call;

    let receiver = match (*func, &spec.receiver_param) {
        (Expr::Attribute { value, .. }, Some(placeholder)) => Some(ReceiverBinding {
            placeholder: placeholder.clone(),
            value: *value,
        }),
        (Expr::Attribute { .. }, None) => None,
        (_, Some(_)) => {
            return Err(CodegenError::MissingReceiver {
                name: spec.name.clone(),
            })
        }
        (_, None) => None,
    };

    if args.len() != spec.formal_params.len() {
        return Err(CodegenError::ArityMismatch {
            name: spec.name.clone(),
            expected: spec.formal_params.len(),
            found: args.len(),
        });
    }

    let slots = spec.slots();
    let node = InjectionNode {
        name: spec.name.clone(),
        include_files: spec.include_files.clone(),
        link_libraries: spec.link_libraries.clone(),
        init_code: spec.init_code.clone(),
        running_code: spec
            .running_code
            .iter()
            .map(|line| CodeTemplate::compile(line, &slots))
            .collect(),
        formal_params: spec.formal_params.clone(),
        receiver,
        result_placeholder: CodeTemplate::compile(&spec.result_placeholder, &slots),
        result_type: spec.result_type.clone(),
    };
    trace!(name = %spec.name, "built injection node");

    Ok(Expr::call(Expr::Injection(Box::new(node)), args))
}

/// Rebuilds a call whose callee matched a registered name
pub trait CallRewriter: Send + Sync {
    /// Replace `call` with its injected form
    fn rewrite(&self, call: Call) -> CodegenResult<Expr>;
}

impl CallRewriter for CodeInjectionSpec {
    fn rewrite(&self, call: Call) -> CodegenResult<Expr> {
        build_injection(self, call)
    }
}

/// Exposed name to rewriter. Later insertions replace earlier ones.
pub type RewriterMap = HashMap<String, Arc<dyn CallRewriter>>;

/// Replace every call to a registered name, children first.
///
/// Both `name(...)` and `x.name(...)` match; the receiver's type is not
/// consulted.
pub fn rewrite_calls(expr: Expr, rewriters: &RewriterMap) -> CodegenResult<Expr> {
    if rewriters.is_empty() {
        return Ok(expr);
    }
    match expr.try_map_children(|child| rewrite_calls(child, rewriters))? {
        Expr::Call(call) => match callee(&call).and_then(|name| rewriters.get(name)) {
            Some(rewriter) => rewriter.rewrite(call),
            None => Ok(Expr::Call(call)),
        },
        other => Ok(other),
    }
}

fn callee(call: &Call) -> Option<&str> {
    match call.func.as_ref() {
        Expr::Name(name) => Some(name),
        Expr::Attribute { attr, .. } => Some(attr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adl_query::parse_query;
    use adl_types::TerminalType;

    fn delta_r() -> CodeInjectionSpec {
        CodeInjectionSpec {
            formal_params: vec!["eta1".into(), "eta2".into()],
            running_code: vec!["auto result = eta1 - eta2;".into()],
            include_files: vec!["TVector2.h".into()],
            ..CodeInjectionSpec::new("DeltaR", TerminalType::new("double"))
        }
    }

    fn jet_width() -> CodeInjectionSpec {
        CodeInjectionSpec {
            receiver_param: Some("obj_j".into()),
            running_code: vec!["auto result = obj_j->getAttribute<float>(\"Width\");".into()],
            ..CodeInjectionSpec::new("width", TerminalType::new("float"))
        }
    }

    fn map(specs: Vec<CodeInjectionSpec>) -> RewriterMap {
        specs
            .into_iter()
            .map(|s| (s.name.clone(), Arc::new(s) as Arc<dyn CallRewriter>))
            .collect()
    }

    fn injected(expr: &Expr) -> Vec<InjectionNode> {
        let mut found = Vec::new();
        collect(expr, &mut found);
        found
    }

    fn collect(expr: &Expr, found: &mut Vec<InjectionNode>) {
        if let Expr::Injection(node) = expr {
            found.push(node.as_ref().clone());
        }
        expr.for_each_child(|child| collect(child, found));
    }

    #[test]
    fn test_function_call_rewritten() {
        let query = parse_query("j => DeltaR(j.eta(), 1.0)").unwrap();
        let out = rewrite_calls(query, &map(vec![delta_r()])).unwrap();
        let nodes = injected(&out);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "DeltaR");
        assert_eq!(nodes[0].include_files, vec!["TVector2.h".to_string()]);
        assert!(nodes[0].receiver.is_none());
    }

    #[test]
    fn test_arguments_untouched() {
        let query = parse_query("DeltaR(a, b)").unwrap();
        let out = rewrite_calls(query, &map(vec![delta_r()])).unwrap();
        let call = out.as_call().unwrap();
        assert_eq!(call.args, vec![Expr::name("a"), Expr::name("b")]);
    }

    #[test]
    fn test_method_style_binds_receiver() {
        let query = parse_query("j => j.width()").unwrap();
        let out = rewrite_calls(query, &map(vec![jet_width()])).unwrap();
        let node = &injected(&out)[0];
        let receiver = node.receiver.as_ref().unwrap();
        assert_eq!(receiver.placeholder, "obj_j");
        assert_eq!(receiver.value, Expr::name("j"));
    }

    #[test]
    fn test_receiver_spec_called_as_function() {
        let query = parse_query("width()").unwrap();
        let err = rewrite_calls(query, &map(vec![jet_width()])).unwrap_err();
        assert!(matches!(err, CodegenError::MissingReceiver { .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let query = parse_query("DeltaR(1.0)").unwrap();
        let err = rewrite_calls(query, &map(vec![delta_r()])).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::ArityMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_nested_calls_inner_first() {
        let query = parse_query("DeltaR(DeltaR(a, b), c)").unwrap();
        let out = rewrite_calls(query, &map(vec![delta_r()])).unwrap();
        assert_eq!(injected(&out).len(), 2);
    }

    #[test]
    fn test_unregistered_names_untouched() {
        let query = parse_query("e => e.Jets().Select(j => j.pt())").unwrap();
        let out = rewrite_calls(query.clone(), &map(vec![delta_r()])).unwrap();
        assert_eq!(out, query);
    }

    #[test]
    fn test_from_function_defaults_result_name() {
        let function = CppFunction {
            name: "f".into(),
            include_files: vec![],
            arguments: vec!["x".into()],
            code: vec!["double result = x;".into()],
            result_name: None,
            return_type: "double".into(),
            method_object: None,
            instance_object: None,
        };
        let spec = CodeInjectionSpec::from_function(&function);
        assert_eq!(spec.result_placeholder, "result");
        assert_eq!(spec.result_type.name(), "double");
    }
}
