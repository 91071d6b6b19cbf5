//! Rendering an injection node into the current emission scope.

use crate::error::CodegenResult;
use adl_query::{DeclareVariable, InjectionNode};

/// What the emitter offers injected code
pub trait InjectionContext: DeclareVariable {
    fn add_include(&mut self, file: &str);
    fn add_link_library(&mut self, library: &str);
    /// A line for the algorithm's initialize step
    fn add_init_line(&mut self, line: &str);
    fn open_block(&mut self);
    fn add_line(&mut self, line: &str);
    fn close_block(&mut self) -> CodegenResult<()>;
}

/// Emit `node` with resolved argument values and return the variable that
/// holds its result.
///
/// `receiver` is the C++ text for the bound receiver, if the node has one;
/// `args` are the C++ texts of the call arguments in order. The code runs in
/// its own block so its locals cannot collide with the surrounding loop.
pub fn apply_injection(
    node: &InjectionNode,
    receiver: Option<String>,
    args: Vec<String>,
    ctx: &mut dyn InjectionContext,
) -> CodegenResult<String> {
    let result = node.declare_result(ctx);

    for file in &node.include_files {
        ctx.add_include(file);
    }
    for library in &node.link_libraries {
        ctx.add_link_library(library);
    }
    for line in &node.init_code {
        ctx.add_init_line(line);
    }

    let mut bindings = Vec::with_capacity(args.len() + 1);
    if let (Some(binding), Some(value)) = (&node.receiver, receiver) {
        bindings.push((binding.placeholder.clone(), value));
    }
    bindings.extend(node.formal_params.iter().cloned().zip(args));

    ctx.open_block();
    for template in &node.running_code {
        ctx.add_line(&template.render(&bindings));
    }
    ctx.add_line(&format!(
        "{} = {};",
        result,
        node.result_placeholder.render(&bindings)
    ));
    ctx.close_block()?;

    Ok(result)
}
