//! Direct-style loop emitter.
//!
//! Sequences become `for` loops that are left open: selecting from an
//! element, filtering it, or taking the first one all continue inside the
//! loop that produced it. The row is written at the innermost point and
//! every block is closed at the end. Aggregates, conditionals and vector
//! columns open their own loops and close them before returning.

use super::buffer::LineBuffer;
use super::dialect::NtupleDialect;
use super::value::{is_primitive, promote, string_literal, Env, Value};
use super::{push_unique, ColumnInfo, Emission, EmissionVisitor, ResultDescriptor};
use crate::error::{CodegenError, CodegenResult};
use crate::inject::{apply_injection, InjectionContext};
use adl_query::transform::{EVENT_SOURCE, RESULT_FORMATS};
use adl_query::{
    BinaryOp, Call, Constant, DeclareVariable, Expr, InjectionNode, KnownFunction, UnaryOp,
};
use adl_types::{CppType, TerminalType, TypeRegistry};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

const CMATH: &str = "cmath";

/// Emits the per-event loop code for one backend's ntuple idiom
#[derive(Debug, Clone)]
pub struct LoopEmitter {
    dialect: NtupleDialect,
    default_tree: String,
    default_file: String,
}

impl LoopEmitter {
    /// `tree` and `file` name the output when the root call does not
    pub fn new(dialect: NtupleDialect, tree: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            dialect,
            default_tree: tree.into(),
            default_file: file.into(),
        }
    }

    pub fn dialect(&self) -> NtupleDialect {
        self.dialect
    }
}

impl EmissionVisitor for LoopEmitter {
    fn emit(&mut self, tree: &Expr, registry: &TypeRegistry) -> CodegenResult<Emission> {
        let Some(Call { func, args }) = tree.as_call() else {
            return Err(CodegenError::UnknownRootShape {
                root: tree.to_string(),
            });
        };
        let format = match func.as_ref() {
            Expr::Name(name) if RESULT_FORMATS.contains(&name.as_str()) => name.as_str(),
            _ => {
                return Err(CodegenError::UnknownRootShape {
                    root: tree.to_string(),
                })
            }
        };
        let source = args.first().ok_or_else(|| {
            CodegenError::emission(format!("{} needs a source sequence", format))
        })?;
        let requested = match args.get(1) {
            Some(columns) => column_names(columns)?,
            None => Vec::new(),
        };
        let name_arg = |index: usize, default: &str| {
            args.get(index)
                .and_then(Expr::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let (tree_name, file_name) = match format {
            "ResultTTree" => (name_arg(2, &self.default_tree), name_arg(3, &self.default_file)),
            "ResultParquet" => (self.default_tree.clone(), name_arg(2, &self.default_file)),
            _ => (self.default_tree.clone(), self.default_file.clone()),
        };

        let mut state = State::new(registry);
        let row = state.open_sequence(source, &Env::new())?;
        let cells = flatten_row(row)?;
        if !requested.is_empty() && requested.len() != cells.len() {
            return Err(CodegenError::emission(format!(
                "{} names {} columns but each row has {} values",
                format,
                requested.len(),
                cells.len()
            )));
        }

        let mut columns = Vec::with_capacity(cells.len());
        let mut branches = Vec::with_capacity(cells.len());
        for (index, (key, value)) in cells.into_iter().enumerate() {
            let name = match (requested.get(index), key) {
                (Some(name), _) => name.clone(),
                (None, Some(key)) => key,
                (None, None) => format!("col{}", index + 1),
            };
            let member = format!("_{}", identifier(&name));
            let cpp_type = state.write_column(&name, &member, value)?;
            branches.push((name.clone(), member));
            columns.push(ColumnInfo { name, cpp_type });
        }
        state.buffer.add_line(self.dialect.fill_line(&tree_name));
        state.buffer.close_to(0)?;

        for file in self.dialect.include_files() {
            push_unique(&mut state.includes, &file);
        }
        let mut class_decl = self.dialect.members();
        class_decl.append(&mut state.members);
        debug!(format, tree = %tree_name, columns = columns.len(), "emitted query");

        Ok(Emission {
            book_lines: self.dialect.book_lines(&tree_name, &branches),
            result: Some(ResultDescriptor {
                format: format.to_string(),
                tree_name,
                file_name,
                columns,
            }),
            class_decl,
            query_lines: state.buffer.render(),
            init_lines: state.init_lines,
            include_files: state.includes,
            link_libraries: state.link_libraries,
        })
    }
}

/// Column names from a list (or a single string) of names
fn column_names(expr: &Expr) -> CodegenResult<Vec<String>> {
    let items = match expr {
        Expr::List(items) | Expr::Tuple(items) => items.as_slice(),
        Expr::Constant(Constant::Str(name)) => return Ok(vec![name.clone()]),
        other => {
            return Err(CodegenError::emission(format!(
                "Column names must be a list of strings, found {}",
                other
            )))
        }
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                CodegenError::emission(format!("Column name {} is not a string", item))
            })
        })
        .collect()
}

/// Split a row into cells, keeping dictionary keys
fn flatten_row(row: Value) -> CodegenResult<Vec<(Option<String>, Value)>> {
    match row {
        Value::Tuple(items) => Ok(items.into_iter().map(|v| (None, v)).collect()),
        Value::Dict(entries) => Ok(entries.into_iter().map(|(k, v)| (Some(k), v)).collect()),
        Value::Event => Err(CodegenError::emission(
            "A query must select values from the event, not the event itself",
        )),
        other => Ok(vec![(None, other)]),
    }
}

fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn nested_structure(column: &str, found: &Value) -> CodegenError {
    CodegenError::emission(format!(
        "Column {} holds {}; nested data structures cannot be written to an ntuple",
        column,
        found.describe()
    ))
}

fn cpp_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        other => other.symbol(),
    }
}

fn terminal(name: &str) -> CppType {
    TerminalType::new(name).into()
}

/// Emission state for one query
struct State<'r> {
    registry: &'r TypeRegistry,
    buffer: LineBuffer,
    counters: HashMap<String, usize>,
    includes: Vec<String>,
    link_libraries: Vec<String>,
    init_lines: Vec<String>,
    members: Vec<String>,
}

impl<'r> State<'r> {
    fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            buffer: LineBuffer::new(),
            counters: HashMap::new(),
            includes: Vec::new(),
            link_libraries: Vec::new(),
            init_lines: Vec::new(),
            members: Vec::new(),
        }
    }

    fn fresh(&mut self, hint: &str) -> String {
        let n = self.counters.entry(hint.to_string()).or_insert(0);
        *n += 1;
        format!("{}{}", hint, n)
    }

    fn eval(&mut self, expr: &Expr, env: &Env) -> CodegenResult<Value> {
        match expr {
            Expr::Constant(constant) => constant_value(constant),
            Expr::Name(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| CodegenError::emission(format!("Unknown name '{}'", name))),
            Expr::Attribute { value, attr } => match self.eval(value, env)? {
                Value::Dict(entries) => dict_entry(entries, attr),
                other => Err(CodegenError::emission(format!(
                    "Cannot read attribute {} of {}; methods must be called as {}()",
                    attr,
                    other.describe(),
                    attr
                ))),
            },
            Expr::Subscript { value, index } => self.subscript(value, index, env),
            Expr::Call(call) => self.call(expr, call, env),
            Expr::BinOp { op, left, right } => self.binop(*op, left, right, env),
            Expr::UnaryOp { op, operand } => {
                let (code, ty) = self.eval_scalar(operand, env, "operand")?;
                Ok(match op {
                    UnaryOp::Not => Value::scalar(format!("!({})", code), terminal("bool")),
                    UnaryOp::Neg => Value::scalar(format!("-({})", code), ty),
                    UnaryOp::Pos => Value::scalar(format!("+({})", code), ty),
                })
            }
            Expr::IfExpr { test, body, orelse } => self.if_expr(test, body, orelse, env),
            Expr::Tuple(items) | Expr::List(items) => Ok(Value::Tuple(
                items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<CodegenResult<_>>()?,
            )),
            Expr::Dict(entries) => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = key.as_str().ok_or_else(|| {
                        CodegenError::emission(format!("Dictionary key {} is not a string", key))
                    })?;
                    values.push((key.to_string(), self.eval(value, env)?));
                }
                Ok(Value::Dict(values))
            }
            Expr::Lambda(lambda) => Err(CodegenError::emission(format!(
                "The function {} cannot be used as a value",
                lambda
            ))),
            Expr::KnownFunction(_) | Expr::Injection(_) => Err(CodegenError::emission(format!(
                "{} must be called",
                expr
            ))),
        }
    }

    fn eval_scalar(&mut self, expr: &Expr, env: &Env, what: &str) -> CodegenResult<(String, CppType)> {
        let value = self.eval(expr, env)?;
        expect_scalar(value, what)
    }

    fn eval_args(&mut self, args: &[Expr], env: &Env, callee: &str) -> CodegenResult<Vec<String>> {
        args.iter()
            .map(|arg| {
                self.eval_scalar(arg, env, &format!("argument of {}", callee))
                    .map(|(code, _)| code)
            })
            .collect()
    }

    fn call(&mut self, expr: &Expr, call: &Call, env: &Env) -> CodegenResult<Value> {
        let Call { func, args } = call;
        match func.as_ref() {
            Expr::Name(name) => match name.as_str() {
                "Select" | "Where" | "SelectMany" => Ok(Value::Seq {
                    expr: expr.clone(),
                    env: env.clone(),
                }),
                "First" => self.open_sequence(expr, env),
                "Aggregate" => self.aggregate(args, env),
                EVENT_SOURCE => Ok(Value::Event),
                name if RESULT_FORMATS.contains(&name) => Err(CodegenError::emission(format!(
                    "{} must be the outermost call of a query",
                    name
                ))),
                other => Err(CodegenError::emission(format!(
                    "Unknown function '{}'",
                    other
                ))),
            },
            Expr::KnownFunction(function) => self.known_function(function, args, env),
            Expr::Injection(node) => self.injection(node, args, env),
            Expr::Attribute { value, attr } => {
                let object = self.eval(value, env)?;
                self.method_call(object, attr, args, env)
            }
            other => Err(CodegenError::emission(format!("Cannot call {}", other))),
        }
    }

    fn known_function(
        &mut self,
        function: &KnownFunction,
        args: &[Expr],
        env: &Env,
    ) -> CodegenResult<Value> {
        let args = self.eval_args(args, env, &function.name)?;
        push_unique(&mut self.includes, &function.include);
        Ok(Value::scalar(
            format!("{}({})", function.cpp_name, args.join(", ")),
            CppType::parse(&function.return_type),
        ))
    }

    fn injection(&mut self, node: &InjectionNode, args: &[Expr], env: &Env) -> CodegenResult<Value> {
        let receiver = match &node.receiver {
            Some(binding) => {
                let what = format!("receiver of {}", node.name);
                Some(self.eval_scalar(&binding.value, env, &what)?.0)
            }
            None => None,
        };
        let args = self.eval_args(args, env, &node.name)?;
        trace!(name = %node.name, "applying injection");
        let result = apply_injection(node, receiver, args, self)?;
        Ok(Value::scalar(result, node.result_type.clone()))
    }

    fn method_call(
        &mut self,
        object: Value,
        method: &str,
        args: &[Expr],
        env: &Env,
    ) -> CodegenResult<Value> {
        let (code, ty) = match object {
            Value::Scalar { code, ty } => (code, ty),
            Value::Event => {
                return Err(CodegenError::emission(format!(
                    "The event has no method {}; no collection of that name is known to this backend",
                    method
                )))
            }
            other => return Err(CodegenError::unresolvable(method, other.describe())),
        };

        let (return_type, deref_count) = match self.registry.lookup(ty.name(), method) {
            Some(info) => (info.return_type.clone(), info.deref_depth),
            None if is_primitive(&ty) => {
                return Err(CodegenError::unresolvable(method, ty.to_string()))
            }
            None => {
                warn!(owner = ty.name(), method, "no return type registered; assuming double");
                (terminal("double"), 0)
            }
        };

        let mut target = code;
        for _ in 0..deref_count {
            target = format!("(*{})", target);
        }
        let mut depth = ty.pointer_depth();
        while depth > 1 {
            target = format!("(*{})", target);
            depth -= 1;
        }
        let access = if depth >= 1 { "->" } else { "." };

        let args = self.eval_args(args, env, method)?;
        Ok(Value::scalar(
            format!("{}{}{}({})", target, access, method, args.join(", ")),
            return_type,
        ))
    }

    fn subscript(&mut self, value: &Expr, index: &Expr, env: &Env) -> CodegenResult<Value> {
        match self.eval(value, env)? {
            Value::Tuple(items) => {
                let position = match index {
                    Expr::Constant(Constant::Int(i)) => usize::try_from(*i).ok(),
                    _ => None,
                };
                position
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| {
                        CodegenError::emission(format!(
                            "Index {} is not valid for a tuple of {} values",
                            index,
                            items.len()
                        ))
                    })
            }
            Value::Dict(entries) => match index.as_str() {
                Some(key) => dict_entry(entries, key),
                None => Err(CodegenError::emission(format!(
                    "Dictionary index {} is not a string",
                    index
                ))),
            },
            Value::Scalar { code, ty } => {
                let element = ty.element_type().cloned().ok_or_else(|| {
                    CodegenError::emission(format!("Cannot index {} of type {}", code, ty))
                })?;
                let (position, _) = self.eval_scalar(index, env, "index")?;
                let access = if ty.is_pointer() { "->" } else { "." };
                Ok(Value::scalar(
                    format!("{}{}at({})", code, access, position),
                    element,
                ))
            }
            other => Err(CodegenError::emission(format!(
                "Cannot index {}",
                other.describe()
            ))),
        }
    }

    fn binop(&mut self, op: BinaryOp, left: &Expr, right: &Expr, env: &Env) -> CodegenResult<Value> {
        if op == BinaryOp::FloorDiv {
            return Err(CodegenError::UnsupportedOperator {
                op: "FloorDiv (//)".to_string(),
            });
        }
        let (l, left_ty) = self.eval_scalar(left, env, "left operand")?;
        let (r, right_ty) = self.eval_scalar(right, env, "right operand")?;

        if op == BinaryOp::Pow {
            push_unique(&mut self.includes, CMATH);
            return Ok(Value::scalar(format!("std::pow({}, {})", l, r), terminal("double")));
        }
        let ty = if op.is_boolean() {
            terminal("bool")
        } else {
            promote(&left_ty, &right_ty)
        };
        Ok(Value::scalar(format!("({}{}{})", l, cpp_operator(op), r), ty))
    }

    fn if_expr(&mut self, test: &Expr, body: &Expr, orelse: &Expr, env: &Env) -> CodegenResult<Value> {
        let (test, _) = self.eval_scalar(test, env, "condition")?;
        let result = self.fresh("if_else_result");
        let declaration = self.buffer.reserve();
        let base = self.buffer.depth();

        self.buffer.add_line(format!("if ({})", test));
        self.buffer.open_block();
        let (then_code, then_ty) = self.eval_scalar(body, env, "if branch")?;
        self.buffer.add_line(format!("{} = {};", result, then_code));
        self.buffer.close_to(base)?;

        self.buffer.add_line("else");
        self.buffer.open_block();
        let (else_code, else_ty) = self.eval_scalar(orelse, env, "else branch")?;
        self.buffer.add_line(format!("{} = {};", result, else_code));
        self.buffer.close_to(base)?;

        let ty = promote(&then_ty, &else_ty);
        self.buffer.fill(declaration, format!("{} {};", ty, result));
        Ok(Value::scalar(result, ty))
    }

    /// Call a lambda with already evaluated arguments
    fn apply(&mut self, function: &Expr, args: Vec<Value>, env: &Env) -> CodegenResult<Value> {
        let Expr::Lambda(lambda) = function else {
            return Err(CodegenError::emission(format!(
                "Expected a function, found {}",
                function
            )));
        };
        if lambda.params.len() != args.len() {
            return Err(CodegenError::emission(format!(
                "The function {} takes {} arguments, given {}",
                lambda,
                lambda.params.len(),
                args.len()
            )));
        }
        let mut scope = env.clone();
        scope.extend(lambda.params.iter().cloned().zip(args));
        self.eval(&lambda.body, &scope)
    }

    /// Open the loops for `expr` and return its current element. The loops
    /// stay open.
    fn open_sequence(&mut self, expr: &Expr, env: &Env) -> CodegenResult<Value> {
        let Some(Call { func, args }) = expr.as_call() else {
            let value = self.eval(expr, env)?;
            return self.open_value(value);
        };
        let name = match func.as_ref() {
            Expr::Name(name) => name.as_str(),
            _ => "",
        };
        match (name, args.as_slice()) {
            ("Select", [source, f]) => {
                let element = self.open_sequence(source, env)?;
                self.apply(f, vec![element], env)
            }
            ("Where", [source, f]) => {
                let element = self.open_sequence(source, env)?;
                let keep = self.apply(f, vec![element.clone()], env)?;
                let (keep, _) = expect_scalar(keep, "Where condition")?;
                self.buffer.add_line(format!("if ({})", keep));
                self.buffer.open_block();
                Ok(element)
            }
            ("SelectMany", [source, f]) => {
                let element = self.open_sequence(source, env)?;
                let inner = self.apply(f, vec![element], env)?;
                self.open_value(inner)
            }
            ("First", [source]) => {
                let flag = self.fresh("is_first");
                self.buffer.add_line(format!("bool {}(true);", flag));
                let element = self.open_sequence(source, env)?;
                self.buffer.add_line(format!("if ({})", flag));
                self.buffer.open_block();
                self.buffer.add_line(format!("{} = false;", flag));
                Ok(element)
            }
            ("Select" | "Where" | "SelectMany" | "First", _) => Err(CodegenError::emission(
                format!("{} called with {} arguments", name, args.len()),
            )),
            _ => {
                let value = self.eval(expr, env)?;
                self.open_value(value)
            }
        }
    }

    /// Loop over an evaluated sequence
    fn open_value(&mut self, value: Value) -> CodegenResult<Value> {
        match value {
            // one pass per event
            Value::Event => Ok(Value::Event),
            Value::Seq { expr, env } => self.open_sequence(&expr, &env),
            Value::Scalar { code, ty } => {
                let element = ty.element_type().cloned().ok_or_else(|| {
                    CodegenError::emission(format!("Unable to loop over {} of type {}", code, ty))
                })?;
                let var = self.fresh("i_obj");
                let target = format!("{}{}", "*".repeat(ty.pointer_depth()), code);
                self.buffer
                    .add_line(format!("for (auto&& {} : {})", var, target));
                self.buffer.open_block();
                Ok(Value::scalar(var, element))
            }
            other => Err(CodegenError::emission(format!(
                "Unable to loop over {}",
                other.describe()
            ))),
        }
    }

    fn aggregate(&mut self, args: &[Expr], env: &Env) -> CodegenResult<Value> {
        let (source, seed, fold) = match args {
            [source, fold] => (source, None, fold),
            [source, seed, fold] => (source, Some(seed), fold),
            _ => {
                return Err(CodegenError::emission(format!(
                    "Aggregate takes a source, an optional seed and a function; given {} arguments",
                    args.len()
                )))
            }
        };
        let lambda = fold.as_lambda().ok_or_else(|| {
            CodegenError::emission(format!("Aggregate needs a function, found {}", fold))
        })?;
        let [acc_name, value_name] = lambda.params.as_slice() else {
            return Err(CodegenError::emission(format!(
                "The Aggregate function {} must take (accumulator, value)",
                lambda
            )));
        };

        let result = self.fresh("agg");

        let ty = match seed {
            Some(seed) => {
                // the seed may emit statements of its own; declare after them
                let (seed_code, seed_ty) = self.eval_scalar(seed, env, "Aggregate seed")?;
                let declaration = self.buffer.reserve();
                let base = self.buffer.depth();
                let source = self.eval(source, env)?;
                let element = self.open_value(source)?;

                let mut scope = env.clone();
                scope.insert(acc_name.clone(), Value::scalar(&result, seed_ty.clone()));
                scope.insert(value_name.clone(), element);
                let (next, next_ty) = self.eval_scalar(&lambda.body, &scope, "Aggregate result")?;
                self.buffer.add_line(format!("{} = {};", result, next));
                self.buffer.close_to(base)?;

                let ty = promote(&seed_ty, &next_ty);
                self.buffer
                    .fill(declaration, format!("{} {} = {};", ty, result, seed_code));
                ty
            }
            None => {
                // the first element seeds the fold
                let declaration = self.buffer.reserve();
                let flag = self.fresh("is_first");
                self.buffer.add_line(format!("bool {}(true);", flag));
                let base = self.buffer.depth();
                let source = self.eval(source, env)?;
                let element = self.open_value(source)?;
                let (first, element_ty) = expect_scalar(element.clone(), "Aggregate element")?;

                self.buffer.add_line(format!("if ({})", flag));
                self.buffer.open_block();
                self.buffer.add_line(format!("{} = false;", flag));
                self.buffer.add_line(format!("{} = {};", result, first));
                self.buffer.close_block()?;
                self.buffer.add_line("else");
                self.buffer.open_block();

                let mut scope = env.clone();
                scope.insert(acc_name.clone(), Value::scalar(&result, element_ty.clone()));
                scope.insert(value_name.clone(), element);
                let (next, _) = self.eval_scalar(&lambda.body, &scope, "Aggregate result")?;
                self.buffer.add_line(format!("{} = {};", result, next));
                self.buffer.close_to(base)?;

                let initial = if is_primitive(&element_ty) || element_ty.is_pointer() {
                    " = 0"
                } else {
                    ""
                };
                self.buffer
                    .fill(declaration, format!("{} {}{};", element_ty, result, initial));
                element_ty
            }
        };
        Ok(Value::scalar(result, ty))
    }

    /// Assign one cell of the row to its member and return the branch type
    fn write_column(&mut self, column: &str, member: &str, value: Value) -> CodegenResult<String> {
        if value.is_sequence() {
            let ty = self.fill_vector(column, member, value)?;
            self.members.push(format!("{} {};", ty, member));
            return Ok(ty);
        }
        match value {
            Value::Scalar { code, ty } => {
                if ty.is_pointer() {
                    return Err(CodegenError::emission(format!(
                        "Column {} holds the object type {}; select a value from it",
                        column, ty
                    )));
                }
                self.members.push(format!("{} {};", ty, member));
                self.buffer.add_line(format!("{} = {};", member, code));
                Ok(ty.to_string())
            }
            other => Err(nested_structure(column, &other)),
        }
    }

    /// Fill `target` from a sequence with `clear`/`push_back`. Returns the
    /// vector type; sequences of sequences nest.
    fn fill_vector(&mut self, column: &str, target: &str, sequence: Value) -> CodegenResult<String> {
        self.buffer.add_line(format!("{}.clear();", target));
        let base = self.buffer.depth();
        let element = self.open_value(sequence)?;

        let element_ty = if element.is_sequence() {
            let inner = self.fresh("ntuple_vec");
            let declaration = self.buffer.reserve();
            let inner_ty = self.fill_vector(column, &inner, element)?;
            self.buffer.fill(declaration, format!("{} {};", inner_ty, inner));
            self.buffer
                .add_line(format!("{}.push_back({});", target, inner));
            inner_ty
        } else {
            match element {
                Value::Scalar { code, ty } if !ty.is_pointer() => {
                    self.buffer
                        .add_line(format!("{}.push_back({});", target, code));
                    ty.to_string()
                }
                Value::Scalar { ty, .. } => {
                    return Err(CodegenError::emission(format!(
                        "Column {} holds objects of type {}; select a value from them",
                        column, ty
                    )))
                }
                other => return Err(nested_structure(column, &other)),
            }
        };
        self.buffer.close_to(base)?;
        Ok(format!("std::vector<{}>", element_ty))
    }
}

fn constant_value(constant: &Constant) -> CodegenResult<Value> {
    Ok(match constant {
        Constant::Int(i) if i32::try_from(*i).is_ok() => Value::scalar(i.to_string(), terminal("int")),
        Constant::Int(i) => Value::scalar(format!("{}LL", i), terminal("long long")),
        Constant::Float(x) => Value::scalar(format!("{:?}", x), terminal("double")),
        Constant::Str(s) => Value::scalar(string_literal(s), terminal("std::string")),
        Constant::Bool(b) => Value::scalar(b.to_string(), terminal("bool")),
        Constant::None => {
            return Err(CodegenError::emission("None has no value in generated code"))
        }
    })
}

fn dict_entry(entries: Vec<(String, Value)>, key: &str) -> CodegenResult<Value> {
    entries
        .into_iter()
        .find_map(|(k, v)| (k == key).then_some(v))
        .ok_or_else(|| CodegenError::emission(format!("The dictionary has no key '{}'", key)))
}

fn expect_scalar(value: Value, what: &str) -> CodegenResult<(String, CppType)> {
    match value {
        Value::Scalar { code, ty } => Ok((code, ty)),
        other => Err(CodegenError::emission(format!(
            "The {} must be a single value, found {}",
            what,
            other.describe()
        ))),
    }
}

impl DeclareVariable for State<'_> {
    fn declare_variable(&mut self, hint: &str, ty: &CppType) -> String {
        let name = self.fresh(hint);
        self.buffer.add_line(format!("{} {};", ty, name));
        name
    }
}

impl InjectionContext for State<'_> {
    fn add_include(&mut self, file: &str) {
        push_unique(&mut self.includes, file);
    }

    fn add_link_library(&mut self, library: &str) {
        push_unique(&mut self.link_libraries, library);
    }

    fn add_init_line(&mut self, line: &str) {
        push_unique(&mut self.init_lines, line);
    }

    fn open_block(&mut self) {
        self.buffer.open_block();
    }

    fn add_line(&mut self, line: &str) {
        self.buffer.add_line(line);
    }

    fn close_block(&mut self) -> CodegenResult<()> {
        self.buffer.close_block()
    }
}
