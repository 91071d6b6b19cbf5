//! The query tree.
//!
//! A query is a single expression. Sequence operators are ordinary calls
//! (`Select(source, lambda)`), so every pass works on one closed enum and
//! rebuilds nodes through [`Expr::try_map_children`].

use crate::injection::InjectionNode;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    Str(String),
    /// `True` / `False`
    Bool(bool),
    /// `None`
    None,
}

/// Binary operators, arithmetic then comparison then boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    And,
    Or,
}

impl BinaryOp {
    /// Operator as written in query text
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// True for operators that produce a boolean
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::NotEq | Self::And | Self::Or
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

/// A call: `func(args...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
}

/// An anonymous function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Box<Expr>,
}

impl Lambda {
    /// The parameter of a one-argument lambda
    pub fn single_param(&self) -> Option<&str> {
        match self.params.as_slice() {
            [p] => Some(p),
            _ => None,
        }
    }
}

/// A call target resolved to a C++ standard library function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFunction {
    /// Name as written in the query
    pub name: String,
    /// Fully qualified C++ name, e.g. `std::sqrt`
    pub cpp_name: String,
    /// Header that declares it
    pub include: String,
    /// C++ return type
    pub return_type: String,
}

/// A node of the query tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Constant(Constant),
    Name(String),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Call(Call),
    BinOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `body if test else orelse`
    IfExpr {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Lambda(Lambda),
    /// Callee rewritten to a C++ standard function
    KnownFunction(KnownFunction),
    /// Callee rewritten to injected backend code
    Injection(Box<InjectionNode>),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Constant(Constant::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::Constant(Constant::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Constant(Constant::Float(value))
    }

    pub fn attr(value: Expr, attr: impl Into<String>) -> Self {
        Self::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Self::Call(Call {
            func: Box::new(func),
            args,
        })
    }

    /// `name(args...)`
    pub fn call_named(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(Self::name(name), args)
    }

    /// `value.method(args...)`
    pub fn method(value: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(Self::attr(value, method), args)
    }

    pub fn lambda(params: Vec<String>, body: Expr) -> Self {
        Self::Lambda(Lambda {
            params,
            body: Box::new(body),
        })
    }

    pub fn binop(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The call, if this node is one
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Self::Call(call) => Some(call),
            _ => None,
        }
    }

    /// The lambda, if this node is one
    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            Self::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    /// The string value of a string constant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Constant(Constant::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// For `name(...)`, the name
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Self::Call(Call { func, .. }) => match func.as_ref() {
                Self::Name(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Rebuild this node with `f` applied to each direct child.
    ///
    /// Lambda bodies are children; lambda parameters are not. The receiver
    /// bound into an injection node is a child.
    pub fn try_map_children<E, F>(self, mut f: F) -> Result<Expr, E>
    where
        F: FnMut(Expr) -> Result<Expr, E>,
    {
        Ok(match self {
            leaf @ (Self::Constant(_) | Self::Name(_) | Self::KnownFunction(_)) => leaf,
            Self::Attribute { value, attr } => Self::Attribute {
                value: Box::new(f(*value)?),
                attr,
            },
            Self::Subscript { value, index } => Self::Subscript {
                value: Box::new(f(*value)?),
                index: Box::new(f(*index)?),
            },
            Self::Call(Call { func, args }) => {
                let func = Box::new(f(*func)?);
                let args = args.into_iter().map(&mut f).collect::<Result<Vec<_>, E>>()?;
                Self::Call(Call { func, args })
            }
            Self::BinOp { op, left, right } => Self::BinOp {
                op,
                left: Box::new(f(*left)?),
                right: Box::new(f(*right)?),
            },
            Self::UnaryOp { op, operand } => Self::UnaryOp {
                op,
                operand: Box::new(f(*operand)?),
            },
            Self::IfExpr { test, body, orelse } => Self::IfExpr {
                test: Box::new(f(*test)?),
                body: Box::new(f(*body)?),
                orelse: Box::new(f(*orelse)?),
            },
            Self::Tuple(items) => {
                Self::Tuple(items.into_iter().map(&mut f).collect::<Result<_, E>>()?)
            }
            Self::List(items) => {
                Self::List(items.into_iter().map(&mut f).collect::<Result<_, E>>()?)
            }
            Self::Dict(entries) => {
                let mut mapped = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    mapped.push((f(k)?, f(v)?));
                }
                Self::Dict(mapped)
            }
            Self::Lambda(Lambda { params, body }) => Self::Lambda(Lambda {
                params,
                body: Box::new(f(*body)?),
            }),
            Self::Injection(mut node) => {
                if let Some(receiver) = node.receiver.as_mut() {
                    let value = std::mem::replace(&mut receiver.value, Expr::Tuple(Vec::new()));
                    receiver.value = f(value)?;
                }
                Self::Injection(node)
            }
        })
    }

    /// Infallible form of [`Expr::try_map_children`]
    pub fn map_children<F>(self, mut f: F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        match self.try_map_children(|e| Ok::<_, Infallible>(f(e))) {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }

    /// Visit each direct child in evaluation order
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match self {
            Self::Constant(_) | Self::Name(_) | Self::KnownFunction(_) => {}
            Self::Attribute { value, .. } => f(value),
            Self::Subscript { value, index } => {
                f(value);
                f(index);
            }
            Self::Call(Call { func, args }) => {
                f(func);
                args.iter().for_each(&mut f);
            }
            Self::BinOp { left, right, .. } => {
                f(left);
                f(right);
            }
            Self::UnaryOp { operand, .. } => f(operand),
            Self::IfExpr { test, body, orelse } => {
                f(test);
                f(body);
                f(orelse);
            }
            Self::Tuple(items) | Self::List(items) => items.iter().for_each(&mut f),
            Self::Dict(entries) => {
                for (k, v) in entries {
                    f(k);
                    f(v);
                }
            }
            Self::Lambda(Lambda { body, .. }) => f(body),
            Self::Injection(node) => {
                if let Some(receiver) = &node.receiver {
                    f(&receiver.value);
                }
            }
        }
    }

    /// True if any node in this tree satisfies `pred`
    pub fn any(&self, pred: &impl Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        let mut found = false;
        self.for_each_child(|child| found = found || child.any(pred));
        found
    }
}

impl From<Constant> for Expr {
    fn from(c: Constant) -> Self {
        Self::Constant(c)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{:?}", x),
            // quotes, backslashes and control characters come out escaped
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::None => f.write_str("None"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params.as_slice() {
            [p] => write!(f, "{} => {}", p, self.body),
            params => write!(f, "({}) => {}", params.join(", "), self.body),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "{}", c),
            Self::Name(n) => f.write_str(n),
            Self::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Self::Subscript { value, index } => write!(f, "{}[{}]", value, index),
            Self::Call(Call { func, args }) => {
                write!(f, "{}(", func)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::BinOp { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Self::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "(not {})", operand),
                UnaryOp::Neg => write!(f, "(-{})", operand),
                UnaryOp::Pos => write!(f, "(+{})", operand),
            },
            Self::IfExpr { test, body, orelse } => {
                write!(f, "({} if {} else {})", body, test, orelse)
            }
            Self::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Self::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Self::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Self::Lambda(lambda) => write!(f, "{}", lambda),
            Self::KnownFunction(func) => f.write_str(&func.name),
            Self::Injection(node) => write!(f, "<inject:{}>", node.name),
        }
    }
}
