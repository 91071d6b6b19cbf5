//! C++ type tracking for generated code.
//!
//! The code generator never compiles or runs the C++ it produces, but it still
//! has to know what `j.pt()` returns, or whether `t.prodVtx()` hands back a
//! pointer that must be followed with `->`. This crate holds that knowledge:
//!
//! - [`ParsedTypeInfo`] and [`parse_type`] turn `const Foo**` style text into
//!   a name, a pointer depth, and a const marker
//! - [`TerminalType`], [`CollectionType`] and [`CppType`] describe values the
//!   generator reasons about
//! - [`TypeRegistry`] maps `(owner type, method)` to the method's return type
//!   and the number of dereferences the call needs
//!
//! The registry is a plain value. A compile starts from a backend's defaults,
//! layers per-query overrides on top, and threads it through translation.
//!
//! ```
//! use adl_types::{parse_type, TerminalType, TypeRegistry};
//!
//! let info = parse_type("const Foo**");
//! assert_eq!(info.pointer_depth, 2);
//!
//! let mut registry = TypeRegistry::new();
//! registry.register("xAOD::Jet", "pt", TerminalType::new("double"), 0);
//! assert!(registry.lookup("xAOD::Jet", "pt").is_some());
//! ```

mod error;
mod parsed;
mod registry;
mod types;

pub use error::{TypeError, TypeResult};
pub use parsed::{parse_type, ParsedTypeInfo};
pub use registry::{MethodInvokeInfo, TypeRegistry};
pub use types::{CollectionType, CppType, TerminalType};
