//! Functional event-data queries.
//!
//! A query is a tree of combinator calls over per-event collections:
//!
//! ```text
//! EventDataset()
//!     .Select(e => e.Jets("AntiKt4EMTopoJets"))
//!     .Select(jets => jets.Where(j => j.pt() > 30000.0).Count())
//! ```
//!
//! This crate owns that tree ([`Expr`]), a text parser for it
//! ([`parse_query`]), `MetaData` block extraction ([`extract_metadata`]) and
//! the normalization passes in [`transform`] that reduce the surface sugar
//! to the core the code generator consumes.
//!
//! ```
//! use adl_query::{normalize, parse_query};
//!
//! let query = parse_query("EventDataset().Select(e => e.Jets()).Select(js => js.Count())").unwrap();
//! let core = normalize(query).unwrap();
//! assert_eq!(
//!     core.to_string(),
//!     "Select(EventDataset(), e => Aggregate(e.Jets(), 0, (acc, v) => (acc + 1)))"
//! );
//! ```

pub mod ast;
pub mod error;
pub mod injection;
pub mod metadata;
pub mod parser;
pub mod transform;

pub use ast::{BinaryOp, Call, Constant, Expr, KnownFunction, Lambda, UnaryOp};
pub use error::{ParseError, TransformError};
pub use injection::{CodeTemplate, DeclareVariable, InjectionNode, ReceiverBinding, Segment};
pub use metadata::{extract_metadata, MetadataBlock, METADATA};
pub use parser::parse_query;
pub use transform::{normalize, QueryTransform, ValidateRoot};
