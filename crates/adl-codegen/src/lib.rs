//! C++ generation for event-data queries.
//!
//! This crate takes a query tree from `adl-query` to the C++ fragments an
//! ATLAS xAOD or CMS AOD analysis job is built from:
//!
//! - [`directive`]: `MetaData` blocks accepted as typed directives
//! - [`inject`]: backend code exposed to queries as ordinary calls
//! - [`catalog`]: per-backend event collections and method types
//! - [`emit`]: the loop emitter and ntuple dialects
//! - [`pipeline`]: the stages wired together
//!
//! ```
//! use adl_codegen::TranslationPipeline;
//! use adl_config::{BackendKind, CompilerConfig};
//!
//! let pipeline = TranslationPipeline::new(CompilerConfig::for_backend(BackendKind::Atlas)).unwrap();
//! let artifact = pipeline
//!     .compile_text("EventDataset().SelectMany(e => e.Jets()).Select(j => j.pt() / 1000.0)")
//!     .unwrap();
//! assert!(artifact.query_lines.iter().any(|l| l.contains("(i_obj1->pt()/1000.0)")));
//! ```

pub mod artifact;
pub mod catalog;
pub mod directive;
pub mod emit;
pub mod error;
pub mod inject;
pub mod pipeline;
pub mod writer;

pub use artifact::TranslationArtifact;
pub use catalog::{backend_for, AtlasBackend, Backend, CmsBackend, CollectionEntry};
pub use directive::{accept_directives, Directive};
pub use emit::{ColumnInfo, Emission, EmissionVisitor, LoopEmitter, NtupleDialect, ResultDescriptor};
pub use error::{CodegenError, CodegenResult};
pub use inject::{apply_injection, build_injection, rewrite_calls, CodeInjectionSpec, InjectionContext};
pub use pipeline::TranslationPipeline;
pub use writer::{ArtifactWriter, JsonWriter, MemoryWriter, OutputPlan};
