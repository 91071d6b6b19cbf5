//! # adlc configuration
//!
//! Type-safe configuration for the query code generator.
//!
//! ## Example TOML
//!
//! ```toml
//! backend = "atlas"
//!
//! [ntuple]
//! tree_name = "atlas_xaod_tree"
//! file_name = "ANALYSIS.root"
//!
//! [logging]
//! level = "debug"
//!
//! [[method_types]]
//! type_string = "xAOD::Jet"
//! method_name = "jvt"
//! return_type = "float"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adl_config::ConfigLoader;
//!
//! let config = ConfigLoader::load_or_default(None)?;
//! println!("compiling for {}", config.backend);
//! # Ok::<(), adl_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::*;
