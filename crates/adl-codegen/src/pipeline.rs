//! The translation pipeline.
//!
//! `text -> tree -> (directives, bare tree) -> normalized -> injected ->
//! rooted -> emitted -> artifact -> writer`. Every stage either succeeds or
//! ends the compile; the writer only ever sees a finished artifact.

use crate::artifact::TranslationArtifact;
use crate::catalog::{backend_for, declare_accessors, register_collection, Backend, CollectionEntry};
use crate::directive::{accept_directives, Directive};
use crate::emit::{EmissionVisitor, LoopEmitter};
use crate::error::CodegenResult;
use crate::inject::{rewrite_calls, CodeInjectionSpec, RewriterMap};
use crate::writer::{ArtifactWriter, OutputPlan};
use adl_config::CompilerConfig;
use adl_query::transform::QueryTransform;
use adl_query::{extract_metadata, normalize, parse_query, Expr, ValidateRoot};
use adl_types::{CppType, TypeRegistry};
use std::sync::Arc;
use tracing::{debug, info};

/// Compiles queries for one configured backend
pub struct TranslationPipeline {
    config: CompilerConfig,
    backend: Box<dyn Backend>,
}

impl TranslationPipeline {
    pub fn new(config: CompilerConfig) -> CodegenResult<Self> {
        config.validate()?;
        let backend = backend_for(config.backend);
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The emitter used when none is supplied
    pub fn default_emitter(&self) -> LoopEmitter {
        LoopEmitter::new(
            self.backend.ntuple_dialect(),
            self.config.tree_name(),
            self.config.ntuple_file_name(),
        )
    }

    /// Parse and compile query text
    pub fn compile_text(&self, text: &str) -> CodegenResult<TranslationArtifact> {
        self.compile(parse_query(text)?)
    }

    /// Compile with the default emitter
    pub fn compile(&self, query: Expr) -> CodegenResult<TranslationArtifact> {
        let mut emitter = self.default_emitter();
        self.compile_with(query, &mut emitter)
    }

    /// Compile, delegating code emission to `visitor`
    pub fn compile_with(
        &self,
        query: Expr,
        visitor: &mut dyn EmissionVisitor,
    ) -> CodegenResult<TranslationArtifact> {
        let (query, blocks) = extract_metadata(query)?;
        let directives = accept_directives(&blocks, self.config.backend)?;
        debug!(stage = "directives", count = directives.len(), "accepted metadata");

        let query = normalize(query)?;
        debug!(stage = "normalize", tree = %query, "normalized");

        let registry = self.build_registry(&directives)?;
        let rewriters = self.build_rewriters(&directives)?;
        let query = rewrite_calls(query, &rewriters)?;
        debug!(stage = "inject", rewriters = rewriters.len(), "rewrote injected calls");

        let query = ValidateRoot::new(self.config.tree_name(), self.config.ntuple_file_name())
            .transform(query)?;
        debug!(stage = "validate_root", "root accepted");

        let emission = visitor.emit(&query, &registry)?;
        debug!(stage = "emit", lines = emission.query_lines.len(), "emitted code");

        Ok(TranslationArtifact::assemble(
            self.config.backend,
            emission,
            &directives,
        ))
    }

    /// Compile and hand the artifact to `writer`. Nothing is written if any
    /// stage fails.
    pub fn translate(
        &self,
        query: Expr,
        writer: &mut dyn ArtifactWriter,
    ) -> CodegenResult<TranslationArtifact> {
        let plan = OutputPlan::from(self.config.output_plan());
        plan.validate()?;
        let artifact = self.compile(query)?;
        writer.write(&artifact, &plan)?;
        info!(backend = %self.config.backend, "translation complete");
        Ok(artifact)
    }

    /// Backend defaults, then configured overrides, then directives
    pub fn build_registry(&self, directives: &[Directive]) -> CodegenResult<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        self.backend.seed_types(&mut registry);
        for entry in &self.config.method_types {
            registry.register(
                &entry.type_string,
                &entry.method_name,
                CppType::parse(&entry.return_type),
                entry.deref_count,
            );
        }
        for directive in directives {
            match directive {
                Directive::MethodType(info) => registry.register(
                    &info.type_string,
                    &info.method_name,
                    info.cpp_return_type()?,
                    info.deref_count,
                ),
                Directive::CppFunction(function) => {
                    if let Some(owner) = &function.method_object {
                        registry.register(
                            owner,
                            &function.name,
                            CppType::parse(&function.return_type),
                            0,
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(registry)
    }

    /// Built-in accessors, then directive collections, then directive
    /// functions; a later name replaces an earlier one
    pub fn build_rewriters(&self, directives: &[Directive]) -> CodegenResult<RewriterMap> {
        let backend = self.backend.as_ref();
        let mut rewriters = declare_accessors(backend);
        for directive in directives {
            if let Directive::Collection(info) = directive {
                register_collection(&mut rewriters, CollectionEntry::from_info(info, backend)?, backend);
            }
        }
        for directive in directives {
            if let Directive::CppFunction(function) = directive {
                rewriters.insert(
                    function.name.clone(),
                    Arc::new(CodeInjectionSpec::from_function(function)),
                );
            }
        }
        Ok(rewriters)
    }
}
