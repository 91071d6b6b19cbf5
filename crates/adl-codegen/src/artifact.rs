//! The translation artifact handed to file writers.

use crate::directive::{Directive, JobScript};
use crate::emit::{push_unique, Emission, ResultDescriptor};
use adl_config::BackendKind;
use serde::{Deserialize, Serialize};

/// Everything the backend templates need for one query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranslationArtifact {
    pub backend: BackendKind,
    /// Per-event code, raw directive code first
    pub query_lines: Vec<String>,
    /// Output tree booking
    pub book_lines: Vec<String>,
    /// Initialize step
    pub init_lines: Vec<String>,
    /// Member declarations from emission
    pub class_decl: Vec<String>,
    /// Member declarations from `inject_code`
    pub private_members: Vec<String>,
    pub ctor_lines: Vec<String>,
    pub instance_initialization: Vec<String>,
    /// Includes for the algorithm body
    pub include_files: Vec<String>,
    /// Includes for the algorithm header
    pub header_include_files: Vec<String>,
    pub link_libraries: Vec<String>,
    pub job_scripts: Vec<JobScript>,
    pub result: Option<ResultDescriptor>,
}

impl TranslationArtifact {
    /// Combine emitted code with directive contributions. Emitted lines come
    /// first everywhere except the per-event code, where raw running code is
    /// placed ahead of the query loops.
    pub fn assemble(backend: BackendKind, emission: Emission, directives: &[Directive]) -> Self {
        let mut artifact = Self {
            backend,
            book_lines: emission.book_lines,
            init_lines: emission.init_lines,
            class_decl: emission.class_decl,
            include_files: emission.include_files,
            link_libraries: emission.link_libraries,
            result: emission.result,
            ..Self::default()
        };

        let mut running = Vec::new();
        for directive in directives {
            match directive {
                Directive::InjectCode(code) => {
                    extend_unique(&mut artifact.include_files, &code.includes);
                    extend_unique(&mut artifact.header_include_files, &code.header_includes);
                    extend_unique(&mut artifact.link_libraries, &code.link_libraries);
                    artifact.private_members.extend(code.private_members.iter().cloned());
                    artifact
                        .instance_initialization
                        .extend(code.instance_initialization.iter().cloned());
                    artifact.ctor_lines.extend(code.ctor_lines.iter().cloned());
                    artifact.init_lines.extend(code.init_code.iter().cloned());
                    running.extend(code.running_code.iter().cloned());
                }
                Directive::JobScript(script) => artifact.job_scripts.push(script.clone()),
                _ => {}
            }
        }
        running.extend(emission.query_lines);
        artifact.query_lines = running;
        artifact
    }
}

fn extend_unique(list: &mut Vec<String>, items: &[String]) {
    for item in items {
        push_unique(list, item);
    }
}
