//! Artifact writers.

use crate::artifact::TranslationArtifact;
use crate::error::{CodegenError, CodegenResult};
use adl_config::{check_executable, ConfigError, OutputConfig};
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// Files a writer produces from the artifact, and the one that is run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPlan {
    pub files: Vec<String>,
    pub executable: String,
}

impl OutputPlan {
    /// The executable must appear among the files exactly once
    pub fn validate(&self) -> CodegenResult<()> {
        check_executable(&self.files, &self.executable).map_err(|err| match err {
            ConfigError::Invalid(message) => CodegenError::Output(message),
            other => other.into(),
        })
    }
}

impl From<OutputConfig> for OutputPlan {
    fn from(config: OutputConfig) -> Self {
        Self {
            files: config.files,
            executable: config.executable,
        }
    }
}

/// Receives the finished artifact
pub trait ArtifactWriter {
    fn write(&mut self, artifact: &TranslationArtifact, plan: &OutputPlan) -> CodegenResult<()>;
}

/// Keeps every artifact it is given
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub written: Vec<(TranslationArtifact, OutputPlan)>,
}

impl ArtifactWriter for MemoryWriter {
    fn write(&mut self, artifact: &TranslationArtifact, plan: &OutputPlan) -> CodegenResult<()> {
        self.written.push((artifact.clone(), plan.clone()));
        Ok(())
    }
}

/// Writes the plan and artifact as one pretty-printed JSON document
pub struct JsonWriter<W: Write> {
    out: W,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    plan: &'a OutputPlan,
    artifact: &'a TranslationArtifact,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ArtifactWriter for JsonWriter<W> {
    fn write(&mut self, artifact: &TranslationArtifact, plan: &OutputPlan) -> CodegenResult<()> {
        serde_json::to_writer_pretty(&mut self.out, &JsonDocument { plan, artifact })
            .map_err(|e| CodegenError::output(e.to_string()))?;
        writeln!(self.out).map_err(|e| CodegenError::output(e.to_string()))?;
        info!(files = plan.files.len(), executable = %plan.executable, "wrote artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adl_config::BackendKind;

    #[test]
    fn test_plan_from_config() {
        let plan = OutputPlan::from(OutputConfig::for_backend(BackendKind::Atlas));
        assert!(plan.files.contains(&"query.cxx".to_string()));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_duplicate_executable() {
        let plan = OutputPlan {
            files: vec!["runner.sh".into(), "runner.sh".into()],
            executable: "runner.sh".into(),
        };
        let err = plan.validate().unwrap_err();
        let from_config = OutputConfig {
            files: plan.files.clone(),
            executable: plan.executable.clone(),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, CodegenError::Output(_)));
        assert_eq!(err.to_string(), "Output failed: output file 'runner.sh' is listed more than once");
        assert!(from_config.to_string().ends_with("output file 'runner.sh' is listed more than once"));
    }

    #[test]
    fn test_missing_executable() {
        let plan = OutputPlan {
            files: vec!["query.cxx".into()],
            executable: "runner.sh".into(),
        };
        assert!(plan
            .validate()
            .unwrap_err()
            .to_string()
            .contains("executable 'runner.sh' is not one of the output files"));
    }

    #[test]
    fn test_json_writer() {
        let plan = OutputPlan::from(OutputConfig::for_backend(BackendKind::Cms));
        let mut writer = JsonWriter::new(Vec::new());
        writer.write(&TranslationArtifact::default(), &plan).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(value["plan"]["executable"], "runner.sh");
        assert_eq!(value["artifact"]["backend"], "atlas");
    }
}
