//! Configuration structures

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target analysis framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ATLAS xAOD EventLoop algorithm
    #[default]
    Atlas,
    /// CMS AOD EDAnalyzer
    Cms,
}

impl BackendKind {
    /// Experiment tag used by metadata directives
    pub fn experiment(&self) -> &'static str {
        match self {
            Self::Atlas => "atlas",
            Self::Cms => "cms",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.experiment())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "atlas" => Ok(Self::Atlas),
            "cms" => Ok(Self::Cms),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Top-level compiler configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Backend to generate code for
    #[serde(default)]
    pub backend: BackendKind,
    /// Default ntuple naming, used when a query does not name its output
    #[serde(default)]
    pub ntuple: NtupleConfig,
    /// Output file plan; backend defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
    /// Logging settings for the command-line front end
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extra method return types layered over the backend defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub method_types: Vec<MethodTypeConfig>,
}

impl CompilerConfig {
    /// Default configuration for a backend
    pub fn for_backend(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Tree name for auto-wrapped queries
    pub fn tree_name(&self) -> String {
        self.ntuple
            .tree_name
            .clone()
            .unwrap_or_else(|| format!("{}_tree", self.backend.experiment()))
    }

    /// Output file name for auto-wrapped queries
    pub fn ntuple_file_name(&self) -> String {
        self.ntuple
            .file_name
            .clone()
            .unwrap_or_else(|| "ANALYSIS.root".to_string())
    }

    /// The configured output plan, or the backend default. The default
    /// follows `backend`, so it changes when the backend is overridden; an
    /// explicit `[output]` plan is kept as written.
    pub fn output_plan(&self) -> OutputConfig {
        self.output
            .clone()
            .unwrap_or_else(|| OutputConfig::for_backend(self.backend))
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> ConfigResult<()> {
        self.output_plan().validate()?;
        for entry in &self.method_types {
            if entry.type_string.trim().is_empty() || entry.method_name.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "method_types entries need a type_string and a method_name",
                ));
            }
        }
        Ok(())
    }
}

/// Ntuple naming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtupleConfig {
    /// TTree name; `<backend>_tree` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_name: Option<String>,
    /// ROOT file name; `ANALYSIS.root` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Generated files and which one is run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Template names filled from the translation artifact
    pub files: Vec<String>,
    /// The one file marked executable
    pub executable: String,
}

impl OutputConfig {
    /// File plan used by the given backend's templates
    pub fn for_backend(backend: BackendKind) -> Self {
        let files: &[&str] = match backend {
            BackendKind::Atlas => &[
                "ATestRun_eljob.py",
                "package_CMakeLists.txt",
                "query.cxx",
                "query.h",
                "runner.sh",
            ],
            BackendKind::Cms => &[
                "Analyzer.cc",
                "BuildFile.xml",
                "analyzer_cfg.py",
                "copy_root_tree.C",
                "runner.sh",
            ],
        };
        Self {
            files: files.iter().map(|f| f.to_string()).collect(),
            executable: "runner.sh".to_string(),
        }
    }

    /// The executable must be one of the files, exactly once
    pub fn validate(&self) -> ConfigResult<()> {
        check_executable(&self.files, &self.executable)
    }
}

/// `executable` must appear in `files` exactly once
pub fn check_executable(files: &[String], executable: &str) -> ConfigResult<()> {
    match files.iter().filter(|f| *f == executable).count() {
        1 => Ok(()),
        0 => Err(ConfigError::invalid(format!(
            "executable '{}' is not one of the output files",
            executable
        ))),
        _ => Err(ConfigError::invalid(format!(
            "output file '{}' is listed more than once",
            executable
        ))),
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level: off, error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One extra method type entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodTypeConfig {
    /// Owner type, e.g. `xAOD::Jet`
    pub type_string: String,
    /// Method name, e.g. `pt`
    pub method_name: String,
    /// Return type text, e.g. `double` or `const xAOD::Vertex*`
    pub return_type: String,
    /// Dereferences applied to the caller
    #[serde(default)]
    pub deref_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("atlas", BackendKind::Atlas ; "atlas")]
    #[test_case("CMS", BackendKind::Cms ; "uppercase cms")]
    #[test_case(" cms ", BackendKind::Cms ; "padded")]
    fn test_backend_from_str(text: &str, expected: BackendKind) {
        assert_eq!(text.parse::<BackendKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_backend() {
        let err = "lhcb".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(ref b) if b == "lhcb"));
    }

    #[test]
    fn test_default_plans_validate() {
        for backend in [BackendKind::Atlas, BackendKind::Cms] {
            let config = CompilerConfig::for_backend(backend);
            assert!(config.validate().is_ok());
            assert_eq!(config.output_plan().executable, "runner.sh");
        }
    }

    #[test]
    fn test_executable_must_be_listed() {
        let plan = OutputConfig {
            files: vec!["query.cxx".to_string()],
            executable: "runner.sh".to_string(),
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_tree_name_defaults_per_backend() {
        assert_eq!(CompilerConfig::for_backend(BackendKind::Atlas).tree_name(), "atlas_tree");
        assert_eq!(CompilerConfig::for_backend(BackendKind::Cms).tree_name(), "cms_tree");
    }
}
