//! `MetaData` directives.
//!
//! Each block carries a `metadata_type` tag; the remaining keys are checked
//! against a fixed field set for that tag. Unknown tags, unknown keys and
//! missing required keys are all rejected.

use crate::error::{CodegenError, CodegenResult};
use adl_config::BackendKind;
use adl_query::MetadataBlock;
use adl_types::{CollectionType, CppType, TerminalType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const TAG: &str = "metadata_type";

/// A new event collection accessor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionInfo {
    pub name: String,
    pub include_files: Vec<String>,
    pub container_type: String,
    pub contains_collection: bool,
    #[serde(default)]
    pub element_type: Option<String>,
    /// Whether iterating the container yields pointers
    #[serde(default = "default_true")]
    pub element_pointer: bool,
    #[serde(default)]
    pub link_libraries: Vec<String>,
    #[serde(default)]
    pub experiment: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Return type of `type_string::method_name`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodTypeInfo {
    pub type_string: String,
    pub method_name: String,
    #[serde(default)]
    pub return_type: Option<String>,
    /// Element type when the method returns a collection
    #[serde(default)]
    pub return_type_element: Option<String>,
    #[serde(default)]
    pub deref_count: usize,
    #[serde(default)]
    pub experiment: Option<String>,
}

impl MethodTypeInfo {
    /// The declared return type. Exactly one of `return_type` and
    /// `return_type_element` must be present.
    pub fn cpp_return_type(&self) -> CodegenResult<CppType> {
        match (&self.return_type, &self.return_type_element) {
            (Some(ty), None) => Ok(CppType::parse(ty)),
            (None, Some(element)) => {
                Ok(CollectionType::vector_of(TerminalType::parse(element)).into())
            }
            _ => Err(CodegenError::malformed(
                "add_method_type_info",
                format!(
                    "{}::{} needs exactly one of return_type and return_type_element",
                    self.type_string, self.method_name
                ),
            )),
        }
    }
}

/// Lines for the job steering script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobScript {
    pub name: String,
    #[serde(alias = "script")]
    pub script_lines: Vec<String>,
}

/// Raw C++ spliced into the generated algorithm
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct InjectCode {
    #[serde(alias = "body_includes")]
    pub includes: Vec<String>,
    pub header_includes: Vec<String>,
    pub private_members: Vec<String>,
    pub instance_initialization: Vec<String>,
    pub ctor_lines: Vec<String>,
    #[serde(alias = "initialize_lines")]
    pub init_code: Vec<String>,
    /// Lines run at the start of every event
    pub running_code: Vec<String>,
    pub link_libraries: Vec<String>,
}

/// An ad hoc C++ function callable from the query
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CppFunction {
    pub name: String,
    #[serde(default)]
    pub include_files: Vec<String>,
    pub arguments: Vec<String>,
    pub code: Vec<String>,
    /// Variable the code leaves its answer in; `result` when absent
    #[serde(default)]
    pub result_name: Option<String>,
    pub return_type: String,
    /// C++ type the function is a method of
    #[serde(default)]
    pub method_object: Option<String>,
    /// Placeholder in `code` that stands for the receiver object
    #[serde(default)]
    pub instance_object: Option<String>,
}

/// One accepted `MetaData` block
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Collection(CollectionInfo),
    MethodType(MethodTypeInfo),
    JobScript(JobScript),
    InjectCode(InjectCode),
    CppFunction(CppFunction),
}

impl Directive {
    /// Parse a block for the `active` backend
    pub fn from_block(block: &MetadataBlock, active: BackendKind) -> CodegenResult<Self> {
        let kind = block
            .get(TAG)
            .and_then(Value::as_str)
            .ok_or_else(|| CodegenError::malformed("MetaData", format!("block has no string {}", TAG)))?;

        let mut fields = block.clone();
        fields.remove(TAG);
        let fields = Value::Object(fields);

        let directive = match kind {
            "add_atlas_event_collection_info" => {
                Self::Collection(tagged_collection(kind, fields, BackendKind::Atlas)?)
            }
            "add_cms_event_collection_info" => {
                Self::Collection(tagged_collection(kind, fields, BackendKind::Cms)?)
            }
            "add_event_collection_info" => Self::Collection(parse(kind, fields)?),
            "add_method_type_info" => {
                let info: MethodTypeInfo = parse(kind, fields)?;
                info.cpp_return_type()?;
                Self::MethodType(info)
            }
            "add_job_script" => Self::JobScript(parse(kind, fields)?),
            "inject_code" | "add_raw_code_block" => Self::InjectCode(parse(kind, fields)?),
            "add_cpp_function" => Self::CppFunction(parse(kind, fields)?),
            other => {
                return Err(CodegenError::malformed(
                    other,
                    "unknown metadata_type",
                ))
            }
        };

        directive.check_experiment(active)?;
        debug!(kind, "accepted directive");
        Ok(directive)
    }

    fn check_experiment(&self, active: BackendKind) -> CodegenResult<()> {
        let (requested, what) = match self {
            Self::Collection(info) => (info.experiment.as_deref(), "event collection info"),
            Self::MethodType(info) => (info.experiment.as_deref(), "method type info"),
            _ => (None, ""),
        };
        match requested {
            Some(requested) if !requested.eq_ignore_ascii_case(active.experiment()) => {
                Err(CodegenError::ExperimentMismatch {
                    requested: requested.to_string(),
                    directive: what.to_string(),
                    active: active.experiment().to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Parse every block, stopping at the first bad one
pub fn accept_directives(
    blocks: &[MetadataBlock],
    active: BackendKind,
) -> CodegenResult<Vec<Directive>> {
    blocks
        .iter()
        .map(|block| Directive::from_block(block, active))
        .collect()
}

fn parse<T: DeserializeOwned>(kind: &str, fields: Value) -> CodegenResult<T> {
    serde_json::from_value(fields).map_err(|e| CodegenError::malformed(kind, e.to_string()))
}

fn tagged_collection(kind: &str, fields: Value, tag: BackendKind) -> CodegenResult<CollectionInfo> {
    let mut info: CollectionInfo = parse(kind, fields)?;
    match &info.experiment {
        Some(given) if !given.eq_ignore_ascii_case(tag.experiment()) => {
            return Err(CodegenError::malformed(
                kind,
                format!("experiment '{}' contradicts the directive kind", given),
            ))
        }
        _ => info.experiment = Some(tag.experiment().to_string()),
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn block(value: Value) -> MetadataBlock {
        match value {
            Value::Object(map) => map,
            _ => panic!("test block must be an object"),
        }
    }

    fn atlas(value: Value) -> CodegenResult<Directive> {
        Directive::from_block(&block(value), BackendKind::Atlas)
    }

    #[test]
    fn test_atlas_collection() {
        let d = atlas(json!({
            "metadata_type": "add_atlas_event_collection_info",
            "name": "ForkInfo",
            "include_files": ["xAODEventInfo/EventInfo.h"],
            "container_type": "xAOD::EventInfo",
            "contains_collection": false,
        }))
        .unwrap();
        let Directive::Collection(info) = d else {
            panic!("expected a collection directive");
        };
        assert_eq!(info.name, "ForkInfo");
        assert_eq!(info.experiment.as_deref(), Some("atlas"));
        assert!(info.element_pointer);
    }

    #[test]
    fn test_cms_collection_on_atlas_backend() {
        let err = atlas(json!({
            "metadata_type": "add_cms_event_collection_info",
            "name": "Vertex",
            "include_files": ["DataFormats/VertexReco/interface/Vertex.h"],
            "container_type": "reco::VertexCollection",
            "contains_collection": true,
            "element_type": "reco::Vertex",
            "element_pointer": false,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("backend; only"));
    }

    #[test]
    fn test_method_type_experiment_mismatch() {
        let err = atlas(json!({
            "metadata_type": "add_method_type_info",
            "type_string": "reco::Track",
            "method_name": "pt",
            "return_type": "double",
            "experiment": "cms",
        }))
        .unwrap_err();
        assert!(matches!(err, CodegenError::ExperimentMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "Attempt to use cms method type info with the atlas backend; only atlas is allowed"
        );
    }

    #[test]
    fn test_method_type_element() {
        let d = atlas(json!({
            "metadata_type": "add_method_type_info",
            "type_string": "xAOD::Jet",
            "method_name": "pt",
            "return_type_element": "myobj**",
        }))
        .unwrap();
        let Directive::MethodType(info) = d else {
            panic!("expected a method type directive");
        };
        let ty = info.cpp_return_type().unwrap();
        assert!(ty.is_collection());
        assert_eq!(ty.element_type().unwrap().pointer_depth(), 2);
    }

    #[test]
    fn test_job_script_alias() {
        let d = atlas(json!({
            "metadata_type": "add_job_script",
            "name": "Vertex",
            "script": ["# hi there"],
        }))
        .unwrap();
        assert_eq!(
            d,
            Directive::JobScript(JobScript {
                name: "Vertex".into(),
                script_lines: vec!["# hi there".into()],
            })
        );
    }

    #[test]
    fn test_inject_code_all_optional() {
        let d = atlas(json!({"metadata_type": "inject_code", "private_members": ["int m_count;"]})).unwrap();
        let Directive::InjectCode(code) = d else {
            panic!("expected an inject_code directive");
        };
        assert_eq!(code.private_members, vec!["int m_count;".to_string()]);
        assert!(code.running_code.is_empty());
    }

    #[test_case(json!({"metadata_type": "add_bogus"}) ; "unknown kind")]
    #[test_case(json!({"name": "x"}) ; "missing tag")]
    #[test_case(json!({"metadata_type": "add_job_script", "name": "x"}) ; "missing field")]
    #[test_case(json!({"metadata_type": "add_job_script", "name": "x", "script_lines": [], "extra": 1}) ; "unknown field")]
    #[test_case(json!({"metadata_type": "add_method_type_info", "type_string": "a", "method_name": "b"}) ; "no return type")]
    #[test_case(json!({"metadata_type": "add_method_type_info", "type_string": "a", "method_name": "b", "return_type": "int", "return_type_element": "int"}) ; "both return types")]
    fn test_malformed(value: Value) {
        assert!(matches!(
            atlas(value).unwrap_err(),
            CodegenError::MalformedDirective { .. }
        ));
    }

    #[test]
    fn test_cpp_function() {
        let d = atlas(json!({
            "metadata_type": "add_cpp_function",
            "name": "DeltaR",
            "include_files": ["TVector2.h", "math.h"],
            "arguments": ["eta1", "phi1", "eta2", "phi2"],
            "code": [
                "auto d_eta = eta1 - eta2;",
                "auto d_phi = TVector2::Phi_mpi_pi(phi1-phi2);",
                "auto result = sqrt(d_eta*d_eta + d_phi*d_phi);"
            ],
            "return_type": "double",
        }))
        .unwrap();
        let Directive::CppFunction(f) = d else {
            panic!("expected a function directive");
        };
        assert_eq!(f.arguments.len(), 4);
        assert!(f.result_name.is_none());
    }
}
