use adl_cli::commands::compile::{compile_to, execute, QuerySource};
use adl_cli::commands::parse::normalized;
use adl_config::{BackendKind, CompilerConfig, ConfigLoader};
use std::io::Write;
use std::path::PathBuf;
use tempfile::{tempdir, NamedTempFile};
use test_case::test_case;

const JET_QUERY: &str = "EventDataset().SelectMany(e => e.Jets()).Select(j => j.pt() / 1000.0)";

#[test]
fn test_compile_writes_plan_and_artifact() {
    let (artifact, out) = compile_to(CompilerConfig::default(), JET_QUERY, Vec::new()).unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["plan"]["executable"], "runner.sh");
    assert_eq!(doc["artifact"]["backend"], "atlas");
    assert_eq!(
        doc["artifact"]["query_lines"].as_array().unwrap().len(),
        artifact.query_lines.len()
    );
}

#[test]
fn test_compile_error_writes_nothing() {
    let err = compile_to(
        CompilerConfig::default(),
        "EventDataset().Select(e => e.Jets(5).Count())",
        Vec::new(),
    )
    .unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to compile query for the atlas backend"));
    assert!(message.contains("is a string"));
}

#[test]
fn test_syntax_error_has_context() {
    let err = compile_to(CompilerConfig::default(), "EventDataset(.Select(", Vec::new()).unwrap_err();
    assert!(format!("{:#}", err).starts_with("Failed to parse query"));
}

#[test]
fn test_config_file_sets_tree_name() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "backend = \"cms\"\n\n[ntuple]\ntree_name = \"muon_tree\"\nfile_name = \"muons.root\""
    )
    .unwrap();
    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config.backend, BackendKind::Cms);

    let (artifact, _) = compile_to(
        config,
        "EventDataset().SelectMany(e => e.Muons()).Select(m => m.eta())",
        Vec::new(),
    )
    .unwrap();
    let result = artifact.result.unwrap();
    assert_eq!(result.tree_name, "muon_tree");
    assert_eq!(result.file_name, "muons.root");
}

#[test]
fn test_execute_reads_file_and_writes_output() {
    let dir = tempdir().unwrap();
    let query_path = dir.path().join("query.txt");
    std::fs::write(&query_path, JET_QUERY).unwrap();
    let out_path = dir.path().join("artifact.json");

    execute(
        CompilerConfig::default(),
        QuerySource::File(query_path),
        Some(out_path.clone()),
    )
    .unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_path).unwrap()).unwrap();
    assert!(doc["artifact"]["include_files"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "xAODJet/JetContainer.h"));
}

#[test]
fn test_missing_query_file() {
    let err = QuerySource::File(PathBuf::from("/nonexistent/query.txt"))
        .read()
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read query file"));
}

#[test_case(None, None ; "nothing given")]
#[test_case(Some("x"), Some("q.txt") ; "both given")]
fn test_bad_source_args(query: Option<&str>, file: Option<&str>) {
    let result = QuerySource::from_args(query.map(String::from), file.map(PathBuf::from));
    assert!(result.is_err());
}

#[test]
fn test_parse_strips_metadata() {
    let (tree, blocks) = normalized(
        "EventDataset().MetaData({'metadata_type': 'add_job_script', 'name': 's', 'script': []}).Select(e => 1)",
    )
    .unwrap();
    assert_eq!(blocks, 1);
    assert!(!tree.to_string().contains("MetaData"));
}
