//! Text to normalized core, through every pass.

use adl_query::transform::QueryTransform;
use adl_query::{extract_metadata, normalize, parse_query, Expr, ValidateRoot};
use insta::assert_snapshot;
use test_case::test_case;

fn core(text: &str) -> Expr {
    normalize(parse_query(text).unwrap()).unwrap()
}

#[test]
fn test_jet_eta_query() {
    let expr = core(
        "EventDataset()
            .Select(e => e.Jets('AntiKt4EMTopoJets'))
            .Select(jets => jets.Where(j => j.pt() / 1000.0 > 30.0).Select(j => j.eta()))",
    );
    assert_snapshot!(expr.to_string(), @r#"Select(EventDataset(), e => Select(Where(e.Jets("AntiKt4EMTopoJets"), j => ((j.pt() / 1000.0) > 30.0)), j => j.eta()))"#);
}

#[test]
fn test_max_of_known_function() {
    let expr = core("EventDataset().Select(e => e.Jets().Select(j => sqrt(j.pt())).Max())");
    assert_snapshot!(expr.to_string(), @"Select(EventDataset(), e => Aggregate(Select(e.Jets(), j => sqrt(j.pt())), (acc, v) => (acc if (acc > v) else v)))");
    assert!(expr.any(&|e| matches!(e, Expr::KnownFunction(k) if k.cpp_name == "std::sqrt")));
}

#[test]
fn test_keyword_lambdas_and_filter_fusion() {
    let expr = core("EventDataset().Where(lambda e: e.x() > 1).Where(lambda e: e.y() < 2)");
    assert_snapshot!(expr.to_string(), @"Where(EventDataset(), e => ((e.x() > 1) and (e.y() < 2)))");
}

#[test_case("EventDataset().Select(e => e.Jets()).Select(js => js.Count())" ; "count")]
#[test_case("EventDataset().Select(e => (e.Jets(), e.Tracks())).Select(t => t[0].Sum(j => j.pt()))" ; "tuple projection")]
#[test_case("Select(e => {'n': e.Jets().Count(), 'w': 1.0}).Where(d => d.n > 2)" ; "dict rows")]
#[test_case("EventDataset().SelectMany(e => e.Jets()).Select(j => abs(j.eta()))" ; "flatten")]
fn test_normalize_is_idempotent(text: &str) {
    let once = core(text);
    let twice = normalize(once.clone()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_metadata_then_normalize_then_validate() {
    let query = parse_query(
        "EventDataset()
            .MetaData({'metadata_type': 'add_method_type_info', 'type_string': 'xAOD::Jet', 'method_name': 'm', 'return_type': 'double'})
            .Select(e => e.Jets().Select(j => j.m()))",
    )
    .unwrap();

    let (stripped, blocks) = extract_metadata(query).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["metadata_type"], "add_method_type_info");

    let rooted = ValidateRoot::new("atlas_tree", "ANALYSIS.root")
        .transform(normalize(stripped).unwrap())
        .unwrap();
    assert_snapshot!(rooted.to_string(), @r#"ResultTTree(Select(EventDataset(), e => Select(e.Jets(), j => j.m())), [], "atlas_tree", "ANALYSIS.root")"#);
}

#[test]
fn test_syntax_error_reports_position() {
    let err = parse_query("EventDataset().Select(e => )").unwrap_err();
    assert!(err.to_string().contains("Line 1"));
}
