//! ATLAS xAOD collections, fetched through `evtStore()`.

use super::{element_type, Backend, CollectionEntry};
use crate::emit::NtupleDialect;
use adl_config::BackendKind;
use adl_types::{CollectionType, CppType, TerminalType, TypeRegistry};
use once_cell::sync::Lazy;

/// `(accessor, default key, includes, container, element, link library)`
type Row = (&'static str, &'static str, &'static [&'static str], &'static str, Option<&'static str>, &'static str);

const COLLECTIONS: &[Row] = &[
    (
        "Jets",
        "AntiKt4EMTopoJets",
        &["xAODJet/JetContainer.h"],
        "xAOD::JetContainer",
        Some("xAOD::Jet"),
        "xAODJet",
    ),
    (
        "Tracks",
        "InDetTrackParticles",
        &["xAODTracking/TrackParticleContainer.h"],
        "xAOD::TrackParticleContainer",
        Some("xAOD::TrackParticle"),
        "xAODTracking",
    ),
    (
        "EventInfo",
        "EventInfo",
        &["xAODEventInfo/EventInfo.h"],
        "xAOD::EventInfo",
        None,
        "xAODEventInfo",
    ),
    (
        "TruthParticles",
        "TruthParticles",
        &[
            "xAODTruth/TruthParticleContainer.h",
            "xAODTruth/TruthParticle.h",
            "xAODTruth/TruthVertex.h",
        ],
        "xAOD::TruthParticleContainer",
        Some("xAOD::TruthParticle"),
        "xAODTruth",
    ),
    (
        "Electrons",
        "Electrons",
        &["xAODEgamma/ElectronContainer.h", "xAODEgamma/Electron.h"],
        "xAOD::ElectronContainer",
        Some("xAOD::Electron"),
        "xAODEgamma",
    ),
    (
        "Muons",
        "Muons",
        &["xAODMuon/MuonContainer.h", "xAODMuon/Muon.h"],
        "xAOD::MuonContainer",
        Some("xAOD::Muon"),
        "xAODMuon",
    ),
    (
        "MissingET",
        "MET_Reference_AntiKt4EMTopo",
        &["xAODMissingET/MissingETContainer.h", "xAODMissingET/MissingET.h"],
        "xAOD::MissingETContainer",
        Some("xAOD::MissingET"),
        "xAODMissingET",
    ),
];

const FOUR_VECTOR_OWNERS: &[&str] = &[
    "xAOD::Jet",
    "xAOD::TrackParticle",
    "xAOD::TruthParticle",
    "xAOD::Electron",
    "xAOD::Muon",
];

const FOUR_VECTOR_METHODS: &[&str] = &["pt", "eta", "phi", "m", "e", "rapidity"];

/// `(owner, method, return type)`
const METHOD_TYPES: &[(&str, &str, &str)] = &[
    ("xAOD::TruthParticle", "prodVtx", "const xAOD::TruthVertex*"),
    ("xAOD::TruthParticle", "decayVtx", "const xAOD::TruthVertex*"),
    ("xAOD::TruthParticle", "parent", "const xAOD::TruthParticle*"),
    ("xAOD::TruthParticle", "child", "const xAOD::TruthParticle*"),
    ("xAOD::TruthParticle", "pdgId", "int"),
    ("xAOD::TruthParticle", "status", "int"),
    ("xAOD::TruthParticle", "nParents", "size_t"),
    ("xAOD::TruthParticle", "nChildren", "size_t"),
    ("xAOD::Electron", "charge", "float"),
    ("xAOD::Muon", "charge", "float"),
    ("xAOD::TrackParticle", "charge", "float"),
    // run numbers are written to the ntuple as floating point
    ("xAOD::EventInfo", "runNumber", "double"),
    ("xAOD::EventInfo", "eventNumber", "unsigned long long"),
    ("xAOD::MissingET", "met", "double"),
    ("xAOD::MissingET", "mpx", "double"),
    ("xAOD::MissingET", "mpy", "double"),
    ("xAOD::MissingET", "sumet", "double"),
    ("xAOD::MissingET", "phi", "double"),
];

static ENTRIES: Lazy<Vec<CollectionEntry>> = Lazy::new(|| {
    COLLECTIONS
        .iter()
        .map(|(name, key, includes, container, element, library)| CollectionEntry {
            accessor_name: name.to_string(),
            experiment: BackendKind::Atlas.experiment().to_string(),
            include_files: includes.iter().map(|f| f.to_string()).collect(),
            container_type: AtlasBackend.collection_type(container, element.map(|e| (e, true))),
            link_libraries: vec![library.to_string()],
            default_key: Some(key.to_string()),
        })
        .collect()
});

/// xAOD EventLoop algorithm backend
#[derive(Debug, Clone, Copy, Default)]
pub struct AtlasBackend;

impl Backend for AtlasBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Atlas
    }

    fn collections(&self) -> &[CollectionEntry] {
        &ENTRIES
    }

    /// Containers are retrieved as `const T*`
    fn collection_type(&self, container: &str, element: Option<(&str, bool)>) -> CppType {
        let container = TerminalType::new(container)
            .with_pointer_depth(1)
            .with_const(true);
        match element {
            Some((element, is_pointer)) => {
                CollectionType::new(container, element_type(element, is_pointer)).into()
            }
            None => container.into(),
        }
    }

    fn fetch_code(&self, container: &CppType) -> Vec<String> {
        vec![
            format!("{} result = 0;", container),
            "ANA_CHECK (evtStore()->retrieve(result, collection_name));".to_string(),
        ]
    }

    fn seed_types(&self, registry: &mut TypeRegistry) {
        for owner in FOUR_VECTOR_OWNERS {
            for method in FOUR_VECTOR_METHODS {
                registry.register(*owner, *method, TerminalType::new("double"), 0);
            }
        }
        for (owner, method, return_type) in METHOD_TYPES {
            registry.register(*owner, *method, CppType::parse(return_type), 0);
        }
    }

    fn ntuple_dialect(&self) -> NtupleDialect {
        NtupleDialect::Atlas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collections() {
        let names: Vec<_> = AtlasBackend
            .collections()
            .iter()
            .map(|c| c.accessor_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Jets", "Tracks", "EventInfo", "TruthParticles", "Electrons", "Muons", "MissingET"]
        );
    }

    #[test]
    fn test_event_info_is_not_iterable() {
        let info = AtlasBackend
            .collections()
            .iter()
            .find(|c| c.accessor_name == "EventInfo")
            .unwrap();
        assert!(!info.container_type.is_collection());
        assert_eq!(info.container_type.to_string(), "const xAOD::EventInfo*");
    }

    #[test]
    fn test_fetch_code() {
        let ty = AtlasBackend.collection_type("xAOD::JetContainer", Some(("xAOD::Jet", true)));
        assert_eq!(
            AtlasBackend.fetch_code(&ty),
            vec![
                "const xAOD::JetContainer* result = 0;",
                "ANA_CHECK (evtStore()->retrieve(result, collection_name));",
            ]
        );
    }

    #[test]
    fn test_seeded_navigation() {
        let mut registry = TypeRegistry::new();
        AtlasBackend.seed_types(&mut registry);
        let info = registry.lookup("xAOD::TruthParticle", "prodVtx").unwrap();
        assert_eq!(info.return_type.to_string(), "const xAOD::TruthVertex*");
        assert!(registry.contains("xAOD::Jet", "pt"));
    }
}
