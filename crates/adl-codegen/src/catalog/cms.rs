//! CMS AOD collections, fetched with `getByLabel`.

use super::{element_type, Backend, CollectionEntry};
use crate::emit::NtupleDialect;
use adl_config::BackendKind;
use adl_types::{CollectionType, CppType, TerminalType, TypeRegistry};
use once_cell::sync::Lazy;

const TRACK_INCLUDES: &[&str] = &[
    "DataFormats/TrackReco/interface/Track.h",
    "DataFormats/TrackReco/interface/TrackFwd.h",
    "DataFormats/TrackReco/interface/HitPattern.h",
];

const MUON_INCLUDES: &[&str] = &[
    "DataFormats/MuonReco/interface/Muon.h",
    "DataFormats/MuonReco/interface/MuonFwd.h",
    "DataFormats/MuonReco/interface/MuonSelectors.h",
    "DataFormats/MuonReco/interface/MuonIsolation.h",
    "DataFormats/MuonReco/interface/MuonPFIsolation.h",
];

const METHOD_TYPES: &[(&str, &str, &str)] = &[
    ("reco::Track", "hitPattern", "reco::HitPattern"),
    ("reco::Track", "isNonnull", "bool"),
    ("reco::Track", "charge", "int"),
    ("reco::Muon", "hitPattern", "reco::HitPattern"),
    ("reco::Muon", "globalTrack", "reco::Track*"),
    ("reco::Muon", "isPFMuon", "bool"),
    ("reco::Muon", "isPFIsolationValid", "bool"),
    ("reco::Muon", "charge", "int"),
    ("reco::HitPattern", "numberOfValidHits", "int"),
];

const KINEMATICS: &[&str] = &["pt", "eta", "phi", "p"];

static ENTRIES: Lazy<Vec<CollectionEntry>> = Lazy::new(|| {
    let track_muon_includes: Vec<&str> = MUON_INCLUDES
        .iter()
        .chain(TRACK_INCLUDES)
        .copied()
        .collect();
    vec![
        entry("Tracks", "generalTracks", TRACK_INCLUDES, "reco::TrackCollection", "reco::Track"),
        entry(
            "TrackMuons",
            "globalMuons",
            &track_muon_includes,
            "reco::TrackCollection",
            "reco::Track",
        ),
        entry("Muons", "muons", MUON_INCLUDES, "reco::MuonCollection", "reco::Muon"),
    ]
});

fn entry(name: &str, key: &str, includes: &[&str], container: &str, element: &str) -> CollectionEntry {
    CollectionEntry {
        accessor_name: name.to_string(),
        experiment: BackendKind::Cms.experiment().to_string(),
        include_files: includes.iter().map(|f| f.to_string()).collect(),
        container_type: CmsBackend.collection_type(container, Some((element, false))),
        link_libraries: Vec::new(),
        default_key: Some(key.to_string()),
    }
}

/// CMSSW EDAnalyzer backend
#[derive(Debug, Clone, Copy, Default)]
pub struct CmsBackend;

impl Backend for CmsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cms
    }

    fn collections(&self) -> &[CollectionEntry] {
        &ENTRIES
    }

    /// Containers are held through `edm::Handle<T>`, which is followed with
    /// `->` like a pointer
    fn collection_type(&self, container: &str, element: Option<(&str, bool)>) -> CppType {
        let handle = TerminalType::new(container)
            .with_pointer_depth(1)
            .spelled(format!("edm::Handle<{}>", container));
        match element {
            Some((element, is_pointer)) => {
                CollectionType::new(handle, element_type(element, is_pointer)).into()
            }
            None => handle.into(),
        }
    }

    fn fetch_code(&self, container: &CppType) -> Vec<String> {
        vec![
            format!("{} result;", container),
            "iEvent.getByLabel(collection_name, result);".to_string(),
        ]
    }

    fn seed_types(&self, registry: &mut TypeRegistry) {
        for owner in ["reco::Track", "reco::Muon"] {
            for method in KINEMATICS {
                registry.register(owner, *method, TerminalType::new("double"), 0);
            }
        }
        for (owner, method, return_type) in METHOD_TYPES {
            registry.register(*owner, *method, CppType::parse(return_type), 0);
        }
    }

    fn ntuple_dialect(&self) -> NtupleDialect {
        NtupleDialect::Cms
    }
}
