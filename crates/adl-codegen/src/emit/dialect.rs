//! Ntuple booking and filling, per backend.

use serde::{Deserialize, Serialize};

const TREE_TITLE: &str = "My analysis ntuple";

/// How a backend books its output tree and fills a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NtupleDialect {
    /// EventLoop `book`/`tree` helpers
    Atlas,
    /// `TFileService`, tree held as a member
    Cms,
}

impl NtupleDialect {
    /// Members the algorithm class needs regardless of columns
    pub fn members(&self) -> Vec<String> {
        match self {
            Self::Atlas => Vec::new(),
            Self::Cms => vec!["TTree *_tree;".to_string()],
        }
    }

    /// Includes the booking code needs
    pub fn include_files(&self) -> Vec<String> {
        match self {
            Self::Atlas => vec!["TTree.h".to_string()],
            Self::Cms => vec![
                "TTree.h".to_string(),
                "FWCore/ServiceRegistry/interface/Service.h".to_string(),
                "CommonTools/UtilAlgos/interface/TFileService.h".to_string(),
            ],
        }
    }

    /// Lines that create `tree` and attach one branch per `(branch, member)`
    pub fn book_lines(&self, tree: &str, branches: &[(String, String)]) -> Vec<String> {
        let (mut lines, handle) = match self {
            Self::Atlas => (
                vec![
                    format!("ANA_CHECK (book (TTree (\"{}\", \"{}\")));", tree, TREE_TITLE),
                    format!("TTree *myTree = tree (\"{}\");", tree),
                ],
                "myTree",
            ),
            Self::Cms => (
                vec![
                    "edm::Service<TFileService> fs;".to_string(),
                    format!("_tree = fs->make<TTree>(\"{}\", \"{}\");", tree, TREE_TITLE),
                ],
                "_tree",
            ),
        };
        lines.extend(
            branches
                .iter()
                .map(|(branch, member)| format!("{}->Branch(\"{}\", &{});", handle, branch, member)),
        );
        lines
    }

    /// Line that writes the current row
    pub fn fill_line(&self, tree: &str) -> String {
        match self {
            Self::Atlas => format!("tree(\"{}\")->Fill();", tree),
            Self::Cms => "_tree->Fill();".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches() -> Vec<(String, String)> {
        vec![("JetPt".to_string(), "_JetPt".to_string())]
    }

    #[test]
    fn test_atlas_booking() {
        let lines = NtupleDialect::Atlas.book_lines("atlas_tree", &branches());
        assert_eq!(
            lines,
            vec![
                "ANA_CHECK (book (TTree (\"atlas_tree\", \"My analysis ntuple\")));",
                "TTree *myTree = tree (\"atlas_tree\");",
                "myTree->Branch(\"JetPt\", &_JetPt);",
            ]
        );
        assert_eq!(NtupleDialect::Atlas.fill_line("atlas_tree"), "tree(\"atlas_tree\")->Fill();");
        assert!(NtupleDialect::Atlas.members().is_empty());
    }

    #[test]
    fn test_cms_booking() {
        let lines = NtupleDialect::Cms.book_lines("cms_tree", &branches());
        assert_eq!(lines[1], "_tree = fs->make<TTree>(\"cms_tree\", \"My analysis ntuple\");");
        assert_eq!(lines[2], "_tree->Branch(\"JetPt\", &_JetPt);");
        assert_eq!(NtupleDialect::Cms.fill_line("cms_tree"), "_tree->Fill();");
        assert_eq!(NtupleDialect::Cms.members(), vec!["TTree *_tree;".to_string()]);
    }
}
