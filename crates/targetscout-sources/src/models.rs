//! Intermediate records parsed from source responses before they become findings.

use serde::{Deserialize, Serialize};

/// One PubMed article as parsed from efetch XML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubMedArticle {
    pub pmid: Option<String>,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub publication_types: Vec<String>,
}

impl PubMedArticle {
    pub fn url(&self) -> String {
        match &self.pmid {
            Some(pmid) => format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            None => String::new(),
        }
    }
}

/// GO term with its aspect split out of the UniProt "P:name" encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoTerm {
    pub id: String,
    pub name: String,
    pub aspect: GoAspect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoAspect {
    BiologicalProcess,
    MolecularFunction,
    CellularComponent,
}

impl GoAspect {
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'P' => Some(GoAspect::BiologicalProcess),
            'F' => Some(GoAspect::MolecularFunction),
            'C' => Some(GoAspect::CellularComponent),
            _ => None,
        }
    }
}
