/// Core domain types shared by the adapters, the ranking engine and presentation.
/// These mirror the data model of a single discovery run: raw findings in,
/// normalised evidence in the middle, ranked targets out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NormalizationError;

// ---------------------------------------------------------------------------
// Source identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    DisGeNet,
    GwasCatalog,
    PubMed,
    UniProt,
    GeneOntology,
    Reactome,
    Pdb,
    PubChem,
    OpenTargets,
    /// User-provided file source, keyed by its configured name.
    Custom(String),
}

impl SourceId {
    /// Built-in sources in canonical plan order.
    pub const BUILTIN: [SourceId; 9] = [
        SourceId::DisGeNet,
        SourceId::GwasCatalog,
        SourceId::PubMed,
        SourceId::UniProt,
        SourceId::OpenTargets,
        SourceId::GeneOntology,
        SourceId::Reactome,
        SourceId::Pdb,
        SourceId::PubChem,
    ];

    /// Stable identifier used in config files and exports.
    pub fn id(&self) -> &str {
        match self {
            SourceId::DisGeNet     => "disgenet",
            SourceId::GwasCatalog  => "gwas",
            SourceId::PubMed       => "pubmed",
            SourceId::UniProt      => "uniprot",
            SourceId::GeneOntology => "go",
            SourceId::Reactome     => "reactome",
            SourceId::Pdb          => "pdb",
            SourceId::PubChem      => "pubchem",
            SourceId::OpenTargets  => "opentargets",
            SourceId::Custom(name) => name,
        }
    }

    /// Human-readable name shown in reports.
    pub fn display_name(&self) -> &str {
        match self {
            SourceId::DisGeNet     => "DisGeNET",
            SourceId::GwasCatalog  => "GWAS Catalog",
            SourceId::PubMed       => "PubMed",
            SourceId::UniProt      => "UniProt",
            SourceId::GeneOntology => "Gene Ontology",
            SourceId::Reactome     => "Reactome",
            SourceId::Pdb          => "PDB",
            SourceId::PubChem      => "PubChem",
            SourceId::OpenTargets  => "OpenTargets",
            SourceId::Custom(name) => name,
        }
    }

    /// Parse a built-in source id. Unknown ids are treated as custom sources.
    pub fn parse(s: &str) -> Self {
        let key = s.trim().to_lowercase();
        SourceId::BUILTIN
            .iter()
            .find(|b| b.id() == key)
            .cloned()
            .unwrap_or_else(|| SourceId::Custom(s.trim().to_string()))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Evidence categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Genetic,
    Literature,
    Structural,
    Druggability,
    Functional,
    Pathway,
    Comprehensive,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 7] = [
        EvidenceCategory::Genetic,
        EvidenceCategory::Literature,
        EvidenceCategory::Structural,
        EvidenceCategory::Druggability,
        EvidenceCategory::Functional,
        EvidenceCategory::Pathway,
        EvidenceCategory::Comprehensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceCategory::Genetic       => "genetic",
            EvidenceCategory::Literature    => "literature",
            EvidenceCategory::Structural    => "structural",
            EvidenceCategory::Druggability  => "druggability",
            EvidenceCategory::Functional    => "functional",
            EvidenceCategory::Pathway       => "pathway",
            EvidenceCategory::Comprehensive => "comprehensive",
        }
    }

    /// Position in `ALL`, used for array-backed score tables.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceCategory {
    type Err = NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        EvidenceCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| NormalizationError::UnknownCategory(s.to_string()))
    }
}

/// One score per evidence category, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryScores {
    pub genetic: f64,
    pub literature: f64,
    pub structural: f64,
    pub druggability: f64,
    pub functional: f64,
    pub pathway: f64,
    pub comprehensive: f64,
}

impl CategoryScores {
    pub fn get(&self, category: EvidenceCategory) -> f64 {
        self.as_array()[category.index()]
    }

    pub fn set(&mut self, category: EvidenceCategory, value: f64) {
        let slot = match category {
            EvidenceCategory::Genetic       => &mut self.genetic,
            EvidenceCategory::Literature    => &mut self.literature,
            EvidenceCategory::Structural    => &mut self.structural,
            EvidenceCategory::Druggability  => &mut self.druggability,
            EvidenceCategory::Functional    => &mut self.functional,
            EvidenceCategory::Pathway       => &mut self.pathway,
            EvidenceCategory::Comprehensive => &mut self.comprehensive,
        };
        *slot = value;
    }

    /// Convert to array in `EvidenceCategory::ALL` order.
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.genetic,
            self.literature,
            self.structural,
            self.druggability,
            self.functional,
            self.pathway,
            self.comprehensive,
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = (EvidenceCategory, f64)> + '_ {
        EvidenceCategory::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

// ---------------------------------------------------------------------------
// Raw findings
// ---------------------------------------------------------------------------

/// Source-specific metadata attached to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// GWAS-style association; only the significance matters for scoring.
    GeneticAssociation {
        p_value: f64,
        risk_allele: Option<String>,
        study_pmid: Option<String>,
    },
    /// Curated gene-disease association (DisGeNET style).
    GeneDiseaseAssociation {
        score: f64,
        evidence_index: f64,
        n_publications: u32,
        n_snps: u32,
        association_type: Option<String>,
    },
    Publication {
        pmid: Option<String>,
        title: String,
        abstract_text: Option<String>,
        year: Option<i32>,
        #[serde(default)]
        publication_types: Vec<String>,
        journal: Option<String>,
    },
    ProteinAnnotation {
        accession: String,
        protein_name: Option<String>,
        /// Disease comments that mention the queried disease.
        matching_disease_annotations: u32,
        other_disease_annotations: u32,
        has_binding_site: bool,
        has_structure_xref: bool,
        function: Option<String>,
    },
    GoAnnotation {
        #[serde(default)]
        biological_processes: Vec<String>,
        #[serde(default)]
        molecular_functions: Vec<String>,
        #[serde(default)]
        mechanism_matches: Vec<String>,
    },
    Pathway {
        pathway_id: String,
        pathway_name: String,
        genes_in_pathway: u32,
        is_disease_pathway: bool,
        keyword_matches: u32,
        disease_word_match: bool,
    },
    Structures {
        structure_ids: Vec<String>,
    },
    Compounds {
        compound_ids: Vec<u64>,
    },
    /// Aggregated association from a meta-evidence source.
    TargetAssociation {
        protein_name: Option<String>,
        overall_score: f64,
        #[serde(default)]
        datatype_scores: BTreeMap<String, f64>,
    },
    /// A sub-score that the source already reports on [0, 1].
    Precomputed {
        score: f64,
        label: String,
    },
    Opaque(serde_json::Value),
}

impl Payload {
    /// One-line human summary used in the target's finding list.
    pub fn summary(&self) -> String {
        match self {
            Payload::GeneticAssociation { p_value, .. } => {
                format!("GWAS: genetic association (p={p_value:.1e})")
            }
            Payload::GeneDiseaseAssociation { score, n_publications, .. } => {
                format!("DisGeNET: disease association score={score:.2}, {n_publications} publications")
            }
            Payload::Publication { title, year, publication_types, .. } => {
                let mut text = format!("PubMed: {}", truncate(title, 80));
                if let Some(y) = year {
                    text.push_str(&format!(" ({y})"));
                }
                if let Some(t) = publication_types.first() {
                    text.push_str(&format!(" [{t}]"));
                }
                text
            }
            Payload::ProteinAnnotation { function, protein_name, accession, .. } => match function {
                Some(f) if !f.is_empty() => format!("UniProt function: {}", truncate(f, 150)),
                _ => format!(
                    "UniProt: {} ({accession})",
                    protein_name.as_deref().unwrap_or("reviewed entry")
                ),
            },
            Payload::GoAnnotation { mechanism_matches, biological_processes, molecular_functions } => {
                if mechanism_matches.is_empty() {
                    format!(
                        "GO: {} processes, {} functions annotated",
                        biological_processes.len(),
                        molecular_functions.len()
                    )
                } else {
                    let top: Vec<&str> = mechanism_matches.iter().take(3).map(String::as_str).collect();
                    format!("GO mechanisms: {}", top.join(", "))
                }
            }
            Payload::Pathway { pathway_name, pathway_id, .. } => {
                format!("Reactome pathway: {pathway_name} ({pathway_id})")
            }
            Payload::Structures { structure_ids } => {
                let ids: Vec<&str> = structure_ids.iter().take(3).map(String::as_str).collect();
                format!("3D structure available (PDB: {})", ids.join(", "))
            }
            Payload::Compounds { compound_ids } => {
                format!("PubChem: {} compounds linked", compound_ids.len())
            }
            Payload::TargetAssociation { overall_score, datatype_scores, .. } => {
                let mut top: Vec<(&String, &f64)> = datatype_scores.iter().collect();
                top.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
                let parts: Vec<String> = top
                    .iter()
                    .take(3)
                    .map(|(dt, sc)| format!("{dt}={sc:.2}"))
                    .collect();
                if parts.is_empty() {
                    format!("OpenTargets: overall={overall_score:.2}")
                } else {
                    format!("OpenTargets: overall={overall_score:.2}, top evidence: {}", parts.join(", "))
                }
            }
            Payload::Precomputed { score, label } => format!("{label}: {score:.2}"),
            Payload::Opaque(value) => truncate(&value.to_string(), 120),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// One item returned by a source adapter. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFinding {
    pub source_id: SourceId,
    /// Gene/protein symbol as the source reported it; may be empty.
    pub subject: String,
    /// Source-defined relevance; only used directly for opaque payloads.
    pub local_score: f64,
    pub category_hint: String,
    pub payload: Payload,
    /// URL or accession for provenance.
    pub citation: String,
}

impl RawFinding {
    pub fn new(
        source_id: SourceId,
        subject: impl Into<String>,
        category: EvidenceCategory,
        payload: Payload,
    ) -> Self {
        Self {
            source_id,
            subject: subject.into(),
            local_score: 0.0,
            category_hint: category.as_str().to_string(),
            payload,
            citation: String::new(),
        }
    }

    pub fn with_local_score(mut self, score: f64) -> Self {
        self.local_score = score;
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = citation.into();
        self
    }
}

/// A finding after category mapping, score normalisation and subject resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvidence {
    pub subject_key: String,
    pub category: EvidenceCategory,
    /// Always in [0, 1].
    pub strength: f64,
    pub source: SourceId,
    pub citation: String,
    pub raw_payload: Payload,
}

// ---------------------------------------------------------------------------
// Ranked output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
    Strong,
    Moderate,
    Weak,
}

impl EvidenceTier {
    pub const STRONG_THRESHOLD: f64 = 0.7;
    pub const MODERATE_THRESHOLD: f64 = 0.4;

    pub fn from_score(overall_score: f64) -> Self {
        if overall_score >= Self::STRONG_THRESHOLD {
            EvidenceTier::Strong
        } else if overall_score >= Self::MODERATE_THRESHOLD {
            EvidenceTier::Moderate
        } else {
            EvidenceTier::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceTier::Strong   => "strong",
            EvidenceTier::Moderate => "moderate",
            EvidenceTier::Weak     => "weak",
        }
    }
}

impl fmt::Display for EvidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output row. Built once by the ranker and handed to presentation,
/// which only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTarget {
    /// 1-based position after sorting.
    pub rank: usize,
    pub symbol: String,
    pub protein_name: Option<String>,
    pub overall_score: f64,
    pub category_scores: CategoryScores,
    /// weight × category score, per category. Sums to `overall_score`.
    pub contributions: CategoryScores,
    pub evidence_strength: EvidenceTier,
    pub sources: Vec<SourceId>,
    pub findings: Vec<String>,
    pub related_pathways: Vec<String>,
}

// ---------------------------------------------------------------------------
// Alias resolution
// ---------------------------------------------------------------------------

/// Maps a symbol (already trimmed and uppercased) to its canonical symbol.
/// Return `None` to keep the symbol as is.
pub trait AliasTable: Send + Sync {
    fn resolve(&self, symbol: &str) -> Option<String>;
}

/// Uppercase matching only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAliases;

impl AliasTable for NoAliases {
    fn resolve(&self, _symbol: &str) -> Option<String> {
        None
    }
}

impl AliasTable for BTreeMap<String, String> {
    fn resolve(&self, symbol: &str) -> Option<String> {
        self.get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_round_trip_names() {
        for c in EvidenceCategory::ALL {
            assert_eq!(c.as_str().parse::<EvidenceCategory>().unwrap(), c);
        }
        assert_eq!(" Genetic ".parse::<EvidenceCategory>().unwrap(), EvidenceCategory::Genetic);
    }

    #[test]
    fn test_unknown_category_is_error() {
        let err = "expression".parse::<EvidenceCategory>().unwrap_err();
        assert_eq!(err, NormalizationError::UnknownCategory("expression".to_string()));
    }

    #[test]
    fn test_category_index_matches_all_order() {
        for (i, c) in EvidenceCategory::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_category_scores_get_set() {
        let mut s = CategoryScores::default();
        s.set(EvidenceCategory::Pathway, 0.4);
        assert_eq!(s.get(EvidenceCategory::Pathway), 0.4);
        assert_eq!(s.pathway, 0.4);
        assert_eq!(s.iter().filter(|(_, v)| *v > 0.0).count(), 1);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(EvidenceTier::from_score(0.7), EvidenceTier::Strong);
        assert_eq!(EvidenceTier::from_score(0.6999), EvidenceTier::Moderate);
        assert_eq!(EvidenceTier::from_score(0.4), EvidenceTier::Moderate);
        assert_eq!(EvidenceTier::from_score(0.3999), EvidenceTier::Weak);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(SourceId::parse("GWAS"), SourceId::GwasCatalog);
        assert_eq!(SourceId::parse("opentargets"), SourceId::OpenTargets);
        assert_eq!(SourceId::parse("lab_screen"), SourceId::Custom("lab_screen".to_string()));
    }

    #[test]
    fn test_target_association_summary_orders_datatypes() {
        let mut scores = BTreeMap::new();
        scores.insert("literature".to_string(), 0.4);
        scores.insert("genetic_association".to_string(), 0.9);
        scores.insert("known_drug".to_string(), 0.6);
        scores.insert("animal_model".to_string(), 0.1);
        let p = Payload::TargetAssociation { protein_name: None, overall_score: 0.8, datatype_scores: scores };
        assert_eq!(
            p.summary(),
            "OpenTargets: overall=0.80, top evidence: genetic_association=0.90, known_drug=0.60, literature=0.40"
        );
    }

    #[test]
    fn test_publication_summary_truncates_title() {
        let p = Payload::Publication {
            pmid: Some("1".into()),
            title: "x".repeat(100),
            abstract_text: None,
            year: Some(2021),
            publication_types: vec!["Review".into()],
            journal: None,
        };
        let s = p.summary();
        assert!(s.starts_with("PubMed: xxxx"));
        assert!(s.ends_with("... (2021) [Review]"));
    }
}
