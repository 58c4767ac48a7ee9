//! Shared fixtures for TargetScout tests.

use std::collections::BTreeMap;

use targetscout_common::{EvidenceCategory, Payload, RawFinding, SourceId};

/// Reference year used by fixtures so literature recency stays stable.
pub const FIXTURE_YEAR: i32 = 2025;

/// Builder for raw findings with sensible defaults.
pub struct FindingBuilder {
    finding: RawFinding,
}

impl FindingBuilder {
    /// A pre-normalised finding: strength passes straight through.
    pub fn precomputed(subject: &str, category: EvidenceCategory, score: f64) -> Self {
        Self {
            finding: RawFinding::new(
                SourceId::Custom("fixture".into()),
                subject,
                category,
                Payload::Precomputed { score, label: category.to_string() },
            )
            .with_citation(format!("fixture:{subject}:{category}")),
        }
    }

    pub fn gwas(subject: &str, p_value: f64) -> Self {
        Self {
            finding: RawFinding::new(
                SourceId::GwasCatalog,
                subject,
                EvidenceCategory::Genetic,
                Payload::GeneticAssociation { p_value, risk_allele: None, study_pmid: None },
            ),
        }
    }

    pub fn publication(subject: &str, title: &str, year: i32) -> Self {
        Self {
            finding: RawFinding::new(
                SourceId::PubMed,
                subject,
                EvidenceCategory::Literature,
                Payload::Publication {
                    pmid: None,
                    title: title.to_string(),
                    abstract_text: None,
                    year: Some(year),
                    publication_types: Vec::new(),
                    journal: None,
                },
            ),
        }
    }

    pub fn structures(subject: &str, ids: &[&str]) -> Self {
        Self {
            finding: RawFinding::new(
                SourceId::Pdb,
                subject,
                EvidenceCategory::Structural,
                Payload::Structures { structure_ids: ids.iter().map(|s| s.to_string()).collect() },
            ),
        }
    }

    pub fn target_association(subject: &str, overall_score: f64) -> Self {
        Self {
            finding: RawFinding::new(
                SourceId::OpenTargets,
                subject,
                EvidenceCategory::Comprehensive,
                Payload::TargetAssociation {
                    protein_name: None,
                    overall_score,
                    datatype_scores: BTreeMap::new(),
                },
            ),
        }
    }

    pub fn source(mut self, source: SourceId) -> Self {
        self.finding.source_id = source;
        self
    }

    pub fn hint(mut self, hint: &str) -> Self {
        self.finding.category_hint = hint.to_string();
        self
    }

    pub fn citation(mut self, citation: &str) -> Self {
        self.finding.citation = citation.to_string();
        self
    }

    pub fn build(self) -> RawFinding {
        self.finding
    }
}

/// Three findings for STAT4: genetic 0.9, literature 0.6 and 0.7.
pub fn stat4_findings() -> Vec<RawFinding> {
    vec![
        FindingBuilder::precomputed("STAT4", EvidenceCategory::Genetic, 0.9)
            .source(SourceId::GwasCatalog)
            .build(),
        FindingBuilder::precomputed("STAT4", EvidenceCategory::Literature, 0.6)
            .source(SourceId::PubMed)
            .build(),
        FindingBuilder::precomputed("STAT4", EvidenceCategory::Literature, 0.7)
            .source(SourceId::PubMed)
            .build(),
    ]
}

/// A mixed lupus run across several sources, with one malformed and one unresolved finding.
pub fn lupus_findings() -> Vec<RawFinding> {
    let mut findings = stat4_findings();
    findings.extend([
        FindingBuilder::gwas("IRF5", 2e-12).build(),
        FindingBuilder::gwas("irf5 ", 3e-6).source(SourceId::DisGeNet).build(),
        FindingBuilder::publication("TNF", "TNF inhibitor therapy in lupus", 2024).build(),
        FindingBuilder::structures("TNF", &["1TNF", "2AZ5"]).build(),
        FindingBuilder::target_association("TNF", 0.62).build(),
        FindingBuilder::publication("", "Lupus epidemiology", 2019).build(),
        FindingBuilder::precomputed("IL6", EvidenceCategory::Pathway, 0.5)
            .hint("expression")
            .build(),
    ]);
    findings
}

pub fn opaque(subject: &str, hint: &str, local_score: f64) -> RawFinding {
    let mut finding = RawFinding::new(
        SourceId::Custom("fixture".into()),
        subject,
        EvidenceCategory::Functional,
        Payload::Opaque(serde_json::json!({ "subject": subject })),
    )
    .with_local_score(local_score)
    .with_citation("fixture:opaque");
    finding.category_hint = hint.to_string();
    finding
}
