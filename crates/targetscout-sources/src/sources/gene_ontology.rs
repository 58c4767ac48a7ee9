//! Gene Ontology annotations per candidate gene, read from UniProt GO cross-references.

use async_trait::async_trait;
use serde_json::Value;
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument, warn};

use super::uniprot::SEARCH_URL;
use super::{candidate_slice, SourceAdapter};
use crate::models::{GoAspect, GoTerm};

const MAX_GENES: usize = 30;
const MAX_TERMS_PER_ASPECT: usize = 10;

const BASE_MECHANISMS: &[&str] = &[
    "signaling", "signal transduction", "immune", "inflammation", "apoptosis",
    "cell death", "proliferation", "metabolism", "transport", "binding",
    "catalytic", "kinase", "receptor",
];

/// Disease-class triggers and the mechanisms they add.
const DISEASE_MECHANISMS: &[(&[&str], &[&str])] = &[
    (
        &["alzheimer", "neurodegener"],
        &["amyloid", "tau", "neuronal", "synaptic", "cognitive", "phosphorylation", "aggregation", "proteolysis"],
    ),
    (
        &["diabetes"],
        &["insulin", "glucose", "glycolysis", "pancrea", "beta cell", "gluconeogenesis", "lipid metabolism"],
    ),
    (
        &["cancer", "tumor"],
        &["cell cycle", "tumor suppressor", "oncogene", "metastasis", "angiogenesis", "dna repair", "checkpoint"],
    ),
    (
        &["autoimmune", "lupus"],
        &["autoimmunity", "t cell", "b cell", "cytokine", "interferon", "complement", "antibody", "lymphocyte"],
    ),
    (
        &["heart", "cardiac", "cardiovascular"],
        &["cardiac", "heart", "vascular", "blood pressure", "atherosclerosis", "cholesterol", "lipid", "coagulation"],
    ),
];

pub struct GeneOntologyClient {
    client: Client,
}

impl GeneOntologyClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn annotations(&self, gene: &str) -> Result<Vec<GoTerm>> {
        let req = self.client.get(SEARCH_URL)?.query(&[
            ("query", format!("gene:{gene} AND organism_id:9606 AND reviewed:true")),
            ("format", "json".to_string()),
            ("size", "1".to_string()),
            ("fields", "accession,go".to_string()),
        ]);
        let resp: Value = self.client.send(req).await?.json().await?;
        Ok(parse_go_terms(&resp))
    }

    #[instrument(skip(self, genes), fields(n = genes.len()))]
    async fn fetch(&self, disease: &str, genes: &[String]) -> Result<Vec<RawFinding>> {
        let keywords = mechanism_keywords(disease);
        let mut findings = Vec::new();
        let mut failures = 0usize;

        for gene in genes {
            match self.annotations(gene).await {
                Ok(terms) => findings.extend(go_finding(gene, &terms, &keywords)),
                Err(e) => {
                    warn!(%gene, error = %e, "GO lookup failed");
                    failures += 1;
                }
            }
        }

        if failures == genes.len() && !genes.is_empty() {
            return Err(DiscoveryError::unavailable(self.id(), "every GO lookup failed"));
        }
        debug!(count = findings.len(), "GO annotations collected");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for GeneOntologyClient {
    fn id(&self) -> SourceId {
        SourceId::GeneOntology
    }

    fn requires_candidates(&self) -> bool {
        true
    }

    async fn search(&self, disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        let Some(genes) = candidate_slice(known, MAX_GENES) else {
            return Ok(vec![]);
        };
        self.fetch(disease, genes).await.map_err(|e| match e {
            DiscoveryError::SourceUnavailable { .. } => e,
            other => DiscoveryError::unavailable(self.id(), other),
        })
    }
}

/// Base mechanisms plus those for every disease class the name mentions.
pub fn mechanism_keywords(disease: &str) -> Vec<&'static str> {
    let disease = disease.to_lowercase();
    let mut keywords = BASE_MECHANISMS.to_vec();
    if let Some((_, extra)) = DISEASE_MECHANISMS
        .iter()
        .find(|(triggers, _)| triggers.iter().any(|t| disease.contains(t)))
    {
        keywords.extend_from_slice(extra);
    }
    keywords
}

pub fn parse_go_terms(resp: &Value) -> Vec<GoTerm> {
    let entry = &resp["results"][0];
    entry["uniProtKBCrossReferences"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|x| x["database"] == "GO")
        .filter_map(|x| {
            let id = x["id"].as_str()?.to_string();
            let raw = x["properties"]
                .as_array()?
                .iter()
                .find(|p| p["key"] == "GoTerm")?["value"]
                .as_str()?;
            let (prefix, name) = raw.split_once(':')?;
            let aspect = GoAspect::from_prefix(prefix.chars().next()?)?;
            Some(GoTerm { id, name: name.to_string(), aspect })
        })
        .collect()
}

/// Keywords that occur in at least one term name.
pub fn mechanism_matches(terms: &[&GoTerm], keywords: &[&str]) -> Vec<String> {
    let names: Vec<String> = terms.iter().map(|t| t.name.to_lowercase()).collect();
    keywords
        .iter()
        .filter(|k| names.iter().any(|n| n.contains(*k)))
        .map(|k| k.to_string())
        .collect()
}

pub fn go_finding(gene: &str, terms: &[GoTerm], keywords: &[&str]) -> Option<RawFinding> {
    if terms.is_empty() {
        return None;
    }
    let of = |aspect: GoAspect| -> Vec<&GoTerm> { terms.iter().filter(|t| t.aspect == aspect).collect() };
    let bp = of(GoAspect::BiologicalProcess);
    let mf = of(GoAspect::MolecularFunction);

    let both: Vec<&GoTerm> = bp.iter().chain(mf.iter()).copied().collect();
    let payload = Payload::GoAnnotation {
        biological_processes: bp.iter().take(MAX_TERMS_PER_ASPECT).map(|t| t.name.clone()).collect(),
        molecular_functions: mf.iter().take(MAX_TERMS_PER_ASPECT).map(|t| t.name.clone()).collect(),
        mechanism_matches: mechanism_matches(&both, keywords),
    };
    Some(
        RawFinding::new(SourceId::GeneOntology, gene, EvidenceCategory::Functional, payload)
            .with_citation(format!("https://www.ebi.ac.uk/QuickGO/annotations?geneProductId={gene}")),
    )
}
