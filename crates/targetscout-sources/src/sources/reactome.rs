//! Reactome ContentService client: pathways per candidate gene, grouped by pathway.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument, warn};

use super::{candidate_slice, json_str, SourceAdapter};

const BASE_URL: &str = "https://reactome.org/ContentService";
const MAX_GENES: usize = 30;
const MAX_PATHWAYS: usize = 50;

const PATHWAY_KEYWORDS: &[&str] = &[
    "signaling", "immune", "inflammation", "apoptosis", "cell cycle",
    "metabolism", "receptor", "kinase", "cytokine", "interleukin",
];

/// A pathway and the candidate genes found in it, in lookup order.
#[derive(Debug, Clone, PartialEq)]
pub struct PathwayGroup {
    pub id: String,
    pub name: String,
    pub is_disease: bool,
    pub genes: Vec<String>,
}

pub struct ReactomeClient {
    client: Client,
}

impl ReactomeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    #[instrument(skip(self, genes), fields(n = genes.len()))]
    async fn fetch(&self, disease: &str, genes: &[String]) -> Result<Vec<RawFinding>> {
        let mut per_gene = Vec::new();
        let mut failures = 0usize;
        for gene in genes {
            let url = format!("{BASE_URL}/data/query/{gene}/pathways");
            let resp = self.client.get(&url)?.header("Accept", "application/json");
            match self.client.send(resp).await {
                Ok(r) => per_gene.push((gene.clone(), r.json::<Value>().await?)),
                // 404 means the identifier is unknown to Reactome.
                Err(DiscoveryError::Http(e)) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => {}
                Err(e) => {
                    warn!(%gene, error = %e, "Reactome lookup failed");
                    failures += 1;
                }
            }
        }
        if failures == genes.len() && !genes.is_empty() {
            return Err(DiscoveryError::unavailable(SourceId::Reactome, "every pathway lookup failed"));
        }

        let groups = group_pathways(&per_gene);
        debug!(pathways = groups.len(), "Reactome pathways grouped");
        Ok(pathway_findings(groups, disease))
    }
}

#[async_trait]
impl SourceAdapter for ReactomeClient {
    fn id(&self) -> SourceId {
        SourceId::Reactome
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

/// Group per-gene pathway lists by stable id, first-seen order.
pub fn group_pathways(per_gene: &[(String, Value)]) -> Vec<PathwayGroup> {
    let mut groups: Vec<PathwayGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (gene, resp) in per_gene {
        for pathway in resp.as_array().into_iter().flatten() {
            let Some(id) = json_str(pathway, "stId") else { continue };
            let slot = *index.entry(id.to_string()).or_insert_with(|| {
                groups.push(PathwayGroup {
                    id: id.to_string(),
                    name: json_str(pathway, "displayName").unwrap_or(id).to_string(),
                    is_disease: pathway["isInDisease"].as_bool().unwrap_or(false),
                    genes: Vec::new(),
                });
                groups.len() - 1
            });
            if !groups[slot].genes.contains(gene) {
                groups[slot].genes.push(gene.clone());
            }
        }
    }
    groups
}

pub fn keyword_matches(pathway_name: &str) -> u32 {
    let name = pathway_name.to_lowercase();
    PATHWAY_KEYWORDS.iter().filter(|k| name.contains(*k)).count() as u32
}

/// Any disease word longer than three letters appears in the pathway name.
pub fn disease_word_match(pathway_name: &str, disease: &str) -> bool {
    let name = pathway_name.to_lowercase();
    disease
        .to_lowercase()
        .split_whitespace()
        .any(|w| w.len() > 3 && name.contains(w))
}

/// Keep the 50 best-supported pathways, then emit one finding per member gene.
pub fn pathway_findings(mut groups: Vec<PathwayGroup>, disease: &str) -> Vec<RawFinding> {
    groups.sort_by(|a, b| {
        b.genes
            .len()
            .cmp(&a.genes.len())
            .then(b.is_disease.cmp(&a.is_disease))
            .then(keyword_matches(&b.name).cmp(&keyword_matches(&a.name)))
            .then(a.id.cmp(&b.id))
    });
    groups.truncate(MAX_PATHWAYS);

    let mut findings = Vec::new();
    for group in groups {
        let payload = Payload::Pathway {
            pathway_id: group.id.clone(),
            pathway_name: group.name.clone(),
            genes_in_pathway: group.genes.len() as u32,
            is_disease_pathway: group.is_disease,
            keyword_matches: keyword_matches(&group.name),
            disease_word_match: disease_word_match(&group.name, disease),
        };
        let citation = format!("https://reactome.org/content/detail/{}", group.id);
        for gene in &group.genes {
            findings.push(
                RawFinding::new(SourceId::Reactome, gene.as_str(), EvidenceCategory::Pathway, payload.clone())
                    .with_citation(citation.clone()),
            );
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Vec<(String, Value)> {
        vec![
            (
                "STAT4".to_string(),
                json!([
                    {"stId": "R-HSA-9020591", "displayName": "Interleukin-12 signaling", "isInDisease": false},
                    {"stId": "R-HSA-1280215", "displayName": "Cytokine Signaling in Immune system"}
                ]),
            ),
            (
                "IRF5".to_string(),
                json!([{"stId": "R-HSA-1280215", "displayName": "Cytokine Signaling in Immune system"}]),
            ),
            ("TNF".to_string(), json!({"code": 404})),
        ]
    }

    #[test]
    fn test_group_pathways() {
        let groups = group_pathways(&fixture());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].id, "R-HSA-1280215");
        assert_eq!(groups[1].genes, vec!["STAT4".to_string(), "IRF5".to_string()]);
    }

    #[test]
    fn test_keyword_and_disease_word_matches() {
        assert_eq!(keyword_matches("Cytokine Signaling in Immune system"), 3);
        assert_eq!(keyword_matches("Interleukin-12 signaling"), 2);
        assert!(disease_word_match("Lupus nephritis pathway", "systemic lupus"));
        assert!(!disease_word_match("Immune system", "SLE"));
    }

    #[test]
    fn test_pathway_findings_one_per_gene_sorted_by_support() {
        let findings = pathway_findings(group_pathways(&fixture()), "lupus");
        let pairs: Vec<(&str, &str)> = findings
            .iter()
            .map(|f| match &f.payload {
                Payload::Pathway { pathway_id, .. } => (f.subject.as_str(), pathway_id.as_str()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("STAT4", "R-HSA-1280215"),
                ("IRF5", "R-HSA-1280215"),
                ("STAT4", "R-HSA-9020591"),
            ]
        );
    }
}
