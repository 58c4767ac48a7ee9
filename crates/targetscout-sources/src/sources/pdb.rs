//! RCSB PDB search client: experimental structures per candidate gene.

use async_trait::async_trait;
use serde_json::{json, Value};
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument, warn};

use super::{candidate_slice, json_str, SourceAdapter};

const SEARCH_URL: &str = "https://search.rcsb.org/rcsbsearch/v2/query";
const MAX_PROTEINS: usize = 10;
const MAX_STRUCTURES: usize = 5;

pub struct PdbClient {
    client: Client,
}

impl PdbClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn structures(&self, gene: &str) -> Result<Vec<String>> {
        let req = self.client.post(SEARCH_URL)?.json(&build_query(gene));
        let resp = self.client.send(req).await?;
        // RCSB answers 204 when nothing matches.
        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(vec![]);
        }
        let body: Value = resp.json().await?;
        Ok(parse_structure_ids(&body))
    }

    #[instrument(skip(self, genes), fields(n = genes.len()))]
    async fn fetch(&self, genes: &[String]) -> Result<Vec<RawFinding>> {
        let mut findings = Vec::new();
        let mut failures = 0usize;
        for gene in genes {
            match self.structures(gene).await {
                Ok(ids) if ids.is_empty() => {}
                Ok(ids) => findings.push(structures_finding(gene, ids)),
                Err(e) => {
                    warn!(%gene, error = %e, "PDB search failed");
                    failures += 1;
                }
            }
        }
        if failures == genes.len() && !genes.is_empty() {
            return Err(DiscoveryError::unavailable(SourceId::Pdb, "every structure search failed"));
        }
        debug!(count = findings.len(), "PDB structures collected");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for PdbClient {
    fn id(&self) -> SourceId {
        SourceId::Pdb
    }

    fn requires_candidates(&self) -> bool {
        true
    }

    async fn search(&self, _disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        let Some(genes) = candidate_slice(known, MAX_PROTEINS) else {
            return Ok(vec![]);
        };
        self.fetch(genes).await.map_err(|e| match e {
            DiscoveryError::SourceUnavailable { .. } => e,
            other => DiscoveryError::unavailable(self.id(), other),
        })
    }
}

pub fn build_query(gene: &str) -> Value {
    json!({
        "query": {
            "type": "terminal",
            "service": "text",
            "parameters": {
                "attribute": "rcsb_entity_source_organism.rcsb_gene_name.value",
                "operator": "exact_match",
                "value": gene
            }
        },
        "return_type": "entry",
        "request_options": {
            "paginate": {"start": 0, "rows": MAX_STRUCTURES},
            "results_content_type": ["experimental"],
            "sort": [{"sort_by": "score", "direction": "desc"}]
        }
    })
}

pub fn parse_structure_ids(resp: &Value) -> Vec<String> {
    resp["result_set"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|hit| json_str(hit, "identifier").map(String::from))
        .take(MAX_STRUCTURES)
        .collect()
}

fn structures_finding(gene: &str, structure_ids: Vec<String>) -> RawFinding {
    let citation = format!("https://www.rcsb.org/structure/{}", structure_ids[0]);
    RawFinding::new(SourceId::Pdb, gene, EvidenceCategory::Structural, Payload::Structures { structure_ids })
        .with_citation(citation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_targets_gene_name() {
        let q = build_query("TNF");
        assert_eq!(q["query"]["parameters"]["value"], "TNF");
        assert_eq!(q["request_options"]["paginate"]["rows"], 5);
    }

    #[test]
    fn test_parse_structure_ids_caps_at_five() {
        let hits: Vec<Value> = ["1TNF", "2AZ5", "3ALQ", "4TSV", "5UUI", "6OOY"]
            .iter()
            .map(|id| json!({"identifier": id, "score": 1.0}))
            .collect();
        let ids = parse_structure_ids(&json!({ "result_set": hits }));
        assert_eq!(ids, vec!["1TNF", "2AZ5", "3ALQ", "4TSV", "5UUI"]);
        assert!(parse_structure_ids(&json!({})).is_empty());
    }

    #[test]
    fn test_structures_finding() {
        let f = structures_finding("TNF", vec!["1TNF".into(), "2AZ5".into()]);
        assert_eq!(f.category_hint, "structural");
        assert_eq!(f.citation, "https://www.rcsb.org/structure/1TNF");
    }
}
