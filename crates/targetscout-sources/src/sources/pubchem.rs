//! PubChem PUG REST client: compounds linked to a protein name.

use async_trait::async_trait;
use serde_json::Value;
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument, warn};

use super::{candidate_slice, SourceAdapter};

const BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";
const MAX_PROTEINS: usize = 10;
const MAX_COMPOUNDS: usize = 5;

pub struct PubChemClient {
    client: Client,
}

impl PubChemClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn compound_ids(&self, protein: &str) -> Result<Vec<u64>> {
        let url = format!("{BASE_URL}/compound/name/{protein}/cids/JSON");
        let req = self.client.get(&url)?.query(&[("name_type", "word")]);
        match self.client.send(req).await {
            Ok(resp) => Ok(parse_cids(&resp.json::<Value>().await?)),
            // PUG REST reports "no match" as 404.
            Err(DiscoveryError::Http(e)) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => Ok(vec![]),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, proteins), fields(n = proteins.len()))]
    async fn fetch(&self, proteins: &[String]) -> Result<Vec<RawFinding>> {
        let mut findings = Vec::new();
        let mut failures = 0usize;
        for protein in proteins {
            match self.compound_ids(protein).await {
                Ok(cids) if cids.is_empty() => {}
                Ok(cids) => findings.push(compounds_finding(protein, cids)),
                Err(e) => {
                    warn!(%protein, error = %e, "PubChem lookup failed");
                    failures += 1;
                }
            }
        }
        if failures == proteins.len() && !proteins.is_empty() {
            return Err(DiscoveryError::unavailable(SourceId::PubChem, "every compound lookup failed"));
        }
        debug!(count = findings.len(), "PubChem compounds collected");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for PubChemClient {
    fn id(&self) -> SourceId {
        SourceId::PubChem
    }

    fn requires_candidates(&self) -> bool {
        true
    }

    async fn search(&self, _disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        let Some(proteins) = candidate_slice(known, MAX_PROTEINS) else {
            return Ok(vec![]);
        };
        self.fetch(proteins).await.map_err(|e| match e {
            DiscoveryError::SourceUnavailable { .. } => e,
            other => DiscoveryError::unavailable(self.id(), other),
        })
    }
}

pub fn parse_cids(resp: &Value) -> Vec<u64> {
    resp["IdentifierList"]["CID"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_u64)
        .take(MAX_COMPOUNDS)
        .collect()
}

fn compounds_finding(protein: &str, compound_ids: Vec<u64>) -> RawFinding {
    let citation = format!("https://pubchem.ncbi.nlm.nih.gov/compound/{}", compound_ids[0]);
    RawFinding::new(SourceId::PubChem, protein, EvidenceCategory::Druggability, Payload::Compounds { compound_ids })
        .with_citation(citation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cids() {
        let resp = json!({"IdentifierList": {"CID": [5743, 2244, 3672, 1983, 156391, 60823]}});
        assert_eq!(parse_cids(&resp), vec![5743, 2244, 3672, 1983, 156391]);
        assert!(parse_cids(&json!({"Fault": {"Code": "PUGREST.NotFound"}})).is_empty());
    }

    #[test]
    fn test_compounds_finding() {
        let f = compounds_finding("JAK2", vec![44205240]);
        assert_eq!(f.category_hint, "druggability");
        assert_eq!(f.payload, Payload::Compounds { compound_ids: vec![44205240] });
    }
}
