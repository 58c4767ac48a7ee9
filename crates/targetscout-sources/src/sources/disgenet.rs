//! DisGeNET gene-disease association client.
//!
//! Endpoints used:
//!   disease search: https://www.disgenet.org/api/disease/search
//!   associations:   https://www.disgenet.org/api/gda/disease/{id}

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, info, instrument};

use super::{json_str, SourceAdapter};

const BASE_URL: &str = "https://www.disgenet.org/api";

pub struct DisGeNetClient {
    client: Client,
    api_key: Option<SecretString>,
    max_results: usize,
}

impl DisGeNetClient {
    pub fn new(client: Client, api_key: Option<SecretString>, max_results: usize) -> Self {
        Self { client, api_key, max_results }
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut req = self.client.get(url)?.query(params).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }
        Ok(self.client.send(req).await?.json().await?)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, disease: &str) -> Result<Vec<RawFinding>> {
        let search = self
            .get_json(
                &format!("{BASE_URL}/disease/search"),
                &[("query", disease.to_string()), ("limit", "5".to_string())],
            )
            .await?;

        let Some((disease_id, disease_name)) = parse_disease_match(&search) else {
            debug!("No DisGeNET disease match");
            return Ok(vec![]);
        };
        info!(%disease_id, %disease_name, "DisGeNET disease matched");

        let gda = self
            .get_json(
                &format!("{BASE_URL}/gda/disease/{disease_id}"),
                &[("limit", "100".to_string()), ("min_score", "0.1".to_string())],
            )
            .await?;

        Ok(parse_associations(&gda, &disease_id, self.max_results))
    }
}

#[async_trait]
impl SourceAdapter for DisGeNetClient {
    fn id(&self) -> SourceId {
        SourceId::DisGeNet
    }

    async fn search(&self, disease: &str, _known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        self.fetch(disease)
            .await
            .map_err(|e| DiscoveryError::unavailable(self.id(), e))
    }
}

/// Top disease hit as (id, name).
pub fn parse_disease_match(resp: &Value) -> Option<(String, String)> {
    let first = resp["results"].as_array()?.first()?;
    let id = json_str(first, "diseaseId")?.to_string();
    let name = json_str(first, "diseaseName").unwrap_or(id.as_str()).to_string();
    Some((id, name))
}

pub fn parse_associations(resp: &Value, disease_id: &str, max_results: usize) -> Vec<RawFinding> {
    let Some(rows) = resp["results"].as_array() else {
        return vec![];
    };

    rows.iter()
        .take(max_results)
        .filter_map(|row| {
            let symbol = json_str(row, "geneSymbol")?;
            let score = row["score"].as_f64().unwrap_or(0.0);
            let gene_id = row["geneId"].as_u64().map(|id| id.to_string()).unwrap_or_default();
            let payload = Payload::GeneDiseaseAssociation {
                score,
                evidence_index: row["ei"].as_f64().unwrap_or(0.0),
                n_publications: row["nPmids"].as_u64().unwrap_or(0) as u32,
                n_snps: row["nSnps"].as_u64().unwrap_or(0) as u32,
                association_type: json_str(row, "associationType").map(String::from),
            };
            Some(
                RawFinding::new(SourceId::DisGeNet, symbol, EvidenceCategory::Genetic, payload)
                    .with_local_score(score)
                    .with_citation(format!("https://www.disgenet.org/browser/0/1/0/{disease_id}/geneid__{gene_id}/")),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_disease_match() {
        let resp = json!({"results": [
            {"diseaseId": "C0024141", "diseaseName": "Lupus Erythematosus, Systemic"},
            {"diseaseId": "C0024138", "diseaseName": "Lupus Erythematosus, Cutaneous"}
        ]});
        assert_eq!(
            parse_disease_match(&resp),
            Some(("C0024141".to_string(), "Lupus Erythematosus, Systemic".to_string()))
        );
        assert_eq!(parse_disease_match(&json!({"results": []})), None);
    }

    #[test]
    fn test_parse_associations() {
        let resp = json!({"results": [
            {"geneSymbol": "STAT4", "geneId": 6775, "score": 0.7, "ei": 0.95,
             "nPmids": 42, "nSnps": 12, "associationType": "GeneticVariation"},
            {"geneSymbol": "", "geneId": 1, "score": 0.5},
            {"geneSymbol": "IRF5", "geneId": 3663, "score": 0.6}
        ]});
        let findings = parse_associations(&resp, "C0024141", 50);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].subject, "STAT4");
        assert_eq!(findings[0].category_hint, "genetic");
        match &findings[0].payload {
            Payload::GeneDiseaseAssociation { n_publications, n_snps, .. } => {
                assert_eq!(*n_publications, 42);
                assert_eq!(*n_snps, 12);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(findings[0].citation.contains("C0024141"));
    }

    #[test]
    fn test_parse_associations_respects_cap() {
        let rows: Vec<Value> = (0..10)
            .map(|i| json!({"geneSymbol": format!("GENE{i}"), "score": 0.5}))
            .collect();
        let findings = parse_associations(&json!({ "results": rows }), "C1", 3);
        assert_eq!(findings.len(), 3);
    }
}
