//! Open Targets Platform GraphQL client.
//!
//! Endpoint: https://api.platform.opentargets.org/api/v4/graphql
//!
//! Each associated target yields a comprehensive `TargetAssociation` finding,
//! plus precomputed genetic / literature / pathway sub-scores taken from the
//! platform's datatype scores when they are non-zero.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, info, instrument};

use super::{json_str, SourceAdapter};

const GRAPHQL_URL: &str = "https://api.platform.opentargets.org/api/v4/graphql";

const SEARCH_QUERY: &str = r#"query DiseaseSearch($q: String!) {
  search(queryString: $q, entityNames: ["disease"], page: {size: 1, index: 0}) {
    hits { id name entity }
  }
}"#;

const TARGETS_QUERY: &str = r#"query DiseaseTargets($efoId: String!, $size: Int!) {
  disease(efoId: $efoId) {
    id
    name
    associatedTargets(page: {size: $size, index: 0}) {
      rows {
        target { id approvedSymbol approvedName }
        score
        datatypeScores { id score }
      }
    }
  }
}"#;

/// Datatype scores re-emitted as category sub-scores.
const DATATYPE_CATEGORIES: &[(&str, EvidenceCategory)] = &[
    ("genetic_association", EvidenceCategory::Genetic),
    ("literature", EvidenceCategory::Literature),
    ("affected_pathway", EvidenceCategory::Pathway),
];

const NAME_SUFFIXES: &[&str] = &[" Mellitus", " Disease", " Syndrome"];

pub struct OpenTargetsClient {
    client: Client,
    max_results: usize,
}

impl OpenTargetsClient {
    pub fn new(client: Client, max_results: usize) -> Self {
        Self { client, max_results }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        let req = self.client.post(GRAPHQL_URL)?.json(&body);
        let resp: Value = self.client.send(req).await?.json().await?;
        if let Some(err) = resp["errors"][0]["message"].as_str() {
            return Err(DiscoveryError::unavailable(SourceId::OpenTargets, err));
        }
        Ok(resp)
    }

    async fn resolve_disease(&self, disease: &str) -> Result<Option<(String, String)>> {
        for name in name_variations(disease) {
            let resp = self.graphql(SEARCH_QUERY, json!({ "q": name })).await?;
            if let Some(hit) = parse_disease_hit(&resp) {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, disease: &str) -> Result<Vec<RawFinding>> {
        let Some((efo_id, name)) = self.resolve_disease(disease).await? else {
            debug!("No Open Targets disease match");
            return Ok(vec![]);
        };
        info!(%efo_id, %name, "Open Targets disease matched");

        let resp = self
            .graphql(TARGETS_QUERY, json!({ "efoId": efo_id, "size": self.max_results }))
            .await?;
        let findings = parse_associated_targets(&resp, &efo_id);
        debug!(count = findings.len(), "Open Targets findings parsed");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for OpenTargetsClient {
    fn id(&self) -> SourceId {
        SourceId::OpenTargets
    }

    async fn search(&self, disease: &str, _known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        self.fetch(disease).await.map_err(|e| match e {
            DiscoveryError::SourceUnavailable { .. } => e,
            other => DiscoveryError::unavailable(self.id(), other),
        })
    }
}

/// The name as given, then with common suffixes dropped.
pub fn name_variations(disease: &str) -> Vec<String> {
    let disease = disease.trim();
    let mut names = vec![disease.to_string()];
    for suffix in NAME_SUFFIXES {
        if disease.contains(suffix) {
            let short = disease.replace(suffix, "").trim().to_string();
            if !short.is_empty() && !names.contains(&short) {
                names.push(short);
            }
        }
    }
    names
}

pub fn parse_disease_hit(resp: &Value) -> Option<(String, String)> {
    let hits = resp["data"]["search"]["hits"].as_array()?;
    let hit = hits.iter().find(|h| h["entity"] == "disease")?;
    let id = json_str(hit, "id")?.to_string();
    let name = json_str(hit, "name").unwrap_or(id.as_str()).to_string();
    Some((id, name))
}

pub fn parse_associated_targets(resp: &Value, efo_id: &str) -> Vec<RawFinding> {
    let Some(rows) = resp["data"]["disease"]["associatedTargets"]["rows"].as_array() else {
        return vec![];
    };

    let mut findings = Vec::new();
    for row in rows {
        let target = &row["target"];
        let Some(symbol) = json_str(target, "approvedSymbol") else { continue };
        let Some(score) = row["score"].as_f64() else { continue };

        let datatype_scores: BTreeMap<String, f64> = row["datatypeScores"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|dt| Some((dt["id"].as_str()?.to_string(), dt["score"].as_f64()?)))
            .collect();

        let citation = match json_str(target, "id") {
            Some(ensembl) => format!("https://platform.opentargets.org/evidence/{ensembl}/{efo_id}"),
            None => format!("https://platform.opentargets.org/disease/{efo_id}"),
        };

        for (datatype, category) in DATATYPE_CATEGORIES {
            if let Some(&sub) = datatype_scores.get(*datatype).filter(|s| **s > 0.0) {
                findings.push(
                    RawFinding::new(
                        SourceId::OpenTargets,
                        symbol,
                        *category,
                        Payload::Precomputed { score: sub, label: format!("OpenTargets {datatype}") },
                    )
                    .with_citation(citation.clone()),
                );
            }
        }

        findings.push(
            RawFinding::new(
                SourceId::OpenTargets,
                symbol,
                EvidenceCategory::Comprehensive,
                Payload::TargetAssociation {
                    protein_name: json_str(target, "approvedName").map(String::from),
                    overall_score: score,
                    datatype_scores,
                },
            )
            .with_local_score(score)
            .with_citation(citation),
        );
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_variations() {
        assert_eq!(name_variations("Type 2 Diabetes Mellitus"), vec!["Type 2 Diabetes Mellitus", "Type 2 Diabetes"]);
        assert_eq!(name_variations(" lupus "), vec!["lupus"]);
    }

    #[test]
    fn test_parse_disease_hit() {
        let resp = json!({"data": {"search": {"hits": [
            {"id": "MONDO_0007915", "name": "systemic lupus erythematosus", "entity": "disease"}
        ]}}});
        assert_eq!(
            parse_disease_hit(&resp),
            Some(("MONDO_0007915".to_string(), "systemic lupus erythematosus".to_string()))
        );
        assert_eq!(parse_disease_hit(&json!({"data": {"search": {"hits": []}}})), None);
    }

    #[test]
    fn test_parse_associated_targets_emits_sub_scores() {
        let resp = json!({"data": {"disease": {"associatedTargets": {"rows": [
            {"target": {"id": "ENSG00000138378", "approvedSymbol": "STAT4",
                        "approvedName": "signal transducer and activator of transcription 4"},
             "score": 0.8,
             "datatypeScores": [
                {"id": "genetic_association", "score": 0.9},
                {"id": "literature", "score": 0.0},
                {"id": "animal_model", "score": 0.4}
             ]},
            {"target": {"approvedSymbol": null}, "score": 0.5}
        ]}}}});
        let findings = parse_associated_targets(&resp, "MONDO_0007915");
        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].category_hint, "genetic");
        assert_eq!(
            findings[0].payload,
            Payload::Precomputed { score: 0.9, label: "OpenTargets genetic_association".to_string() }
        );

        assert_eq!(findings[1].category_hint, "comprehensive");
        match &findings[1].payload {
            Payload::TargetAssociation { protein_name, overall_score, datatype_scores } => {
                assert!(protein_name.as_deref().unwrap().starts_with("signal transducer"));
                assert_eq!(*overall_score, 0.8);
                assert_eq!(datatype_scores.len(), 3);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(findings[1].citation.ends_with("ENSG00000138378/MONDO_0007915"));
    }
}
