//! UniProtKB search client for reviewed human proteins linked to a disease.

use async_trait::async_trait;
use serde_json::Value;
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument};

use super::{candidate_slice, json_str, SourceAdapter};

pub(crate) const SEARCH_URL: &str = "https://rest.uniprot.org/uniprotkb/search";

/// Candidates OR-ed into the narrowed query.
const MAX_QUERY_GENES: usize = 10;

const FIELDS: &str = "accession,gene_names,protein_name,cc_function,cc_disease,ft_binding,xref_pdb";

pub struct UniProtClient {
    client: Client,
    max_results: usize,
}

impl UniProtClient {
    pub fn new(client: Client, max_results: usize) -> Self {
        Self { client, max_results }
    }

    #[instrument(skip(self, known))]
    async fn fetch(&self, disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        let query = build_query(disease, candidate_slice(known, MAX_QUERY_GENES));
        let req = self.client.get(SEARCH_URL)?.query(&[
            ("query", query),
            ("format", "json".to_string()),
            ("fields", FIELDS.to_string()),
            ("size", self.max_results.to_string()),
        ]);
        let resp: Value = self.client.send(req).await?.json().await?;
        let findings = parse_entries(&resp, disease);
        debug!(count = findings.len(), "UniProt entries parsed");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for UniProtClient {
    fn id(&self) -> SourceId {
        SourceId::UniProt
    }

    fn narrows_with_candidates(&self) -> bool {
        true
    }

    async fn search(&self, disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        self.fetch(disease, known)
            .await
            .map_err(|e| DiscoveryError::unavailable(self.id(), e))
    }
}

pub fn build_query(disease: &str, genes: Option<&[String]>) -> String {
    let mut query = format!("(disease:\"{disease}\") AND (reviewed:true) AND (organism_id:9606)");
    if let Some(genes) = genes {
        let ors: Vec<String> = genes.iter().map(|g| format!("gene:{g}")).collect();
        query.push_str(&format!(" AND ({})", ors.join(" OR ")));
    }
    query
}

pub fn parse_entries(resp: &Value, disease: &str) -> Vec<RawFinding> {
    let Some(entries) = resp["results"].as_array() else {
        return vec![];
    };
    let disease_lc = disease.trim().to_lowercase();

    entries
        .iter()
        .filter_map(|entry| {
            let accession = json_str(entry, "primaryAccession")?.to_string();
            let gene = entry["genes"][0]["geneName"]["value"].as_str()?;
            let protein_name = entry["proteinDescription"]["recommendedName"]["fullName"]["value"]
                .as_str()
                .map(String::from);

            let comments = entry["comments"].as_array().map(Vec::as_slice).unwrap_or(&[]);
            let function = comments
                .iter()
                .find(|c| c["commentType"] == "FUNCTION")
                .and_then(|c| c["texts"][0]["value"].as_str())
                .map(String::from);

            let (mut matching, mut other) = (0u32, 0u32);
            for c in comments.iter().filter(|c| c["commentType"] == "DISEASE") {
                let text = format!(
                    "{} {}",
                    c["disease"]["diseaseId"].as_str().unwrap_or(""),
                    c["disease"]["description"].as_str().unwrap_or("")
                )
                .to_lowercase();
                if !disease_lc.is_empty() && text.contains(&disease_lc) {
                    matching += 1;
                } else {
                    other += 1;
                }
            }

            let has_binding_site = entry["features"]
                .as_array()
                .into_iter()
                .flatten()
                .any(|f| matches!(f["type"].as_str(), Some("Binding site") | Some("BINDING")));
            let has_structure_xref = entry["uniProtKBCrossReferences"]
                .as_array()
                .into_iter()
                .flatten()
                .any(|x| x["database"] == "PDB");

            let payload = Payload::ProteinAnnotation {
                accession: accession.clone(),
                protein_name,
                matching_disease_annotations: matching,
                other_disease_annotations: other,
                has_binding_site,
                has_structure_xref,
                function,
            };
            Some(
                RawFinding::new(SourceId::UniProt, gene, EvidenceCategory::Functional, payload)
                    .with_citation(format!("https://www.uniprot.org/uniprotkb/{accession}/entry")),
            )
        })
        .collect()
}
