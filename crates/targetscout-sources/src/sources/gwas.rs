//! GWAS Catalog REST client: trait lookup, then that trait's associations.

use async_trait::async_trait;
use serde_json::Value;
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument};

use super::{json_str, SourceAdapter};

const TRAIT_SEARCH_URL: &str = "https://www.ebi.ac.uk/gwas/rest/api/efoTraits/search/findByEfoTrait";

/// Reported-gene placeholders the catalog uses for loci without a gene.
const NON_GENES: &[&str] = &["NR", "INTERGENIC", "UNKNOWN"];

pub struct GwasCatalogClient {
    client: Client,
    max_results: usize,
}

impl GwasCatalogClient {
    pub fn new(client: Client, max_results: usize) -> Self {
        Self { client, max_results }
    }

    #[instrument(skip(self))]
    async fn fetch(&self, disease: &str) -> Result<Vec<RawFinding>> {
        let req = self
            .client
            .get(TRAIT_SEARCH_URL)?
            .query(&[("trait", disease)])
            .header("Accept", "application/json");
        let traits: Value = self.client.send(req).await?.json().await?;

        let Some(trait_href) = parse_trait_href(&traits) else {
            debug!("No EFO trait match");
            return Ok(vec![]);
        };

        let assoc: Value = self.client.get_json(&format!("{trait_href}/associations")).await?;
        let findings = parse_associations(&assoc, self.max_results);
        debug!(count = findings.len(), "GWAS associations parsed");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for GwasCatalogClient {
    fn id(&self) -> SourceId {
        SourceId::GwasCatalog
    }

    async fn search(&self, disease: &str, _known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        self.fetch(disease)
            .await
            .map_err(|e| DiscoveryError::unavailable(self.id(), e))
    }
}

/// Self link of the first matching EFO trait.
pub fn parse_trait_href(resp: &Value) -> Option<String> {
    let first = resp["_embedded"]["efoTraits"].as_array()?.first()?;
    first["_links"]["self"]["href"].as_str().map(String::from)
}

/// One finding per reported gene per association, in catalog order.
pub fn parse_associations(resp: &Value, max_results: usize) -> Vec<RawFinding> {
    let Some(rows) = resp["_embedded"]["associations"].as_array() else {
        return vec![];
    };

    let mut findings = Vec::new();
    for assoc in rows.iter().take(max_results) {
        let Some(p_value) = assoc["pvalue"].as_f64() else {
            continue;
        };
        let locus = &assoc["loci"][0];
        let risk_allele = locus["strongestRiskAlleles"][0]["riskAlleleName"]
            .as_str()
            .or_else(|| assoc["strongestAllele"].as_str())
            .map(String::from);
        let study_pmid = assoc["study"]["publicationInfo"]["pubmedId"]
            .as_str()
            .map(String::from);
        let citation = assoc["_links"]["self"]["href"]
            .as_str()
            .map(String::from)
            .unwrap_or_default();

        let mut seen: Vec<&str> = Vec::new();
        for gene in locus["authorReportedGenes"].as_array().into_iter().flatten() {
            let Some(name) = json_str(gene, "geneName") else { continue };
            if NON_GENES.contains(&name.to_uppercase().as_str()) || seen.contains(&name) {
                continue;
            }
            seen.push(name);
            findings.push(
                RawFinding::new(
                    SourceId::GwasCatalog,
                    name,
                    EvidenceCategory::Genetic,
                    Payload::GeneticAssociation {
                        p_value,
                        risk_allele: risk_allele.clone(),
                        study_pmid: study_pmid.clone(),
                    },
                )
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

    #[test]
    fn test_parse_trait_href() {
        let resp = json!({"_embedded": {"efoTraits": [
            {"trait": "systemic lupus erythematosus",
             "_links": {"self": {"href": "https://www.ebi.ac.uk/gwas/rest/api/efoTraits/EFO_0002690"}}}
        ]}});
        assert_eq!(
            parse_trait_href(&resp).as_deref(),
            Some("https://www.ebi.ac.uk/gwas/rest/api/efoTraits/EFO_0002690")
        );
        assert_eq!(parse_trait_href(&json!({})), None);
    }

    #[test]
    fn test_parse_associations_splits_genes_and_skips_placeholders() {
        let resp = json!({"_embedded": {"associations": [
            {"pvalue": 3e-20,
             "loci": [{"authorReportedGenes": [{"geneName": "STAT4"}, {"geneName": "STAT1"}, {"geneName": "STAT4"}],
                       "strongestRiskAlleles": [{"riskAlleleName": "rs7574865-T"}]}],
             "_links": {"self": {"href": "https://www.ebi.ac.uk/gwas/rest/api/associations/1"}}},
            {"pvalue": 1e-6,
             "loci": [{"authorReportedGenes": [{"geneName": "NR"}, {"geneName": "intergenic"}]}]},
            {"loci": [{"authorReportedGenes": [{"geneName": "IRF5"}]}]}
        ]}});
        let findings = parse_associations(&resp, 10);
        let subjects: Vec<&str> = findings.iter().map(|f| f.subject.as_str()).collect();
        assert_eq!(subjects, vec!["STAT4", "STAT1"]);
        match &findings[0].payload {
            Payload::GeneticAssociation { p_value, risk_allele, .. } => {
                assert_eq!(*p_value, 3e-20);
                assert_eq!(risk_allele.as_deref(), Some("rs7574865-T"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(findings[0].citation.ends_with("/associations/1"));
    }
}
