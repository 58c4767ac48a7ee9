//! Builds source adapters for a plan from configuration.

use std::sync::Arc;
use std::time::Duration;

use targetscout_common::sandbox::SandboxClient;
use targetscout_common::{DiscoveryError, Result, SourceId};
use targetscout_config::{Config, CustomSourceConfig};
use targetscout_sources::sources::{
    CustomFileSource, CustomSourceSpec, DisGeNetClient, FileFormat, GeneOntologyClient, GwasCatalogClient,
    OpenTargetsClient, PdbClient, PubChemClient, PubMedClient, ReactomeClient, UniProtClient,
};
use targetscout_sources::SourceAdapter;

pub fn custom_spec(custom: &CustomSourceConfig) -> CustomSourceSpec {
    let format = custom.format.as_deref().map(|f| match f.to_lowercase().as_str() {
        "json" => FileFormat::Json,
        _ => FileFormat::Csv,
    });
    CustomSourceSpec {
        name: custom.name.clone(),
        path: custom.path.clone(),
        format,
        symbol_column: custom.symbol_column.clone(),
        score_column: custom.score_column.clone(),
        category_column: custom.category_column.clone(),
        citation_column: custom.citation_column.clone(),
        default_category: custom.default_category.clone(),
    }
}

/// One shared HTTP client; adapters clone it.
pub fn http_client(config: &Config) -> Result<SandboxClient> {
    SandboxClient::with_timeout(Duration::from_secs(config.search.timeout_secs))
}

pub fn build_adapter(id: &SourceId, config: &Config, client: &SandboxClient) -> Result<Arc<dyn SourceAdapter>> {
    let max = config.search.max_results_per_source;
    let adapter: Arc<dyn SourceAdapter> = match id {
        SourceId::DisGeNet => Arc::new(DisGeNetClient::new(client.clone(), config.api.disgenet_api_key.clone(), max)),
        SourceId::GwasCatalog => Arc::new(GwasCatalogClient::new(client.clone(), max)),
        SourceId::PubMed => Arc::new(
            PubMedClient::new(
                client.clone(),
                config.api.ncbi_api_key.clone(),
                config.api.ncbi_email.clone(),
                max,
            )
            .with_requests_per_second(config.search.requests_per_second),
        ),
        SourceId::UniProt => Arc::new(UniProtClient::new(client.clone(), max)),
        SourceId::GeneOntology => Arc::new(GeneOntologyClient::new(client.clone())),
        SourceId::Reactome => Arc::new(ReactomeClient::new(client.clone())),
        SourceId::Pdb => Arc::new(PdbClient::new(client.clone())),
        SourceId::PubChem => Arc::new(PubChemClient::new(client.clone())),
        SourceId::OpenTargets => Arc::new(OpenTargetsClient::new(client.clone(), max)),
        SourceId::Custom(name) => {
            let custom = config
                .sources
                .custom
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| DiscoveryError::config(format!("no custom source named {name:?}")))?;
            Arc::new(CustomFileSource::new(custom_spec(custom)))
        }
    };
    Ok(adapter)
}

pub fn build_adapters(plan: &[SourceId], config: &Config) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let client = http_client(config)?;
    plan.iter().map(|id| build_adapter(id, config, &client)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_adapters_follows_plan() {
        let config = Config::default();
        let plan = vec![SourceId::Reactome, SourceId::PubMed];
        let adapters = build_adapters(&plan, &config).unwrap();
        let ids: Vec<SourceId> = adapters.iter().map(|a| a.id()).collect();
        assert_eq!(ids, plan);
        assert!(adapters[0].requires_candidates());
        assert!(!adapters[1].requires_candidates());
    }

    #[test]
    fn test_unknown_custom_source_is_a_config_error() {
        let err = build_adapters(&[SourceId::Custom("missing".into())], &Config::default())
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_custom_spec_format() {
        let custom = CustomSourceConfig {
            name: "hits".into(),
            path: "hits.data".into(),
            format: Some("JSON".into()),
            symbol_column: "gene".into(),
            score_column: "score".into(),
            category_column: None,
            citation_column: None,
            default_category: None,
        };
        assert_eq!(custom_spec(&custom).format(), FileFormat::Json);
    }
}
