//! Evidence source adapters.
//!
//! Each adapter is a thin HTTP client plus a pure parser. The parser turns a
//! service response into `RawFinding`s and is tested offline against fixtures.

pub mod custom;
pub mod disgenet;
pub mod gene_ontology;
pub mod gwas;
pub mod opentargets;
pub mod pdb;
pub mod pubchem;
pub mod pubmed;
pub mod reactome;
pub mod uniprot;

use async_trait::async_trait;
use targetscout_common::{RawFinding, Result, SourceId};

pub use custom::{CustomFileSource, CustomSourceSpec, FileFormat};
pub use disgenet::DisGeNetClient;
pub use gene_ontology::GeneOntologyClient;
pub use gwas::GwasCatalogClient;
pub use opentargets::OpenTargetsClient;
pub use pdb::PdbClient;
pub use pubchem::PubChemClient;
pub use pubmed::PubMedClient;
pub use reactome::ReactomeClient;
pub use uniprot::UniProtClient;

/// Common interface for all evidence sources.
///
/// `Ok(vec![])` means the source had nothing to say. Transport failures come
/// back as `DiscoveryError::SourceUnavailable`; the caller treats them as
/// absent evidence.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// Sources that look up a list of proteins rather than the disease.
    fn requires_candidates(&self) -> bool {
        false
    }

    /// Disease-level sources that can run a sharper query once candidates
    /// are known. They run again in phase 2 with the candidate list.
    fn narrows_with_candidates(&self) -> bool {
        false
    }

    async fn search(&self, disease: &str, known_proteins: Option<&[String]>) -> Result<Vec<RawFinding>>;
}

/// Non-empty candidate slice, capped, or `None` when there is nothing to look up.
pub(crate) fn candidate_slice(known: Option<&[String]>, cap: usize) -> Option<&[String]> {
    match known {
        Some(list) if !list.is_empty() => Some(&list[..list.len().min(cap)]),
        _ => None,
    }
}

/// `value[key]` as a string, treating null and empty as missing.
pub(crate) fn json_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value[key].as_str().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_slice_caps_and_skips_empty() {
        let list: Vec<String> = (0..5).map(|i| format!("G{i}")).collect();
        assert_eq!(candidate_slice(Some(&list), 3).map(<[String]>::len), Some(3));
        assert_eq!(candidate_slice(Some(&list), 10).map(<[String]>::len), Some(5));
        assert!(candidate_slice(Some(&[]), 3).is_none());
        assert!(candidate_slice(None, 3).is_none());
    }
}
