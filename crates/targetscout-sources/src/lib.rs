//! targetscout-sources: evidence retrieval from biomedical services.
//! - Source adapters (DisGeNET, GWAS Catalog, PubMed, UniProt, Gene Ontology,
//!   Reactome, PDB, PubChem, Open Targets, file-backed custom sources)
//! - HGNC alias table for symbol resolution
//! - Concurrent two-phase fan-out

pub mod fanout;
pub mod models;
pub mod normalise;
pub mod sources;

pub use fanout::{collect_candidates, gather, run_two_phase, FanOut, SourceOutcome, DEFAULT_CANDIDATE_CAP};
pub use normalise::HgncAliasTable;
pub use sources::SourceAdapter;
