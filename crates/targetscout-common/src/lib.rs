//! targetscout-common: shared types, errors, and the sandboxed HTTP client used across all TargetScout crates.

pub mod error;
pub mod entities;
pub mod sandbox;

// Re-export commonly used types
pub use error::{DiscoveryError, NormalizationError, Result};
pub use entities::{
    AliasTable, CategoryScores, EvidenceCategory, EvidenceTier, NoAliases, NormalizedEvidence,
    Payload, RankedTarget, RawFinding, SourceId,
};
pub use sandbox::{RetryPolicy, SandboxClient};
