//! targetscout-ranker: evidence normalisation, aggregation and target ranking.
//! Pure and synchronous; no I/O.

pub mod resolver;
pub mod normalise;
pub mod aggregator;
pub mod weights;
pub mod scorer;
pub mod pipeline;

pub use aggregator::{aggregate, Aggregator, EntityEvidenceRecord};
pub use normalise::{Normalizer, NormalizerContext};
pub use pipeline::{DiscoveryPipeline, DiscoveryReport, RankingConfig, RunStats};
pub use resolver::{canonicalize, EntityResolver};
pub use scorer::{Ranker, ScoreBreakdown};
pub use weights::WeightTable;
