//! One discovery run: normalise → resolve → aggregate → rank.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use targetscout_common::{AliasTable, DiscoveryError, NoAliases, RankedTarget, RawFinding, Result};
use tracing::{info, instrument, warn};

use crate::aggregator::{Aggregator, EntityEvidenceRecord};
use crate::normalise::{Normalizer, NormalizerContext};
use crate::resolver::EntityResolver;
use crate::scorer::{Ranker, ScoreBreakdown};
use crate::weights::WeightTable;

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub disease: String,
    pub top_k: usize,
    pub weights: WeightTable,
    /// Rescale the weight table to sum 1.0 instead of rejecting it.
    pub renormalise: bool,
    pub min_overall_score: f64,
    /// Year used by the literature recency tiers.
    pub reference_year: i32,
}

impl RankingConfig {
    pub fn new(disease: impl Into<String>, top_k: usize, reference_year: i32) -> Self {
        Self {
            disease: disease.into(),
            top_k,
            weights: WeightTable::default(),
            renormalise: false,
            min_overall_score: 0.0,
            reference_year,
        }
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = weights;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub received: usize,
    pub normalized: usize,
    /// Dropped by the normaliser (unknown category or malformed payload).
    pub rejected: usize,
    /// Normalised but without a plausible gene symbol; disease-level context only.
    pub unresolved: usize,
    pub entities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub disease: String,
    pub targets: Vec<RankedTarget>,
    pub breakdowns: Vec<ScoreBreakdown>,
    pub stats: RunStats,
}

pub struct DiscoveryPipeline {
    config: RankingConfig,
    normalizer: Normalizer,
    resolver: EntityResolver,
    ranker: Ranker,
}

impl DiscoveryPipeline {
    /// Validates the configuration. Any error here aborts before aggregation.
    pub fn new(config: RankingConfig) -> Result<Self> {
        Self::with_aliases(config, Arc::new(NoAliases))
    }

    pub fn with_aliases(mut config: RankingConfig, aliases: Arc<dyn AliasTable>) -> Result<Self> {
        if config.top_k == 0 {
            return Err(DiscoveryError::config("top_k must be at least 1"));
        }
        if config.renormalise {
            config.weights.normalise()?;
        }
        let ranker = Ranker::new(config.weights.clone())?
            .with_min_overall_score(config.min_overall_score)?;
        let normalizer = Normalizer::new(NormalizerContext::new(
            config.disease.clone(),
            config.reference_year,
        ));

        Ok(Self {
            config,
            normalizer,
            resolver: EntityResolver::new(aliases),
            ranker,
        })
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Per-finding failures are logged and counted, never fatal.
    #[instrument(skip(self, findings), fields(disease = %self.config.disease))]
    pub fn run(&self, findings: Vec<RawFinding>) -> Result<DiscoveryReport> {
        let mut stats = RunStats { received: findings.len(), ..Default::default() };
        let mut aggregator = Aggregator::new();

        for raw in findings {
            let mut evidence = match self.normalizer.normalize(&raw) {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(source = %raw.source_id, subject = %raw.subject, error = %e, "Dropping finding");
                    stats.rejected += 1;
                    continue;
                }
            };
            stats.normalized += 1;

            match self.resolver.canonicalize(&evidence.subject_key) {
                Some(key) => {
                    evidence.subject_key = key;
                    aggregator.add(evidence);
                }
                None => stats.unresolved += 1,
            }
        }

        let records = aggregator.finish();
        stats.entities = records.len();

        let targets = self.ranker.rank(&records, self.config.top_k)?;
        let breakdowns = targets
            .iter()
            .filter_map(|t| records.get(&t.symbol))
            .map(|r: &EntityEvidenceRecord| self.ranker.breakdown(r))
            .collect();

        info!(
            received = stats.received,
            rejected = stats.rejected,
            unresolved = stats.unresolved,
            entities = stats.entities,
            ranked = targets.len(),
            "Discovery run complete"
        );

        Ok(DiscoveryReport {
            disease: self.config.disease.clone(),
            targets,
            breakdowns,
            stats,
        })
    }
}
