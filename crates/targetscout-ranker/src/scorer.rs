//! Composite target score and final ordering.
//!
//! S(g) = Σ w_c × s_c(g) over the seven evidence categories.
//! Order: S descending, distinct source count descending, symbol ascending.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use targetscout_common::{CategoryScores, DiscoveryError, EvidenceTier, RankedTarget, Result};
use tracing::debug;

use crate::aggregator::EntityEvidenceRecord;
use crate::weights::WeightTable;

/// Per-target explanation of the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub symbol: String,
    pub category_scores: CategoryScores,
    /// weight × category score
    pub contributions: CategoryScores,
    pub overall_score: f64,
}

/// Composites are rounded to this many units per 1.0 so that floating-point
/// drift in the weighted sum cannot move a score across a tier boundary.
const SCORE_RESOLUTION: f64 = 1e9;

/// Weighted sum of category scores, rounded and clamped to [0, 1].
pub fn compute_composite_score(scores: &CategoryScores, weights: &WeightTable) -> f64 {
    let weighted_sum: f64 = scores
        .as_array()
        .iter()
        .zip(weights.as_array().iter())
        .map(|(s, w)| s * w)
        .sum();
    ((weighted_sum * SCORE_RESOLUTION).round() / SCORE_RESOLUTION).clamp(0.0, 1.0)
}

/// Pure function of its input records: no hidden state between calls.
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: WeightTable,
    min_overall_score: f64,
}

impl Ranker {
    pub fn new(weights: WeightTable) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights, min_overall_score: 0.0 })
    }

    /// Drop targets scoring below `min` before truncation.
    pub fn with_min_overall_score(mut self, min: f64) -> Result<Self> {
        if !min.is_finite() || !(0.0..=1.0).contains(&min) {
            return Err(DiscoveryError::config(format!("min_overall_score must be in [0, 1], got {min}")));
        }
        self.min_overall_score = min;
        Ok(self)
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn breakdown(&self, record: &EntityEvidenceRecord) -> ScoreBreakdown {
        let scores = *record.category_scores();
        ScoreBreakdown {
            symbol: record.subject_key().to_string(),
            category_scores: scores,
            contributions: self.weights.contributions(&scores),
            overall_score: compute_composite_score(&scores, &self.weights),
        }
    }

    /// Score, sort, filter and truncate. `top_k` must be at least 1.
    pub fn rank(
        &self,
        records: &BTreeMap<String, EntityEvidenceRecord>,
        top_k: usize,
    ) -> Result<Vec<RankedTarget>> {
        if top_k == 0 {
            return Err(DiscoveryError::config("top_k must be at least 1"));
        }

        let mut scored: Vec<(ScoreBreakdown, &EntityEvidenceRecord)> = records
            .values()
            .map(|r| (self.breakdown(r), r))
            .filter(|(b, _)| b.overall_score >= self.min_overall_score)
            .collect();

        scored.sort_by(|(a, ra), (b, rb)| compare_targets(a, ra, b, rb));
        scored.truncate(top_k);

        debug!(candidates = records.len(), kept = scored.len(), top_k, "ranked targets");

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (b, r))| RankedTarget {
                rank: i + 1,
                symbol: b.symbol,
                protein_name: r.protein_name().map(str::to_string),
                overall_score: b.overall_score,
                category_scores: b.category_scores,
                contributions: b.contributions,
                evidence_strength: EvidenceTier::from_score(b.overall_score),
                sources: r.sources().to_vec(),
                findings: r.findings().to_vec(),
                related_pathways: r.related_pathways().to_vec(),
            })
            .collect())
    }
}

fn compare_targets(
    a: &ScoreBreakdown,
    ra: &EntityEvidenceRecord,
    b: &ScoreBreakdown,
    rb: &EntityEvidenceRecord,
) -> Ordering {
    b.overall_score
        .total_cmp(&a.overall_score)
        .then_with(|| rb.sources().len().cmp(&ra.sources().len()))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::weights::PROFILES;
    use targetscout_common::{EvidenceCategory, NormalizedEvidence, Payload, SourceId};

    fn ev(subject: &str, category: EvidenceCategory, strength: f64, source: SourceId) -> NormalizedEvidence {
        NormalizedEvidence {
            subject_key: subject.to_string(),
            category,
            strength,
            source,
            citation: String::new(),
            raw_payload: Payload::Precomputed { score: strength, label: category.to_string() },
        }
    }

    fn even_weights() -> WeightTable {
        let mut w = WeightTable::classic();
        w.genetic = 0.5;
        w.literature = 0.5;
        w.structural = 0.0;
        w.druggability = 0.0;
        w
    }

    #[test]
    fn test_top_k_zero_is_configuration_error() {
        let ranker = Ranker::new(WeightTable::default()).unwrap();
        let err = ranker.rank(&BTreeMap::new(), 0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_weights_rejected_at_construction() {
        let mut w = WeightTable::default();
        w.genetic = 0.9;
        assert!(Ranker::new(w).is_err());
    }

    #[test]
    fn test_tie_break_by_source_count_then_symbol() {
        let records = aggregate(vec![
            ev("TNF", EvidenceCategory::Genetic, 0.55, SourceId::GwasCatalog),
            ev("TNF", EvidenceCategory::Literature, 0.55, SourceId::PubMed),
            ev("IL6", EvidenceCategory::Genetic, 0.55, SourceId::DisGeNet),
            ev("IL6", EvidenceCategory::Literature, 0.55, SourceId::PubMed),
            ev("CRP", EvidenceCategory::Genetic, 0.55, SourceId::DisGeNet),
            ev("CRP", EvidenceCategory::Literature, 0.55, SourceId::DisGeNet),
        ]);
        let ranker = Ranker::new(even_weights()).unwrap();
        let ranked = ranker.rank(&records, 10).unwrap();
        let order: Vec<&str> = ranked.iter().map(|t| t.symbol.as_str()).collect();
        // CRP has one source, so it loses the tie despite sorting first lexically.
        assert_eq!(order, vec!["IL6", "TNF", "CRP"]);
        assert_eq!(ranked.iter().map(|t| t.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_truncates_to_top_k_and_filters_minimum() {
        let records = aggregate(vec![
            ev("AAA1", EvidenceCategory::Genetic, 0.9, SourceId::GwasCatalog),
            ev("BBB1", EvidenceCategory::Genetic, 0.5, SourceId::GwasCatalog),
            ev("CCC1", EvidenceCategory::Genetic, 0.1, SourceId::GwasCatalog),
        ]);
        let ranker = Ranker::new(even_weights()).unwrap();
        assert_eq!(ranker.rank(&records, 2).unwrap().len(), 2);

        let ranker = ranker.with_min_overall_score(0.2).unwrap();
        let ranked = ranker.rank(&records, 10).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].symbol, "AAA1");
    }

    #[test]
    fn test_min_overall_score_bounds() {
        let ranker = Ranker::new(WeightTable::default()).unwrap();
        assert!(ranker.clone().with_min_overall_score(1.5).is_err());
        assert!(ranker.with_min_overall_score(f64::NAN).is_err());
    }

    #[test]
    fn test_breakdown_contributions_sum_to_overall() {
        let records = aggregate(vec![
            ev("JAK2", EvidenceCategory::Genetic, 0.8, SourceId::GwasCatalog),
            ev("JAK2", EvidenceCategory::Structural, 0.6, SourceId::Pdb),
            ev("JAK2", EvidenceCategory::Comprehensive, 0.7, SourceId::OpenTargets),
        ]);
        let ranker = Ranker::new(WeightTable::default()).unwrap();
        let b = ranker.breakdown(&records["JAK2"]);
        let sum: f64 = b.contributions.as_array().iter().sum();
        assert!((sum - b.overall_score).abs() < 1e-9);
        assert!((b.overall_score - (0.25 * 0.8 + 0.07 * 0.6 + 0.20 * 0.7)).abs() < 1e-9);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let records = aggregate(vec![
            ev("STAT4", EvidenceCategory::Genetic, 0.9, SourceId::GwasCatalog),
            ev("IRF5", EvidenceCategory::Genetic, 0.9, SourceId::GwasCatalog),
            ev("TNF", EvidenceCategory::Literature, 0.4, SourceId::PubMed),
        ]);
        let ranker = Ranker::new(WeightTable::default()).unwrap();
        assert_eq!(ranker.rank(&records, 5).unwrap(), ranker.rank(&records, 5).unwrap());
    }

    #[test]
    fn test_uniform_scores_land_on_exact_tier_boundaries() {
        for name in PROFILES {
            let weights = WeightTable::profile(name).unwrap();
            for (value, tier) in [(0.4, EvidenceTier::Moderate), (0.7, EvidenceTier::Strong)] {
                let mut scores = CategoryScores::default();
                for category in EvidenceCategory::ALL {
                    scores.set(category, value);
                }
                let overall = compute_composite_score(&scores, &weights);
                assert_eq!(overall, value, "profile {name}");
                assert_eq!(EvidenceTier::from_score(overall), tier, "profile {name}");
            }
        }
    }

    #[test]
    fn test_ranked_target_at_boundary_is_moderate() {
        let records = aggregate(
            EvidenceCategory::ALL
                .iter()
                .map(|c| ev("IRF5", *c, 0.4, SourceId::OpenTargets))
                .collect::<Vec<_>>(),
        );
        let ranker = Ranker::new(WeightTable::default()).unwrap();
        let t = &ranker.rank(&records, 1).unwrap()[0];
        assert_eq!(t.overall_score, 0.4);
        assert_eq!(t.evidence_strength, EvidenceTier::Moderate);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let records = aggregate(vec![
            ev("MAX1", EvidenceCategory::Genetic, 1.0, SourceId::GwasCatalog),
            ev("MAX1", EvidenceCategory::Genetic, 1.0, SourceId::DisGeNet),
            ev("MAX1", EvidenceCategory::Literature, 1.0, SourceId::PubMed),
            ev("MAX1", EvidenceCategory::Structural, 1.0, SourceId::Pdb),
            ev("MAX1", EvidenceCategory::Druggability, 1.0, SourceId::PubChem),
            ev("MAX1", EvidenceCategory::Functional, 1.0, SourceId::UniProt),
            ev("MAX1", EvidenceCategory::Pathway, 1.0, SourceId::Reactome),
            ev("MAX1", EvidenceCategory::Comprehensive, 1.0, SourceId::OpenTargets),
        ]);
        let ranker = Ranker::new(WeightTable::default()).unwrap();
        let t = &ranker.rank(&records, 1).unwrap()[0];
        assert!(t.overall_score <= 1.0 && t.overall_score > 0.999);
        assert!(t.category_scores.iter().all(|(_, s)| (0.0..=1.0).contains(&s)));
        assert_eq!(t.evidence_strength, EvidenceTier::Strong);
    }
}
