//! Per-entity evidence accumulation.
//!
//! A single-pass fold over normalised evidence. Each subject key gets one
//! [`EntityEvidenceRecord`]; each category score is the best single strength
//! plus a small boost for every corroborating item.

use std::collections::BTreeMap;

use serde::Serialize;
use targetscout_common::{CategoryScores, EvidenceCategory, NormalizedEvidence, Payload, SourceId};
use tracing::trace;

pub const BOOST_PER_ITEM: f64 = 0.05;
pub const MAX_BOOST: f64 = 0.20;
pub const MAX_FINDINGS: usize = 8;
pub const MAX_PATHWAYS: usize = 5;

/// max(strengths) + min((n-1)·0.05, 0.20), capped at 1.0. Empty bucket → 0.0.
pub fn category_score(strengths: impl IntoIterator<Item = f64>) -> f64 {
    let mut best = 0.0f64;
    let mut n = 0usize;
    for s in strengths {
        best = best.max(s);
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    let boost = (BOOST_PER_ITEM * (n - 1) as f64).min(MAX_BOOST);
    (best + boost).min(1.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityEvidenceRecord {
    subject_key: String,
    /// Insertion order preserved within each bucket.
    buckets: BTreeMap<EvidenceCategory, Vec<NormalizedEvidence>>,
    category_scores: CategoryScores,
    /// Distinct sources, first-seen order.
    sources: Vec<SourceId>,
    findings: Vec<String>,
    protein_name: Option<String>,
    related_pathways: Vec<String>,
}

impl EntityEvidenceRecord {
    fn new(subject_key: String) -> Self {
        Self {
            subject_key,
            buckets: BTreeMap::new(),
            category_scores: CategoryScores::default(),
            sources: Vec::new(),
            findings: Vec::new(),
            protein_name: None,
            related_pathways: Vec::new(),
        }
    }

    fn absorb(&mut self, evidence: NormalizedEvidence) {
        if !self.sources.contains(&evidence.source) {
            self.sources.push(evidence.source.clone());
        }

        let summary = evidence.raw_payload.summary();
        if self.findings.len() < MAX_FINDINGS && !self.findings.contains(&summary) {
            self.findings.push(summary);
        }

        match &evidence.raw_payload {
            Payload::ProteinAnnotation { protein_name: Some(name), .. }
            | Payload::TargetAssociation { protein_name: Some(name), .. } => {
                if self.protein_name.is_none() && !name.is_empty() {
                    self.protein_name = Some(name.clone());
                }
            }
            Payload::Pathway { pathway_name, .. } => {
                if self.related_pathways.len() < MAX_PATHWAYS
                    && !self.related_pathways.contains(pathway_name)
                {
                    self.related_pathways.push(pathway_name.clone());
                }
            }
            _ => {}
        }

        let category = evidence.category;
        let bucket = self.buckets.entry(category).or_default();
        bucket.push(evidence);
        let score = category_score(bucket.iter().map(|e| e.strength));
        self.category_scores.set(category, score);
    }

    pub fn subject_key(&self) -> &str {
        &self.subject_key
    }

    pub fn category_scores(&self) -> &CategoryScores {
        &self.category_scores
    }

    pub fn evidence(&self, category: EvidenceCategory) -> &[NormalizedEvidence] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn findings(&self) -> &[String] {
        &self.findings
    }

    pub fn protein_name(&self) -> Option<&str> {
        self.protein_name.as_deref()
    }

    pub fn related_pathways(&self) -> &[String] {
        &self.related_pathways
    }

    /// Total number of evidence items across all categories.
    pub fn evidence_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Citations in category order, then insertion order.
    pub fn citations(&self) -> impl Iterator<Item = &str> {
        self.buckets
            .values()
            .flatten()
            .map(|e| e.citation.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// Owns the record map for one discovery run.
#[derive(Debug, Default)]
pub struct Aggregator {
    records: BTreeMap<String, EntityEvidenceRecord>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one item into its record, creating the record on first sighting.
    pub fn add(&mut self, evidence: NormalizedEvidence) {
        trace!(subject = %evidence.subject_key, category = %evidence.category, strength = evidence.strength, "aggregate");
        self.records
            .entry(evidence.subject_key.clone())
            .or_insert_with_key(|key| EntityEvidenceRecord::new(key.clone()))
            .absorb(evidence);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> BTreeMap<String, EntityEvidenceRecord> {
        self.records
    }
}

pub fn aggregate(
    evidence: impl IntoIterator<Item = NormalizedEvidence>,
) -> BTreeMap<String, EntityEvidenceRecord> {
    let mut agg = Aggregator::new();
    for ev in evidence {
        agg.add(ev);
    }
    agg.finish()
}
