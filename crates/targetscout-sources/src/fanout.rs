//! Concurrent source fan-out.
//!
//! Adapters run concurrently; their outputs are buffered and concatenated in
//! plan order so the single-threaded fold downstream sees a deterministic
//! sequence. A failing adapter contributes nothing and is reported in its
//! `SourceOutcome`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::Serialize;
use targetscout_common::{RawFinding, SourceId};
use targetscout_ranker::EntityResolver;
use tracing::{debug, info, warn};

use crate::sources::SourceAdapter;

/// Candidate proteins handed from phase 1 to phase 2.
pub const DEFAULT_CANDIDATE_CAP: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source: SourceId,
    pub findings: usize,
    pub error: Option<String>,
    pub elapsed: Duration,
    /// Re-run of a disease-level source with phase-1 candidates.
    pub narrowed: bool,
}

impl SourceOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
pub struct FanOut {
    pub findings: Vec<RawFinding>,
    pub outcomes: Vec<SourceOutcome>,
    /// Candidates passed to phase-2 sources; empty for single-phase runs.
    pub candidates: Vec<String>,
}

impl FanOut {
    /// Append a later phase, dropping findings already present with the same
    /// source, subject, category and citation. Returns the number dropped.
    fn absorb(&mut self, other: FanOut, resolver: &EntityResolver) -> usize {
        let key = |f: &RawFinding| {
            (
                f.source_id.clone(),
                resolver.canonicalize(&f.subject).unwrap_or_default(),
                f.category_hint.clone(),
                f.citation.clone(),
            )
        };
        let mut seen: HashSet<(SourceId, String, String, String)> = self.findings.iter().map(key).collect();
        let before = other.findings.len();
        let fresh: Vec<RawFinding> = other.findings.into_iter().filter(|f| seen.insert(key(f))).collect();
        let dropped = before - fresh.len();
        self.findings.extend(fresh);
        self.outcomes.extend(other.outcomes);
        dropped
    }
}

/// Run every adapter concurrently against the same query.
pub async fn gather(adapters: &[Arc<dyn SourceAdapter>], disease: &str, known: Option<&[String]>) -> FanOut {
    let runs = adapters.iter().map(|adapter| async move {
        let started = Instant::now();
        let result = adapter.search(disease, known).await;
        let narrowed = known.is_some() && adapter.narrows_with_candidates();
        (adapter.id(), result, started.elapsed(), narrowed)
    });

    let mut out = FanOut::default();
    for (source, result, elapsed, narrowed) in join_all(runs).await {
        match result {
            Ok(findings) => {
                debug!(%source, count = findings.len(), ?elapsed, "Source finished");
                out.outcomes.push(SourceOutcome { source, findings: findings.len(), error: None, elapsed, narrowed });
                out.findings.extend(findings);
            }
            Err(e) => {
                warn!(%source, error = %e, "Source unavailable, continuing without it");
                out.outcomes.push(SourceOutcome { source, findings: 0, error: Some(e.to_string()), elapsed, narrowed });
            }
        }
    }
    out
}

/// Resolvable subjects ranked by how many findings mention them, ties in
/// first-seen order, capped.
pub fn collect_candidates(findings: &[RawFinding], resolver: &EntityResolver, cap: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (i, finding) in findings.iter().enumerate() {
        if let Some(key) = resolver.canonicalize(&finding.subject) {
            counts.entry(key).or_insert((0, i)).0 += 1;
        }
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
    ranked.into_iter().take(cap).map(|(key, _)| key).collect()
}

/// Phase 1 runs disease-level sources; the candidates they surface feed the
/// protein-level sources of phase 2, alongside a narrowed re-run of the
/// disease-level sources that support it. Outcomes keep plan order within
/// each phase.
pub async fn run_two_phase(
    adapters: &[Arc<dyn SourceAdapter>],
    disease: &str,
    resolver: &EntityResolver,
    candidate_cap: usize,
) -> FanOut {
    let (phase2, phase1): (Vec<_>, Vec<_>) = adapters.iter().cloned().partition(|a| a.requires_candidates());

    let mut out = gather(&phase1, disease, None).await;
    info!(sources = phase1.len(), findings = out.findings.len(), "Phase 1 complete");

    let narrowing: Vec<Arc<dyn SourceAdapter>> = phase1
        .iter()
        .zip(&out.outcomes)
        .filter(|(a, o)| a.narrows_with_candidates() && o.succeeded())
        .map(|(a, _)| a.clone())
        .collect();
    if phase2.is_empty() && narrowing.is_empty() {
        return out;
    }

    out.candidates = collect_candidates(&out.findings, resolver, candidate_cap);
    if out.candidates.is_empty() {
        warn!("No candidate proteins from phase 1, skipping phase 2");
        return out;
    }
    info!(candidates = out.candidates.len(), "Running protein-level sources");

    let candidates = out.candidates.clone();
    let mut second_plan = phase2;
    second_plan.extend(narrowing);
    let second = gather(&second_plan, disease, Some(&candidates)).await;
    info!(sources = second_plan.len(), findings = second.findings.len(), "Phase 2 complete");
    let dropped = out.absorb(second, resolver);
    debug!(dropped, "Duplicate findings from narrowed queries dropped");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, Result};

    fn finding(source: SourceId, subject: &str) -> RawFinding {
        RawFinding::new(
            source,
            subject,
            EvidenceCategory::Genetic,
            Payload::Precomputed { score: 0.5, label: "test".into() },
        )
    }

    #[test]
    fn test_collect_candidates_by_frequency_then_first_seen() {
        let findings: Vec<RawFinding> = ["irf5", "STAT4", "", "STAT4", "TNF", "IRF5", "the", "TNF", "TNF"]
            .iter()
            .map(|s| finding(SourceId::PubMed, s))
            .collect();
        let resolver = EntityResolver::default();
        assert_eq!(collect_candidates(&findings, &resolver, 10), vec!["TNF", "IRF5", "STAT4"]);
        assert_eq!(collect_candidates(&findings, &resolver, 1), vec!["TNF"]);
    }

    struct Failing;

    #[async_trait::async_trait]
    impl SourceAdapter for Failing {
        fn id(&self) -> SourceId {
            SourceId::UniProt
        }

        async fn search(&self, _disease: &str, _known: Option<&[String]>) -> Result<Vec<RawFinding>> {
            Err(DiscoveryError::unavailable(self.id(), "boom"))
        }
    }

    #[tokio::test]
    async fn test_gather_reports_failure_without_findings() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(Failing)];
        let out = gather(&adapters, "lupus", None).await;
        assert!(out.findings.is_empty());
        assert_eq!(out.outcomes.len(), 1);
        assert!(!out.outcomes[0].succeeded());
    }
}
