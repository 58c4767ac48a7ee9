//! Evidence normalisation: one fixed rule per (category, payload) pairing,
//! each mapping a raw finding onto a strength in [0, 1].

use targetscout_common::{EvidenceCategory, NormalizationError, NormalizedEvidence, Payload, RawFinding};

// ── Literature signals ──────────────────────────────────────────────────────

const LITERATURE_FLOOR: f64 = 0.3;
const HIGH_VALUE_TYPES: &[&str] = &["review", "meta-analysis", "clinical trial", "systematic review"];
const THERAPEUTIC_TERMS: &[&str] = &["therapeutic target", "drug target", "treatment", "therapy", "inhibitor"];
const MECHANISM_TERMS: &[&str] = &["mechanism", "pathway", "signaling", "signalling", "regulation"];
const TOPICAL_TERMS: &[&str] = &["protein", "gene", "expression"];

// ── Gene Ontology signals ───────────────────────────────────────────────────

/// Size of the base mechanism keyword vocabulary used by the GO adapter.
pub const GO_MECHANISM_VOCABULARY: f64 = 13.0;
const DRUGGABLE_FUNCTION_TERMS: &[&str] = &["kinase", "receptor", "channel", "transporter", "enzyme"];

/// Run-level inputs some rules depend on. Passed in, never read from a clock.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerContext {
    pub disease: String,
    pub reference_year: i32,
}

impl NormalizerContext {
    pub fn new(disease: impl Into<String>, reference_year: i32) -> Self {
        Self { disease: disease.into(), reference_year }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    ctx: NormalizerContext,
    disease_lower: String,
}

impl Normalizer {
    pub fn new(ctx: NormalizerContext) -> Self {
        let disease_lower = ctx.disease.trim().to_lowercase();
        Self { ctx, disease_lower }
    }

    pub fn context(&self) -> &NormalizerContext {
        &self.ctx
    }

    /// Map a raw finding onto its category and strength.
    /// `subject_key` is left as the trimmed raw subject; resolution happens downstream.
    pub fn normalize(&self, raw: &RawFinding) -> Result<NormalizedEvidence, NormalizationError> {
        let category: EvidenceCategory = raw.category_hint.parse()?;
        let strength = self.strength(category, &raw.payload, raw.local_score)?;
        debug_assert!((0.0..=1.0).contains(&strength));

        Ok(NormalizedEvidence {
            subject_key: raw.subject.trim().to_string(),
            category,
            strength,
            source: raw.source_id.clone(),
            citation: raw.citation.clone(),
            raw_payload: raw.payload.clone(),
        })
    }

    fn strength(
        &self,
        category: EvidenceCategory,
        payload: &Payload,
        local_score: f64,
    ) -> Result<f64, NormalizationError> {
        use EvidenceCategory as C;

        let score = match (category, payload) {
            (_, Payload::Precomputed { score, .. }) => unit_interval(category, "score", *score)?,
            (_, Payload::Opaque(_)) => {
                if !local_score.is_finite() {
                    return Err(malformed(category, "local_score is not finite"));
                }
                local_score.clamp(0.0, 1.0)
            }

            (C::Genetic, Payload::GeneticAssociation { p_value, .. }) => {
                if !p_value.is_finite() || *p_value < 0.0 || *p_value > 1.0 {
                    return Err(malformed(category, format!("p-value {p_value} outside [0, 1]")));
                }
                p_value_strength(*p_value)
            }
            (C::Genetic, Payload::GeneDiseaseAssociation { score, evidence_index, n_publications, n_snps, .. }) => {
                if !score.is_finite() || *score < 0.0 || !evidence_index.is_finite() {
                    return Err(malformed(category, "association score is not a finite non-negative number"));
                }
                let mut s = 0.6 * score
                    + 0.2 * evidence_index.clamp(0.0, 1.0)
                    + 0.1 * (*n_publications as f64 / 20.0).min(1.0);
                if *n_snps > 0 {
                    s += 0.1 * (*n_snps as f64 / 10.0).min(1.0);
                }
                s
            }

            (C::Literature, Payload::Publication { title, abstract_text, year, publication_types, .. }) => {
                self.literature_strength(title, abstract_text.as_deref(), *year, publication_types)
            }

            (C::Structural, Payload::Structures { structure_ids }) => {
                count_ladder(structure_ids.len(), 0.5)
            }
            (C::Druggability, Payload::Compounds { compound_ids }) => {
                count_ladder(compound_ids.len(), 0.4)
            }

            (C::Functional, Payload::ProteinAnnotation {
                matching_disease_annotations,
                other_disease_annotations,
                has_binding_site,
                has_structure_xref,
                ..
            }) => {
                let mut s = 0.5
                    + 0.3 * *matching_disease_annotations as f64
                    + 0.1 * *other_disease_annotations as f64;
                if *has_binding_site {
                    s += 0.1;
                }
                if *has_structure_xref {
                    s += 0.1;
                }
                s
            }
            (C::Functional, Payload::GoAnnotation { biological_processes, molecular_functions, mechanism_matches }) => {
                go_strength(biological_processes, molecular_functions, mechanism_matches.len())
            }

            (C::Pathway, Payload::Pathway { genes_in_pathway, is_disease_pathway, keyword_matches, disease_word_match, .. }) => {
                let mut s = 0.3 + 0.3 * (*genes_in_pathway as f64 / 5.0).min(1.0);
                if *is_disease_pathway {
                    s += 0.2;
                }
                s += 0.05 * *keyword_matches as f64;
                if *disease_word_match {
                    s += 0.1;
                }
                s
            }

            (C::Comprehensive, Payload::TargetAssociation { overall_score, .. }) => {
                unit_interval(category, "overall_score", *overall_score)?
            }

            (_, other) => {
                return Err(malformed(
                    category,
                    format!("payload kind {} does not feed this category", payload_kind(other)),
                ))
            }
        };

        Ok(score.min(1.0))
    }

    fn literature_strength(
        &self,
        title: &str,
        abstract_text: Option<&str>,
        year: Option<i32>,
        publication_types: &[String],
    ) -> f64 {
        let title_lower = title.to_lowercase();
        let text = format!("{} {}", title_lower, abstract_text.unwrap_or("").to_lowercase());

        let mut score = LITERATURE_FLOOR;

        let high_value_type = publication_types.iter().any(|t| {
            let t = t.to_lowercase();
            HIGH_VALUE_TYPES.iter().any(|hv| t.contains(hv))
        });
        if high_value_type {
            score += 0.15;
        }
        if contains_any(&text, THERAPEUTIC_TERMS) {
            score += 0.15;
        }
        if !self.disease_lower.is_empty() && title_lower.contains(&self.disease_lower) {
            score += 0.15;
        }
        if let Some(y) = year {
            let age = (self.ctx.reference_year - y).max(0);
            score += match age {
                0..=2 => 0.15,
                3..=5 => 0.10,
                6..=10 => 0.05,
                _ => 0.0,
            };
        }
        if contains_any(&text, MECHANISM_TERMS) {
            score += 0.10;
        }
        if contains_any(&text, TOPICAL_TERMS) {
            score += 0.05;
        }
        score.min(1.0)
    }
}

/// Significance ladder: smaller p-value, higher strength.
pub fn p_value_strength(p_value: f64) -> f64 {
    if p_value <= 5e-8 {
        1.0
    } else if p_value <= 1e-5 {
        0.8
    } else if p_value <= 1e-3 {
        0.5
    } else {
        0.3
    }
}

/// Presence-count scaling: 0 → 0.0, n ≥ 1 → min(1, base + 0.1·(n−1)).
pub fn count_ladder(n: usize, base: f64) -> f64 {
    if n == 0 {
        0.0
    } else {
        (base + 0.1 * (n - 1) as f64).min(1.0)
    }
}

fn go_strength(bp: &[String], mf: &[String], matches: usize) -> f64 {
    if bp.is_empty() && mf.is_empty() {
        return 0.2;
    }
    let mut s = 0.3 + 0.5 * (matches as f64 / GO_MECHANISM_VOCABULARY).min(1.0);
    if !bp.is_empty() && !mf.is_empty() {
        s += 0.1;
    }
    let druggable = bp
        .iter()
        .chain(mf)
        .any(|term| contains_any(&term.to_lowercase(), DRUGGABLE_FUNCTION_TERMS));
    if druggable {
        s += 0.05;
    }
    s.min(1.0)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn unit_interval(category: EvidenceCategory, field: &str, value: f64) -> Result<f64, NormalizationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(malformed(category, format!("{field} {value} outside [0, 1]")))
    }
}

fn malformed(category: EvidenceCategory, reason: impl Into<String>) -> NormalizationError {
    NormalizationError::MalformedPayload { category: category.to_string(), reason: reason.into() }
}

fn payload_kind(payload: &Payload) -> &'static str {
    match payload {
        Payload::GeneticAssociation { .. }     => "genetic_association",
        Payload::GeneDiseaseAssociation { .. } => "gene_disease_association",
        Payload::Publication { .. }            => "publication",
        Payload::ProteinAnnotation { .. }      => "protein_annotation",
        Payload::GoAnnotation { .. }           => "go_annotation",
        Payload::Pathway { .. }                => "pathway",
        Payload::Structures { .. }             => "structures",
        Payload::Compounds { .. }              => "compounds",
        Payload::TargetAssociation { .. }      => "target_association",
        Payload::Precomputed { .. }            => "precomputed",
        Payload::Opaque(_)                     => "opaque",
    }
}
