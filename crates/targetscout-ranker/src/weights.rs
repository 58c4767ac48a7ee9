//! Category weight table for the composite target score.

use serde::{Deserialize, Serialize};
use targetscout_common::{CategoryScores, DiscoveryError, EvidenceCategory, Result};

/// One weight per evidence category. A valid table sums to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightTable {
    /// GWAS / curated gene-disease association evidence
    pub genetic: f64,
    /// Literature support
    pub literature: f64,
    /// Solved 3D structures
    pub structural: f64,
    /// Known compounds
    pub druggability: f64,
    /// Protein function and GO annotations
    pub functional: f64,
    /// Disease-relevant pathway membership
    pub pathway: f64,
    /// Meta-evidence aggregators
    pub comprehensive: f64,
}

/// Genetic pools two association sources (curated gene-disease and GWAS,
/// about 0.20 each on their own) and functional pools UniProt disease
/// annotations with GO terms (about 0.12 and 0.10), scaled down to leave
/// 0.20 for the comprehensive aggregator.
impl Default for WeightTable {
    fn default() -> Self {
        Self {
            genetic:       0.25,
            literature:    0.18,
            structural:    0.07,
            druggability:  0.05,
            functional:    0.17,
            pathway:       0.08,
            comprehensive: 0.20,
        }
    }
}

/// Names accepted by [`WeightTable::profile`].
pub const PROFILES: [&str; 3] = ["default", "classic", "literature_emphasis"];

impl WeightTable {
    /// Four-category model: genetic, literature, structure, compounds.
    pub fn classic() -> Self {
        Self {
            genetic:       0.35,
            literature:    0.30,
            structural:    0.20,
            druggability:  0.15,
            functional:    0.0,
            pathway:       0.0,
            comprehensive: 0.0,
        }
    }

    pub fn literature_emphasis() -> Self {
        Self {
            genetic:       0.20,
            literature:    0.30,
            structural:    0.07,
            druggability:  0.05,
            functional:    0.12,
            pathway:       0.08,
            comprehensive: 0.18,
        }
    }

    /// Look up a named profile.
    pub fn profile(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "default"             => Ok(Self::default()),
            "classic"             => Ok(Self::classic()),
            "literature_emphasis" => Ok(Self::literature_emphasis()),
            other => Err(DiscoveryError::config(format!(
                "unknown weight profile {other:?}, expected one of {}",
                PROFILES.join(", ")
            ))),
        }
    }

    pub fn get(&self, category: EvidenceCategory) -> f64 {
        self.as_array()[category.index()]
    }

    pub fn set(&mut self, category: EvidenceCategory, weight: f64) {
        let slot = match category {
            EvidenceCategory::Genetic       => &mut self.genetic,
            EvidenceCategory::Literature    => &mut self.literature,
            EvidenceCategory::Structural    => &mut self.structural,
            EvidenceCategory::Druggability  => &mut self.druggability,
            EvidenceCategory::Functional    => &mut self.functional,
            EvidenceCategory::Pathway       => &mut self.pathway,
            EvidenceCategory::Comprehensive => &mut self.comprehensive,
        };
        *slot = weight;
    }

    /// Check every weight is finite and in [0, 1] and the table sums to 1.0.
    pub fn validate(&self) -> Result<()> {
        for category in EvidenceCategory::ALL {
            let w = self.get(category);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(DiscoveryError::config(format!(
                    "weight for {category} must be in [0, 1], got {w}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(DiscoveryError::config(format!("weights must sum to 1.0, got {sum:.6}")));
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Renormalise weights so they sum to 1.0. An all-zero table is an error.
    pub fn normalise(&mut self) -> Result<()> {
        let sum = self.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(DiscoveryError::config("cannot renormalise a weight table that sums to zero"));
        }
        self.genetic       /= sum;
        self.literature    /= sum;
        self.structural    /= sum;
        self.druggability  /= sum;
        self.functional    /= sum;
        self.pathway       /= sum;
        self.comprehensive /= sum;
        Ok(())
    }

    /// Convert to array in `EvidenceCategory::ALL` order.
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.genetic,
            self.literature,
            self.structural,
            self.druggability,
            self.functional,
            self.pathway,
            self.comprehensive,
        ]
    }

    /// weight × score per category.
    pub fn contributions(&self, scores: &CategoryScores) -> CategoryScores {
        let mut out = CategoryScores::default();
        for category in EvidenceCategory::ALL {
            out.set(category, self.get(category) * scores.get(category));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_are_valid() {
        for name in PROFILES {
            let w = WeightTable::profile(name).unwrap();
            assert!(w.validate().is_ok(), "profile {name} must sum to 1.0");
        }
    }

    #[test]
    fn test_unknown_profile_is_configuration_error() {
        let err = WeightTable::profile("bogus").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_normalise_restores_sum() {
        let mut w = WeightTable::default();
        w.genetic += 0.10; // deliberately break sum
        assert!(w.validate().is_err());
        w.normalise().unwrap();
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_negative_and_nan_weights_rejected() {
        let mut w = WeightTable::classic();
        w.pathway = -0.1;
        w.genetic = 0.45;
        assert!(w.validate().is_err());

        let mut w = WeightTable::default();
        w.pathway = f64::NAN;
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_zero_table_cannot_be_normalised() {
        let mut w = WeightTable::classic();
        w.genetic = 0.0;
        w.literature = 0.0;
        w.structural = 0.0;
        w.druggability = 0.0;
        assert!(w.normalise().is_err());
    }

    #[test]
    fn test_contributions_sum_to_weighted_total() {
        let w = WeightTable::classic();
        let mut s = CategoryScores::default();
        s.genetic = 0.9;
        s.literature = 0.75;
        let c = w.contributions(&s);
        let total: f64 = c.as_array().iter().sum();
        assert!((total - 0.54).abs() < 1e-9);
    }
}
