//! Subject canonicalisation: maps raw symbols from any source onto one merge key.

use std::sync::Arc;

use targetscout_common::{AliasTable, NoAliases};

/// Tokens that look like gene symbols but almost never are.
const STOPWORDS: &[&str] = &[
    "THE", "AND", "FOR", "WITH", "FROM", "THIS", "THAT", "WERE", "WAS", "ARE",
    "NOT", "BUT", "ALL", "ANY", "CAN", "HAS", "HAD", "HAVE", "OUR", "ITS",
    "DNA", "RNA", "MRNA", "CDNA", "SNP", "SNPS", "GWAS", "PCR", "QPCR",
    "ATP", "ADP", "GTP", "NAD", "NADH", "ROS", "USA", "UK", "EU",
    "AIDS", "HIV", "COVID", "MHC", "HLA", "CI", "OR", "HR", "SD", "SEM",
    "II", "III", "IV", "VS", "NA", "ND", "NS", "WT", "KO",
];

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 10;

/// Trim and uppercase, then apply the plausibility heuristic.
/// Returns `None` for anything that is not shaped like a gene/protein symbol.
pub fn canonicalize(raw_subject: &str) -> Option<String> {
    let key = raw_subject.trim().to_uppercase();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }
    let len = key.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return None;
    }
    if !key.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if STOPWORDS.contains(&key.as_str()) {
        return None;
    }
    Some(key)
}

/// Canonicaliser with a pluggable alias table applied after the basic rules.
#[derive(Clone)]
pub struct EntityResolver {
    aliases: Arc<dyn AliasTable>,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(Arc::new(NoAliases))
    }
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver").finish_non_exhaustive()
    }
}

impl EntityResolver {
    pub fn new(aliases: Arc<dyn AliasTable>) -> Self {
        Self { aliases }
    }

    pub fn canonicalize(&self, raw_subject: &str) -> Option<String> {
        let key = canonicalize(raw_subject)?;
        match self.aliases.resolve(&key) {
            // The alias target must pass the same checks.
            Some(approved) => canonicalize(&approved).or(Some(key)),
            None => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_canonicalize_is_idempotent_over_case_and_padding() {
        assert_eq!(canonicalize("tnf "), Some("TNF".to_string()));
        assert_eq!(canonicalize("TNF"), Some("TNF".to_string()));
        assert_eq!(canonicalize(" Tnf"), Some("TNF".to_string()));
        let once = canonicalize("il6").unwrap();
        assert_eq!(canonicalize(&once), Some(once));
    }

    #[test]
    fn test_rejects_implausible_subjects() {
        assert_eq!(canonicalize(""), None);
        assert_eq!(canonicalize("   "), None);
        assert_eq!(canonicalize("A"), None);
        assert_eq!(canonicalize("ABCDEFGHIJK"), None);
        assert_eq!(canonicalize("5HT"), None);
        assert_eq!(canonicalize("IL 6"), None);
        assert_eq!(canonicalize("the"), None);
        assert_eq!(canonicalize("DNA"), None);
    }

    #[test]
    fn test_length_bounds_inclusive() {
        assert_eq!(canonicalize("F8"), Some("F8".to_string()));
        assert_eq!(canonicalize("ABCDEFGHIJ"), Some("ABCDEFGHIJ".to_string()));
    }

    #[test]
    fn test_alias_table_maps_to_approved_symbol() {
        let mut table = BTreeMap::new();
        table.insert("TNFA".to_string(), "TNF".to_string());
        let resolver = EntityResolver::new(Arc::new(table));
        assert_eq!(resolver.canonicalize("tnfa"), Some("TNF".to_string()));
        assert_eq!(resolver.canonicalize("IL6"), Some("IL6".to_string()));
    }

    #[test]
    fn test_default_resolver_is_uppercase_only() {
        let resolver = EntityResolver::default();
        assert_eq!(resolver.canonicalize("tnfa"), Some("TNFA".to_string()));
    }
}
