//! HGNC alias table.
//!
//! Built from the HGNC complete-set TSV. Maps approved, alias and previous
//! symbols to the approved symbol so synonyms reported by different sources
//! (e.g. "TNFA", "TNF-alpha" style aliases) land on one subject key.
//!
//! ```ignore
//! let table = HgncAliasTable::from_download(&client).await?;
//! assert_eq!(table.resolve("K-RAS").as_deref(), Some("KRAS"));
//! ```

use std::collections::HashMap;
use std::path::Path;

use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{AliasTable, DiscoveryError, Result};
use tracing::info;

/// HGNC bulk download URL (approved complete set, TSV).
pub const HGNC_COMPLETE_SET_URL: &str =
    "https://storage.googleapis.com/public-download-files/hgnc/tsv/tsv/hgnc_complete_set.txt";

#[derive(Debug, Default)]
pub struct HgncAliasTable {
    /// Uppercased approved/alias/previous symbol -> approved symbol.
    lookup: HashMap<String, String>,
    n_records: usize,
}

impl HgncAliasTable {
    pub async fn from_download(client: &Client) -> Result<Self> {
        info!(url = HGNC_COMPLETE_SET_URL, "Downloading HGNC complete set");
        let tsv = client.get_text(HGNC_COMPLETE_SET_URL).await?;
        Self::from_tsv(&tsv)
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let tsv = tokio::fs::read_to_string(path).await?;
        Self::from_tsv(&tsv)
    }

    /// Columns are located by header name, so extra or reordered columns are fine.
    pub fn from_tsv(tsv: &str) -> Result<Self> {
        let mut lines = tsv.lines();
        let header: Vec<&str> = lines
            .next()
            .ok_or_else(|| DiscoveryError::config("HGNC file is empty"))?
            .split('\t')
            .collect();
        let column = |name: &str| header.iter().position(|h| h.trim() == name);
        let symbol_col = column("symbol").ok_or_else(|| DiscoveryError::config("HGNC file has no symbol column"))?;
        let status_col = column("status");
        let alias_col = column("alias_symbol");
        let prev_col = column("prev_symbol");

        let mut table = Self::default();
        for line in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            let get = |i: Option<usize>| i.and_then(|i| fields.get(i)).map(|s| s.trim().trim_matches('"')).unwrap_or("");

            let symbol = get(Some(symbol_col));
            if symbol.is_empty() {
                continue;
            }
            if status_col.is_some() && !get(status_col).contains("Approved") {
                continue;
            }

            table.lookup.insert(symbol.to_uppercase(), symbol.to_string());
            for other in get(alias_col).split('|').chain(get(prev_col).split('|')) {
                let other = other.trim();
                if !other.is_empty() {
                    table.lookup.entry(other.to_uppercase()).or_insert_with(|| symbol.to_string());
                }
            }
            table.n_records += 1;
        }

        info!(records = table.n_records, entries = table.lookup.len(), "HGNC alias table built");
        Ok(table)
    }

    /// Number of approved gene records loaded.
    pub fn n_records(&self) -> usize {
        self.n_records
    }

    pub fn n_lookup_entries(&self) -> usize {
        self.lookup.len()
    }
}

impl AliasTable for HgncAliasTable {
    fn resolve(&self, symbol: &str) -> Option<String> {
        self.lookup.get(&symbol.trim().to_uppercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tsv() -> String {
        let header = "hgnc_id\tsymbol\tname\tstatus\talias_symbol\tprev_symbol";
        let kras = "HGNC:6407\tKRAS\tKRAS proto-oncogene, GTPase\tApproved\tK-RAS|KRAS2\t\"KI-RAS|C-K-RAS\"";
        let tnf = "HGNC:11892\tTNF\ttumor necrosis factor\tApproved\tTNFA|DIF\tTNFA";
        let gone = "HGNC:1\tOLD1\twithdrawn gene\tEntry Withdrawn\t\t";
        format!("{header}\n{kras}\n{tnf}\n{gone}\n")
    }

    #[test]
    fn test_resolves_approved_alias_and_previous() {
        let t = HgncAliasTable::from_tsv(&sample_tsv()).unwrap();
        assert_eq!(t.resolve("kras").as_deref(), Some("KRAS"));
        assert_eq!(t.resolve("K-RAS").as_deref(), Some("KRAS"));
        assert_eq!(t.resolve("C-K-RAS").as_deref(), Some("KRAS"));
        assert_eq!(t.resolve("TNFa").as_deref(), Some("TNF"));
        assert_eq!(t.n_records(), 2);
    }

    #[test]
    fn test_withdrawn_and_unknown_are_unresolved() {
        let t = HgncAliasTable::from_tsv(&sample_tsv()).unwrap();
        assert!(t.resolve("OLD1").is_none());
        assert!(t.resolve("NOTAREALGENE999").is_none());
    }

    #[test]
    fn test_missing_symbol_column_is_an_error() {
        assert!(HgncAliasTable::from_tsv("hgnc_id\tname\nHGNC:1\tx\n").is_err());
        assert!(HgncAliasTable::from_tsv("").is_err());
    }
}
