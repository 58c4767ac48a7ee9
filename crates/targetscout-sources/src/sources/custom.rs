//! File-backed evidence source.
//!
//! Reads a CSV file (header row required) or a JSON array of objects and maps
//! configured columns onto findings. Each row becomes one `Opaque` finding
//! whose local score is taken from the score column.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use targetscout_common::{DiscoveryError, Payload, RawFinding, Result, SourceId};
use tracing::{debug, instrument};

use super::SourceAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Guess from the file extension; anything but `.json` is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSourceSpec {
    pub name: String,
    pub path: PathBuf,
    pub format: Option<FileFormat>,
    pub symbol_column: String,
    pub score_column: String,
    pub category_column: Option<String>,
    pub citation_column: Option<String>,
    /// Used when the row has no category column or it is empty.
    pub default_category: Option<String>,
}

impl CustomSourceSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format: None,
            symbol_column: "symbol".to_string(),
            score_column: "score".to_string(),
            category_column: Some("category".to_string()),
            citation_column: None,
            default_category: None,
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format.unwrap_or_else(|| FileFormat::from_path(&self.path))
    }
}

pub struct CustomFileSource {
    spec: CustomSourceSpec,
}

impl CustomFileSource {
    pub fn new(spec: CustomSourceSpec) -> Self {
        Self { spec }
    }

    #[instrument(skip(self), fields(name = %self.spec.name))]
    async fn fetch(&self) -> Result<Vec<RawFinding>> {
        let text = tokio::fs::read_to_string(&self.spec.path).await?;
        let rows = match self.spec.format() {
            FileFormat::Csv => csv_rows(&text)?,
            FileFormat::Json => json_rows(&text)?,
        };
        let findings = rows_to_findings(&self.spec, rows);
        debug!(count = findings.len(), "Custom source rows read");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for CustomFileSource {
    fn id(&self) -> SourceId {
        SourceId::Custom(self.spec.name.clone())
    }

    async fn search(&self, _disease: &str, _known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        self.fetch()
            .await
            .map_err(|e| DiscoveryError::unavailable(self.id(), e))
    }
}

pub fn csv_rows(text: &str) -> Result<Vec<Map<String, Value>>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| DiscoveryError::config(format!("unreadable CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DiscoveryError::config(format!("bad CSV row: {e}")))?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn json_rows(text: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(DiscoveryError::config("custom JSON source must be an array of objects"));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

fn cell(row: &Map<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rows without a symbol are dropped. A missing or unparsable score becomes
/// NaN so the row is rejected during normalization rather than silently scored.
pub fn rows_to_findings(spec: &CustomSourceSpec, rows: Vec<Map<String, Value>>) -> Vec<RawFinding> {
    let source = SourceId::Custom(spec.name.clone());
    rows.into_iter()
        .filter_map(|row| {
            let subject = cell(&row, &spec.symbol_column)?;
            let score = cell(&row, &spec.score_column)
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(f64::NAN);
            let category = spec
                .category_column
                .as_deref()
                .and_then(|c| cell(&row, c))
                .or_else(|| spec.default_category.clone())
                .unwrap_or_default();
            let citation = spec
                .citation_column
                .as_deref()
                .and_then(|c| cell(&row, c))
                .unwrap_or_default();

            Some(RawFinding {
                source_id: source.clone(),
                subject,
                local_score: score,
                category_hint: category,
                payload: Payload::Opaque(Value::Object(row)),
                citation,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path(Path::new("hits.JSON")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("hits.tsv")), FileFormat::Csv);
    }

    #[test]
    fn test_csv_rows_to_findings() {
        let text = "symbol,score,category,ref\nJAK1, 0.7 ,functional,lab-1\n,0.5,genetic,\nTYK2,n/a,,\n";
        let mut spec = CustomSourceSpec::new("screen", "screen.csv");
        spec.citation_column = Some("ref".to_string());
        spec.default_category = Some("literature".to_string());

        let findings = rows_to_findings(&spec, csv_rows(text).unwrap());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].subject, "JAK1");
        assert_eq!(findings[0].local_score, 0.7);
        assert_eq!(findings[0].category_hint, "functional");
        assert_eq!(findings[0].citation, "lab-1");
        assert_eq!(findings[0].source_id, SourceId::Custom("screen".to_string()));

        assert!(findings[1].local_score.is_nan());
        assert_eq!(findings[1].category_hint, "literature");
    }

    #[test]
    fn test_json_rows_accept_numbers() {
        let text = r#"[{"gene": "IL6", "value": 0.4}, "skip", {"gene": "IL10"}]"#;
        let mut spec = CustomSourceSpec::new("json", "x.json");
        spec.symbol_column = "gene".to_string();
        spec.score_column = "value".to_string();
        let findings = rows_to_findings(&spec, json_rows(text).unwrap());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].local_score, 0.4);
        assert!(json_rows(r#"{"gene": "IL6"}"#).is_err());
    }

    #[tokio::test]
    async fn test_search_reads_file_and_reports_missing() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "symbol,score,category").unwrap();
        writeln!(file, "STAT4,0.9,genetic").unwrap();

        let source = CustomFileSource::new(CustomSourceSpec::new("file", file.path()));
        let findings = source.search("lupus", None).await.unwrap();
        assert_eq!(findings.len(), 1);

        let missing = CustomFileSource::new(CustomSourceSpec::new("gone", "/nonexistent/targets.csv"));
        let err = missing.search("lupus", None).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::SourceUnavailable { .. }));
    }
}
