//! Configuration loading for TargetScout.
//! Reads targetscout.toml (or .yaml/.yml) from the current directory or the
//! path in the TARGETSCOUT_CONFIG env var. A missing file means defaults.
//! `.env` is loaded first; NCBI_API_KEY, NCBI_EMAIL and DISGENET_API_KEY
//! override values from the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use targetscout_common::{DiscoveryError, EvidenceCategory, Result, SourceId};
use targetscout_ranker::{RankingConfig, WeightTable};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "TARGETSCOUT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "targetscout.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results_per_source: usize,
    /// Candidate proteins handed to protein-level sources.
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_results()   -> usize { 50 }
fn default_candidate_cap() -> usize { 20 }
fn default_rps()           -> f64   { 3.0 }
fn default_timeout_secs()  -> u64   { 30 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results_per_source: default_max_results(),
            candidate_cap: default_candidate_cap(),
            requests_per_second: default_rps(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Built-in source ids in plan order.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub custom: Vec<CustomSourceConfig>,
    /// Local copy of the HGNC complete set; enables alias resolution.
    #[serde(default)]
    pub hgnc_path: Option<PathBuf>,
    /// Download the HGNC complete set when no local copy is configured.
    #[serde(default)]
    pub hgnc_download: bool,
}

fn default_enabled() -> Vec<String> {
    SourceId::BUILTIN.iter().map(|s| s.id().to_string()).collect()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            custom: Vec::new(),
            hgnc_path: None,
            hgnc_download: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomSourceConfig {
    pub name: String,
    pub path: PathBuf,
    /// "csv" or "json"; guessed from the extension when absent.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default = "default_symbol_column")]
    pub symbol_column: String,
    #[serde(default = "default_score_column")]
    pub score_column: String,
    #[serde(default)]
    pub category_column: Option<String>,
    #[serde(default)]
    pub citation_column: Option<String>,
    #[serde(default)]
    pub default_category: Option<String>,
}

fn default_symbol_column() -> String { "symbol".to_string() }
fn default_score_column()  -> String { "score".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_profile")]
    pub weight_profile: String,
    /// Per-category overrides applied on top of the profile.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub renormalise: bool,
    #[serde(default)]
    pub min_overall_score: f64,
    /// Year used for literature recency; the current year when unset.
    #[serde(default)]
    pub reference_year: Option<i32>,
}

fn default_top_k()   -> usize  { 10 }
fn default_profile() -> String { "default".to_string() }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            weight_profile: default_profile(),
            weights: BTreeMap::new(),
            renormalise: false,
            min_overall_score: 0.0,
            reference_year: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub ncbi_email: Option<String>,
    #[serde(default, deserialize_with = "secret_opt")]
    pub ncbi_api_key: Option<SecretString>,
    #[serde(default, deserialize_with = "secret_opt")]
    pub disgenet_api_key: Option<SecretString>,
}

fn secret_opt<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from))
}

mod tests;

impl Config {
    /// Load configuration, checking TARGETSCOUT_CONFIG first, then the current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_path(Path::new(&path))
    }

    /// Load an explicit file, then `.env` and environment overrides, then validate.
    pub fn load_path(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file by extension. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => Self::from_toml(&content)?,
        };
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DiscoveryError::config(format!("invalid TOML config: {e}")))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| DiscoveryError::config(format!("invalid YAML config: {e}")))
    }

    /// Overlay API credentials from the environment. Takes a lookup so tests
    /// do not have to mutate process state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("NCBI_API_KEY") {
            self.api.ncbi_api_key = Some(SecretString::from(key));
        }
        if let Some(email) = non_empty("NCBI_EMAIL") {
            self.api.ncbi_email = Some(email);
        }
        if let Some(key) = non_empty("DISGENET_API_KEY") {
            self.api.disgenet_api_key = Some(SecretString::from(key));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scoring.top_k == 0 {
            return Err(DiscoveryError::config("scoring.top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.scoring.min_overall_score) {
            return Err(DiscoveryError::config("scoring.min_overall_score must be in [0, 1]"));
        }
        if !self.search.requests_per_second.is_finite() || self.search.requests_per_second <= 0.0 {
            return Err(DiscoveryError::config("search.requests_per_second must be positive"));
        }
        if self.search.max_results_per_source == 0 {
            return Err(DiscoveryError::config("search.max_results_per_source must be at least 1"));
        }
        for id in &self.sources.enabled {
            if matches!(SourceId::parse(id), SourceId::Custom(_)) {
                return Err(DiscoveryError::config(format!("unknown source {id:?} in sources.enabled")));
            }
        }
        for custom in &self.sources.custom {
            if let Some(format) = &custom.format {
                if !matches!(format.to_lowercase().as_str(), "csv" | "json") {
                    return Err(DiscoveryError::config(format!(
                        "custom source {:?}: format must be csv or json",
                        custom.name
                    )));
                }
            }
        }
        self.weight_table().map(|_| ())
    }

    /// Profile weights with per-category overrides, renormalised when asked.
    pub fn weight_table(&self) -> Result<WeightTable> {
        let mut table = WeightTable::profile(&self.scoring.weight_profile)?;
        for (name, weight) in &self.scoring.weights {
            let category: EvidenceCategory = name
                .parse()
                .map_err(|e| DiscoveryError::config(format!("scoring.weights: {e}")))?;
            table.set(category, *weight);
        }
        if self.scoring.renormalise {
            table.normalise()?;
        }
        table.validate()?;
        Ok(table)
    }

    pub fn reference_year(&self) -> i32 {
        self.scoring
            .reference_year
            .unwrap_or_else(|| chrono::Utc::now().year())
    }

    pub fn ranking_config(&self, disease: &str) -> Result<RankingConfig> {
        let mut config = RankingConfig::new(disease, self.scoring.top_k, self.reference_year())
            .with_weights(self.weight_table()?);
        config.renormalise = self.scoring.renormalise;
        config.min_overall_score = self.scoring.min_overall_score;
        Ok(config)
    }
}
