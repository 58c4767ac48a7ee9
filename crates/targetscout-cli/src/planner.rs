//! Source planning: which sources run, in which order.

use targetscout_common::{DiscoveryError, Result, SourceId};
use targetscout_config::Config;

/// Yields the ordered list of sources for a disease query.
pub trait SourcePlanner: Send + Sync {
    fn plan(&self, disease: &str) -> Vec<SourceId>;
}

/// A fixed plan taken from configuration or the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPlanner {
    order: Vec<SourceId>,
}

impl StaticPlanner {
    /// Enabled built-ins in configured order, then every custom file source.
    pub fn from_config(config: &Config) -> Self {
        let mut order: Vec<SourceId> = config.sources.enabled.iter().map(|s| SourceId::parse(s)).collect();
        order.extend(config.sources.custom.iter().map(|c| SourceId::Custom(c.name.clone())));
        Self::dedup(order)
    }

    /// Explicit `--sources a,b,...` list. Names must be built-in ids or
    /// configured custom sources.
    pub fn from_names(names: &[String], config: &Config) -> Result<Self> {
        let mut order = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let id = match SourceId::parse(name) {
                SourceId::Custom(_) => config
                    .sources
                    .custom
                    .iter()
                    .find(|c| c.name == name)
                    .map(|c| SourceId::Custom(c.name.clone()))
                    .ok_or_else(|| {
                        DiscoveryError::config(format!(
                            "unknown source {name:?}; built-ins are {}",
                            SourceId::BUILTIN.iter().map(|s| s.id()).collect::<Vec<_>>().join(", ")
                        ))
                    })?,
                builtin => builtin,
            };
            order.push(id);
        }
        if order.is_empty() {
            return Err(DiscoveryError::config("--sources needs at least one source"));
        }
        Ok(Self::dedup(order))
    }

    fn dedup(order: Vec<SourceId>) -> Self {
        let mut unique: Vec<SourceId> = Vec::with_capacity(order.len());
        for id in order {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self { order: unique }
    }
}

impl SourcePlanner for StaticPlanner {
    fn plan(&self, _disease: &str) -> Vec<SourceId> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use targetscout_config::CustomSourceConfig;

    fn config_with_custom() -> Config {
        let mut config = Config::default();
        config.sources.enabled = vec!["gwas".into(), "pubmed".into(), "gwas".into()];
        config.sources.custom.push(CustomSourceConfig {
            name: "screen".into(),
            path: "screen.csv".into(),
            format: None,
            symbol_column: "symbol".into(),
            score_column: "score".into(),
            category_column: None,
            citation_column: None,
            default_category: Some("functional".into()),
        });
        config
    }

    #[test]
    fn test_plan_from_config_appends_custom() {
        let planner = StaticPlanner::from_config(&config_with_custom());
        assert_eq!(
            planner.plan("lupus"),
            vec![SourceId::GwasCatalog, SourceId::PubMed, SourceId::Custom("screen".into())]
        );
    }

    #[test]
    fn test_plan_from_names() {
        let config = config_with_custom();
        let names = vec!["PubMed".to_string(), " screen ".to_string(), "pdb".to_string()];
        let planner = StaticPlanner::from_names(&names, &config).unwrap();
        assert_eq!(
            planner.plan("lupus"),
            vec![SourceId::PubMed, SourceId::Custom("screen".into()), SourceId::Pdb]
        );

        assert!(StaticPlanner::from_names(&["chembl".to_string()], &config).is_err());
        assert!(StaticPlanner::from_names(&[], &config).is_err());
    }
}
