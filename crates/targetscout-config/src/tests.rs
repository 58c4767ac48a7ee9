#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scoring.top_k, 10);
        assert_eq!(config.search.candidate_cap, 20);
        assert_eq!(config.sources.enabled.len(), 9);
        assert_eq!(config.sources.enabled[0], "disgenet");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [scoring]
            top_k = 5
            weight_profile = "classic"

            [sources]
            enabled = ["gwas", "pubmed"]

            [[sources.custom]]
            name = "screen"
            path = "data/screen.csv"
            default_category = "functional"
            "#,
        )
        .unwrap();
        assert_eq!(config.scoring.top_k, 5);
        assert_eq!(config.search.max_results_per_source, 50);
        assert_eq!(config.sources.enabled, vec!["gwas".to_string(), "pubmed".to_string()]);
        assert_eq!(config.sources.custom[0].symbol_column, "symbol");
        assert_eq!(config.weight_table().unwrap(), WeightTable::classic());
    }

    #[test]
    fn test_yaml_config() {
        let config = Config::from_yaml("scoring:\n  top_k: 3\napi:\n  ncbi_email: me@example.org\n").unwrap();
        assert_eq!(config.scoring.top_k, 3);
        assert_eq!(config.api.ncbi_email.as_deref(), Some("me@example.org"));
    }

    #[test]
    fn test_weight_overrides_must_sum_unless_renormalised() {
        let mut config = Config::default();
        config.scoring.weights.insert("literature".to_string(), 0.5);
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());

        config.scoring.renormalise = true;
        let table = config.weight_table().unwrap();
        assert!((table.sum() - 1.0).abs() < 1e-9);

        config.scoring.weights.insert("expression".to_string(), 0.1);
        assert!(config.weight_table().unwrap_err().is_fatal());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scoring.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.min_overall_score = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.enabled.push("chembl".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.weight_profile = "aggressive".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::from_toml("[api]\nncbi_email = \"file@example.org\"\nncbi_api_key = \"\"\n").unwrap();
        assert!(config.api.ncbi_api_key.is_none());

        config.apply_env(|key| match key {
            "NCBI_EMAIL" => Some("env@example.org".to_string()),
            "DISGENET_API_KEY" => Some("secret-123".to_string()),
            "NCBI_API_KEY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api.ncbi_email.as_deref(), Some("env@example.org"));
        assert_eq!(config.api.disgenet_api_key.as_ref().unwrap().expose_secret(), "secret-123");
        assert!(config.api.ncbi_api_key.is_none());
    }

    #[test]
    fn test_load_from_path_and_missing_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "search:\n  requests_per_second: 10").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.search.requests_per_second, 10.0);

        let config = Config::load_from(Path::new("/nonexistent/targetscout.toml")).unwrap();
        assert_eq!(config.scoring.top_k, 10);
    }

    #[test]
    fn test_ranking_config_uses_pinned_year() {
        let mut config = Config::default();
        config.scoring.reference_year = Some(2024);
        config.scoring.min_overall_score = 0.1;
        let ranking = config.ranking_config("lupus").unwrap();
        assert_eq!(ranking.reference_year, 2024);
        assert_eq!(ranking.min_overall_score, 0.1);
        assert_eq!(ranking.weights, WeightTable::default());
    }
}
