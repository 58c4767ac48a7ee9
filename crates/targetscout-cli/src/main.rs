//! TargetScout: ranks candidate drug targets for a disease from public
//! biomedical evidence. Entry point for the command-line binary.

mod display;
mod planner;
mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use targetscout_common::{AliasTable, NoAliases};
use targetscout_config::Config;
use targetscout_ranker::{DiscoveryPipeline, EntityResolver};
use targetscout_sources::{run_two_phase, HgncAliasTable};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::planner::{SourcePlanner, StaticPlanner};

#[derive(Parser)]
#[command(
    name = "targetscout",
    version,
    about = "Rank candidate drug targets for a disease from public evidence sources"
)]
struct Cli {
    /// Config file (TOML or YAML). Defaults to $TARGETSCOUT_CONFIG, then ./targetscout.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the sources for a disease and print the ranked targets
    Discover {
        /// Disease name, e.g. "systemic lupus erythematosus"
        disease: String,

        /// Number of targets to report
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Comma-separated source ids to run instead of the configured set
        #[arg(short, long, value_delimiter = ',')]
        sources: Option<Vec<String>>,

        /// Weight profile (default, classic, literature_emphasis)
        #[arg(short, long)]
        profile: Option<String>,

        /// Write the ranked targets as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the effective category weights
    Weights {
        #[arg(short, long)]
        profile: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "targetscout=debug,info" } else { "targetscout=info,warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file {} does not exist", p.display());
            }
            Config::load_path(p)
        }
        None => Config::load(),
    };
    config.context("loading configuration")
}

/// HGNC aliases when configured; a failed load only costs alias resolution.
async fn load_aliases(config: &Config) -> Arc<dyn AliasTable> {
    let loaded = if let Some(path) = &config.sources.hgnc_path {
        Some(HgncAliasTable::from_path(path).await)
    } else if config.sources.hgnc_download {
        match registry::http_client(config) {
            Ok(client) => Some(HgncAliasTable::from_download(&client).await),
            Err(e) => Some(Err(e)),
        }
    } else {
        None
    };

    match loaded {
        Some(Ok(table)) => {
            info!(records = table.n_records(), entries = table.n_lookup_entries(), "HGNC aliases loaded");
            Arc::new(table)
        }
        Some(Err(e)) => {
            warn!(error = %e, "Could not load HGNC aliases, continuing without alias resolution");
            Arc::new(NoAliases)
        }
        None => Arc::new(NoAliases),
    }
}

async fn discover(
    mut config: Config,
    disease: String,
    top_k: Option<usize>,
    sources: Option<Vec<String>>,
    profile: Option<String>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
) -> anyhow::Result<()> {
    let disease = disease.trim().to_string();
    if disease.is_empty() {
        bail!("disease name must not be empty");
    }
    if let Some(k) = top_k {
        config.scoring.top_k = k;
    }
    if let Some(p) = profile {
        config.scoring.weight_profile = p;
    }
    config.validate().context("invalid options")?;

    let planner = match &sources {
        Some(names) => StaticPlanner::from_names(names, &config)?,
        None => StaticPlanner::from_config(&config),
    };
    let plan = planner.plan(&disease);
    info!(
        disease = %disease,
        sources = %plan.iter().map(|s| s.id()).collect::<Vec<_>>().join(","),
        "Starting discovery"
    );

    let adapters = registry::build_adapters(&plan, &config)?;
    let aliases = load_aliases(&config).await;
    let resolver = EntityResolver::new(aliases.clone());

    let fanout = run_two_phase(&adapters, &disease, &resolver, config.search.candidate_cap).await;
    let failed = fanout.outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed == fanout.outcomes.len() && !fanout.outcomes.is_empty() {
        warn!("Every source failed; the report will be empty");
    }

    let pipeline = DiscoveryPipeline::with_aliases(config.ranking_config(&disease)?, aliases)?;
    let report = pipeline.run(fanout.findings)?;

    display::print_report(&report, &fanout.outcomes);

    if let Some(path) = csv {
        display::export_csv(&report.targets, &path)?;
        info!(path = %path.display(), "CSV written");
    }
    if let Some(path) = json {
        display::export_json(&report, &fanout.outcomes, &path)?;
        info!(path = %path.display(), "JSON written");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Discover { disease, top_k, sources, profile, csv, json } => {
            discover(config, disease, top_k, sources, profile, csv, json).await
        }
        Commands::Weights { profile } => {
            if let Some(p) = profile {
                config.scoring.weight_profile = p;
            }
            let table = config.weight_table()?;
            display::print_weights(&config.scoring.weight_profile, &table);
            Ok(())
        }
    }
}
