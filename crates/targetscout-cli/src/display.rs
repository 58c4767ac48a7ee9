//! Console, CSV and JSON rendering of a discovery report. Read-only over the report.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use console::{style, StyledObject};
use serde::Serialize;
use targetscout_common::{EvidenceCategory, EvidenceTier, RankedTarget};
use targetscout_ranker::{DiscoveryReport, WeightTable};
use targetscout_sources::SourceOutcome;

const FINDINGS_SHOWN: usize = 3;

fn tier_style<D>(tier: EvidenceTier, value: D) -> StyledObject<D> {
    match tier {
        EvidenceTier::Strong => style(value).green().bold(),
        EvidenceTier::Moderate => style(value).yellow(),
        EvidenceTier::Weak => style(value).dim(),
    }
}

/// Categories with a non-zero score, strongest first.
fn top_categories(target: &RankedTarget) -> String {
    let mut cats: Vec<(EvidenceCategory, f64)> = EvidenceCategory::ALL
        .iter()
        .map(|c| (*c, target.category_scores.get(*c)))
        .filter(|(_, s)| *s > 0.0)
        .collect();
    cats.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    cats.iter()
        .map(|(c, s)| format!("{c} {s:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_report(report: &DiscoveryReport, outcomes: &[SourceOutcome]) {
    println!();
    println!("{} {}", style("Targets for").bold(), style(&report.disease).cyan().bold());
    println!();

    if report.targets.is_empty() {
        println!("  {}", style("No targets had usable evidence.").yellow());
    } else {
        println!(
            "  {:>4}  {:<10} {:>6}  {:<9} {:>7}  {}",
            style("Rank").underlined(),
            style("Symbol").underlined(),
            style("Score").underlined(),
            style("Tier").underlined(),
            style("Sources").underlined(),
            style("Evidence").underlined(),
        );
        for t in &report.targets {
            println!(
                "  {:>4}  {:<10} {:>6}  {:<9} {:>7}  {}",
                t.rank,
                style(&t.symbol).bold(),
                tier_style(t.evidence_strength, format!("{:.3}", t.overall_score)),
                tier_style(t.evidence_strength, t.evidence_strength.as_str()),
                t.sources.len(),
                top_categories(t),
            );
            if let Some(name) = &t.protein_name {
                println!("        {}", style(name).dim());
            }
            for finding in t.findings.iter().take(FINDINGS_SHOWN) {
                println!("        - {finding}");
            }
            if !t.related_pathways.is_empty() {
                println!("        pathways: {}", t.related_pathways.join("; "));
            }
        }
    }

    let s = &report.stats;
    println!();
    println!(
        "  {} received, {} normalized, {} rejected, {} without a gene symbol, {} candidate entities",
        s.received, s.normalized, s.rejected, s.unresolved, s.entities
    );
    for o in outcomes {
        let label = if o.narrowed { format!("{} (narrowed)", o.source) } else { o.source.to_string() };
        match &o.error {
            None => println!("  {} {:<28} {:>4} findings in {:.1?}", style("ok").green(), label, o.findings, o.elapsed),
            Some(e) => println!("  {} {:<28} {}", style("--").red(), label, style(e).dim()),
        }
    }
}

pub fn print_weights(name: &str, table: &WeightTable) {
    println!("{} {}", style("Weight profile").bold(), style(name).cyan());
    for category in EvidenceCategory::ALL {
        println!("  {:<14} {:.2}", category.as_str(), table.get(category));
    }
    println!("  {:<14} {:.2}", style("sum").dim(), table.sum());
}

/// Flat CSV row; list fields are joined.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: usize,
    symbol: &'a str,
    protein_name: &'a str,
    overall_score: f64,
    evidence_strength: &'a str,
    genetic: f64,
    literature: f64,
    structural: f64,
    druggability: f64,
    functional: f64,
    pathway: f64,
    comprehensive: f64,
    sources: String,
    related_pathways: String,
    findings: String,
}

impl<'a> From<&'a RankedTarget> for CsvRow<'a> {
    fn from(t: &'a RankedTarget) -> Self {
        let c = &t.category_scores;
        Self {
            rank: t.rank,
            symbol: &t.symbol,
            protein_name: t.protein_name.as_deref().unwrap_or(""),
            overall_score: t.overall_score,
            evidence_strength: t.evidence_strength.as_str(),
            genetic: c.genetic,
            literature: c.literature,
            structural: c.structural,
            druggability: c.druggability,
            functional: c.functional,
            pathway: c.pathway,
            comprehensive: c.comprehensive,
            sources: t.sources.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("; "),
            related_pathways: t.related_pathways.join("; "),
            findings: t.findings.join(" | "),
        }
    }
}

pub fn write_csv<W: Write>(targets: &[RankedTarget], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for t in targets {
        writer.serialize(CsvRow::from(t))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv(targets: &[RankedTarget], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(targets, file)
}

#[derive(Serialize)]
struct JsonExport<'a> {
    #[serde(flatten)]
    report: &'a DiscoveryReport,
    sources: &'a [SourceOutcome],
}

pub fn export_json(report: &DiscoveryReport, outcomes: &[SourceOutcome], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &JsonExport { report, sources: outcomes })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use targetscout_ranker::{DiscoveryPipeline, RankingConfig};
    use targetscout_test_utils::{lupus_findings, FIXTURE_YEAR};

    fn report() -> DiscoveryReport {
        DiscoveryPipeline::new(RankingConfig::new("lupus", 10, FIXTURE_YEAR))
            .unwrap()
            .run(lupus_findings())
            .unwrap()
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_target() {
        let report = report();
        let mut buf = Vec::new();
        write_csv(&report.targets, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + report.targets.len());
        assert!(lines[0].starts_with("rank,symbol,protein_name,overall_score,evidence_strength,genetic"));
        assert!(lines[1].starts_with("1,STAT4,"));
    }

    #[test]
    fn test_top_categories_sorted() {
        let report = report();
        let tnf = report.targets.iter().find(|t| t.symbol == "TNF").unwrap();
        assert_eq!(top_categories(tnf), "literature 0.75, comprehensive 0.62, structural 0.60");
    }

    #[test]
    fn test_json_export_round_trips_targets() {
        let report = report();
        let file = tempfile::NamedTempFile::new().unwrap();
        export_json(&report, &[], file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_reader(std::fs::File::open(file.path()).unwrap()).unwrap();
        assert_eq!(value["disease"], "lupus");
        assert_eq!(value["targets"].as_array().unwrap().len(), report.targets.len());
        assert!(value["sources"].as_array().unwrap().is_empty());
    }
}
