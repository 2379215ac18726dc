//! Command-line interface for limpiar operations.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::{
    document::TableDocument,
    error::{Error, Result},
    factors::{FactorId, PipelineConfig},
    pipeline::Pipeline,
    score::QualityMetrics,
};

/// limpiar subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Display dataset shape, column types, and missing-value counts
    Info {
        /// Path to a CSV dataset
        path: PathBuf,
    },
    /// Run the cleaning pipeline and write the cleaned dataset
    Clean {
        /// Path to a CSV dataset
        path: PathBuf,
        /// Output path for the cleaned CSV (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated factor ids to run (defaults to all)
        #[arg(long, value_delimiter = ',')]
        factors: Option<Vec<String>>,
        /// Target column for class balancing
        #[arg(long)]
        target: Option<String>,
        /// Write the preprocessing report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Calculate the 0-100 data quality score
    Score {
        /// Path to a CSV dataset
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Produce the preprocessing report without writing a dataset
    Report {
        /// Path to a CSV dataset
        path: PathBuf,
        /// Output file for the report (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_factors(factors: Option<&Vec<String>>) -> Result<Vec<FactorId>> {
    match factors {
        Some(names) => names.iter().map(|name| name.parse()).collect(),
        None => Ok(FactorId::ALL.to_vec()),
    }
}

/// Display dataset information.
pub fn cmd_info(path: &Path) -> Result<()> {
    let doc = TableDocument::from_csv_path(path)?;
    let (rows, cols) = doc.shape();

    println!("File: {}", path.display());
    println!("Rows: {rows}");
    println!("Columns: {cols}");
    println!("Missing cells: {}", doc.missing_count());
    println!();
    println!("{:<24} {:<10}", "COLUMN", "TYPE");
    println!("{}", "-".repeat(34));
    for column in doc.columns() {
        println!("{:<24} {:<10}", column.name, column.ty);
    }
    Ok(())
}

/// Run the cleaning pipeline.
pub fn cmd_clean(
    path: &Path,
    output: Option<&Path>,
    factors: Option<&Vec<String>>,
    target: Option<&str>,
    report_path: Option<&Path>,
) -> Result<()> {
    let doc = TableDocument::from_csv_path(path)?;
    let enabled = parse_factors(factors)?;

    let mut config = PipelineConfig::default();
    if let Some(target) = target {
        config = config.with_target(target);
    }
    let outcome = Pipeline::new(config).run(&doc, &enabled)?;

    match output {
        Some(out) => {
            outcome.document.to_csv_path(out)?;
            eprintln!(
                "Cleaned dataset written to {} ({} rows)",
                out.display(),
                outcome.document.num_rows()
            );
        }
        None => print!("{}", outcome.document.to_csv_string()?),
    }

    if let Some(report_path) = report_path {
        std::fs::write(report_path, outcome.report.to_json_pretty()?)
            .map_err(|e| Error::io(e, report_path))?;
        eprintln!("Report written to {}", report_path.display());
    }
    for line in &outcome.report.preprocessing_log {
        eprintln!("  {line}");
    }
    Ok(())
}

/// Calculate and print the quality score.
pub fn cmd_score(path: &Path, json: bool) -> Result<()> {
    let doc = TableDocument::from_csv_path(path)?;
    let metrics = QualityMetrics::from_document(&doc);
    let score = metrics.score();

    if json {
        let mut value = serde_json::to_value(&metrics)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("Data_Quality_Score".to_string(), serde_json::json!(score));
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Data Quality Score: {score}/100");
        if let Some(pct) = metrics.missing_values_pct {
            println!("  Missing values: {pct:.2}%");
        }
        if let Some(count) = metrics.duplicate_records_count {
            println!("  Duplicate rows: {count:.0}");
        }
        if let Some(rate) = metrics.outlier_rate {
            println!("  Outlier rate: {:.2}%", rate * 100.0);
        }
        if let Some(corr) = metrics.feature_correlation_mean {
            println!("  Mean |correlation|: {corr:.3}");
        }
    }
    Ok(())
}

/// Produce the preprocessing report without mutating anything.
pub fn cmd_report(path: &Path, output: Option<&Path>) -> Result<()> {
    let doc = TableDocument::from_csv_path(path)?;
    let report = Pipeline::with_defaults().dry_run(&doc, &FactorId::ALL)?;
    let json = report.to_json_pretty()?;

    match output {
        Some(out) => {
            std::fs::write(out, json).map_err(|e| Error::io(e, out))?;
            eprintln!("Report written to {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
