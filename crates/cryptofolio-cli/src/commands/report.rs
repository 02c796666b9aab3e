use chrono::Utc;
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use cryptofolio_core::report::{generate_csv, report_preview, suggested_filename};
use cryptofolio_core::risk::assess_portfolio_risk;
use cryptofolio_core::{PortfolioAsset, RiskAssessment};

use crate::input;

const PREVIEW_CHARS: usize = 200;

/// Arguments for report generation
#[derive(Args)]
pub struct ReportArgs {
    /// Path to JSON/YAML file with `assets` and optional `portfolio_name` and `risk`
    #[arg(long)]
    pub input: Option<String>,

    /// Portfolio name (overrides the document's portfolio_name)
    #[arg(long)]
    pub name: Option<String>,

    /// Write the report to its suggested filename in the current directory
    #[arg(long)]
    pub save: bool,

    /// Write the report to this path instead
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ReportDocument {
    #[serde(default)]
    portfolio_name: Option<String>,
    assets: Vec<PortfolioAsset>,
    /// Computed from the holdings' price history when absent
    #[serde(default)]
    risk: Option<RiskAssessment>,
}

#[derive(Serialize)]
struct ReportOutput {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<String>,
    preview: String,
    report: String,
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: ReportDocument = input::load(&args.input, "report generation")?;
    let name = args
        .name
        .or(doc.portfolio_name)
        .unwrap_or_else(|| "My Crypto Portfolio".to_string());

    let risk = match doc.risk {
        Some(risk) => risk,
        None => assess_portfolio_risk(&doc.assets)?,
    };

    let now = Utc::now();
    let report = generate_csv(&name, &doc.assets, &risk, now)?;
    let filename = suggested_filename(&name, now.date_naive());

    let target = match args.out {
        Some(path) => Some(path),
        None if args.save => Some(PathBuf::from(&filename)),
        None => None,
    };
    let saved_to = match target {
        Some(path) => {
            fs::write(&path, &report)
                .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            info!(path = %path.display(), "report saved");
            Some(path.display().to_string())
        }
        None => None,
    };

    let output = ReportOutput {
        filename,
        saved_to,
        preview: report_preview(&report, PREVIEW_CHARS),
        report,
    };

    Ok(serde_json::to_value(output)?)
}
