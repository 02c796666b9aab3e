use clap::Args;
use serde_json::Value;
use std::fs;
use tracing::info;

use cryptofolio_core::analysis::{analyze_portfolio, PortfolioAnalysisInput};

use crate::input;

/// Arguments for the full portfolio analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON/YAML analysis input
    #[arg(long)]
    pub input: Option<String>,

    /// Also write the generated report to its suggested filename
    #[arg(long)]
    pub save: bool,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis_input: PortfolioAnalysisInput = input::load(&args.input, "portfolio analysis")?;
    let result = analyze_portfolio(&analysis_input)?;

    if args.save {
        let path = &result.result.report_filename;
        fs::write(path, &result.result.report)
            .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
        info!(path = %path, "report saved");
    }

    Ok(serde_json::to_value(result)?)
}
