use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use cryptofolio_core::rebalance::{
    default_scenarios, plan_rebalance, stress_test, DEFAULT_REBALANCE_THRESHOLD,
};
use cryptofolio_core::{Fraction, Percentage, PortfolioAsset, StressScenario};

use crate::input;

/// Arguments for the rebalancing check
#[derive(Args)]
pub struct RebalanceArgs {
    /// Comma-separated current weights (e.g. "0.5,0.5")
    #[arg(long, value_delimiter = ',', required = true)]
    pub current: Vec<Decimal>,

    /// Comma-separated target weights, index-aligned with --current
    #[arg(long, value_delimiter = ',', required = true)]
    pub target: Vec<Decimal>,

    /// Maximum tolerated absolute drift per asset (fraction)
    #[arg(long, default_value_t = DEFAULT_REBALANCE_THRESHOLD)]
    pub threshold: Decimal,

    /// Portfolio value used to size the trades
    #[arg(long)]
    pub portfolio_value: Decimal,

    /// Weights are given as 0-100 percentages
    #[arg(long)]
    pub percent: bool,
}

/// Arguments for the stress test
#[derive(Args)]
pub struct StressTestArgs {
    /// Path to JSON/YAML file with `assets` and optional `scenarios`
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct StressDocument {
    assets: Vec<PortfolioAsset>,
    #[serde(default)]
    scenarios: Option<Vec<StressScenario>>,
}

fn to_fractions(values: &[Decimal], percent: bool) -> Vec<Fraction> {
    values
        .iter()
        .map(|v| {
            if percent {
                Percentage::new(*v).to_fraction()
            } else {
                Fraction::new(*v)
            }
        })
        .collect()
}

pub fn run_rebalance(args: RebalanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.threshold < Decimal::ZERO {
        return Err("--threshold must not be negative".into());
    }

    let current = to_fractions(&args.current, args.percent);
    let target = to_fractions(&args.target, args.percent);
    let plan = plan_rebalance(&current, &target, args.threshold, args.portfolio_value)?;

    Ok(serde_json::to_value(plan)?)
}

pub fn run_stress_test(args: StressTestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: StressDocument = input::load(&args.input, "stress testing")?;
    let scenarios = doc.scenarios.unwrap_or_else(default_scenarios);
    let results = stress_test(&doc.assets, &scenarios)?;

    Ok(serde_json::json!({ "results": results }))
}
